// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Fusion MC
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Monte Carlo layer: momentum sampling, the fusion source integrator and
//! the importance-sampled marker generator.

pub mod afsi;
pub mod bmc;
pub mod cross_section;
pub mod importance;
pub mod rng;
pub mod sampler;
