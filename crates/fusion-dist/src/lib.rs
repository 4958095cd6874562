// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Fusion Dist
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Phase-space histogram grids and their accumulation from particle batches.

pub mod accumulate;
pub mod atomic;
pub mod grid;

pub use accumulate::BatchAccumulator;
pub use grid::HistogramGrid;
