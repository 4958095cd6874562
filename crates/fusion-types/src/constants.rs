// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Elementary charge (C). Used for the charge-state axis.
pub const Q_ELECTRON: f64 = 1.602176634e-19;

/// Speed of light (m/s)
pub const C_LIGHT: f64 = 299_792_458.0;

/// Joule-to-electronvolt divisor used by the fusion source integrator.
/// NOTE: deliberately the 4-digit value; reaction-rate outputs are
/// calibrated against it.
pub const AFSI_EV_J: f64 = 1.602e-19;

/// Deuterium mass (kg) as used by the fusion source integrator.
pub const AFSI_M_DEUTERIUM: f64 = 3.344e-27;

/// Tritium / helium-3 mass (kg) as used by the fusion source integrator.
pub const AFSI_M_A3: f64 = 5.008e-27;

/// Deuterium mass (kg)
pub const M_DEUTERIUM: f64 = 3.3435837724e-27;

/// Alpha particle mass (kg)
pub const M_ALPHA: f64 = 6.644_657_335_7e-27;

/// 2π, the period of every angular axis.
pub const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Millibarn to square metre.
pub const MILLIBARN_M2: f64 = 1.0e-31;
