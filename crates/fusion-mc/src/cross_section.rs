// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Cross Sections
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fusion cross-sections as pure functions of center-of-mass energy.

use fusion_types::constants::MILLIBARN_M2;
use fusion_types::reaction::ReactionKind;

/// `σ(reaction, E_com)` in m² with `E_com` in keV.
pub trait CrossSection: Sync {
    fn sigma(&self, reaction: ReactionKind, e_kev: f64) -> f64;
}

/// Energy-independent cross-section (m²).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantCrossSection(pub f64);

impl CrossSection for ConstantCrossSection {
    fn sigma(&self, _reaction: ReactionKind, _e_kev: f64) -> f64 {
        self.0
    }
}

/// Bosch–Hale (1992) parametrisation
/// `σ = S(E) / (E · exp(B_G / √E))` with a Padé S-factor, in millibarn.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoschHale;

struct Coefficients {
    bg: f64,
    a: [f64; 5],
    b: [f64; 4],
}

const DT: Coefficients = Coefficients {
    bg: 34.3827,
    a: [6.927e4, 7.454e8, 2.050e6, 5.2002e4, 0.0],
    b: [63.8, -0.995, 6.981e-5, 1.728e-4],
};

const DHE3: Coefficients = Coefficients {
    bg: 68.7508,
    a: [5.7501e6, 2.5226e3, 45.566, 0.0, 0.0],
    b: [-3.1995e-3, -8.5530e-6, 5.9014e-11, 0.0],
};

const DDN: Coefficients = Coefficients {
    bg: 31.3970,
    a: [5.3701e4, 330.27, -0.12706, 2.9327e-5, -2.5151e-9],
    b: [0.0; 4],
};

const DDP: Coefficients = Coefficients {
    bg: 31.3970,
    a: [5.5576e4, 210.54, -0.032638, 1.4987e-6, 1.8181e-10],
    b: [0.0; 4],
};

impl Coefficients {
    fn s_factor(&self, e: f64) -> f64 {
        let [a1, a2, a3, a4, a5] = self.a;
        let [b1, b2, b3, b4] = self.b;
        let num = a1 + e * (a2 + e * (a3 + e * (a4 + e * a5)));
        let den = 1.0 + e * (b1 + e * (b2 + e * (b3 + e * b4)));
        num / den
    }
}

impl CrossSection for BoschHale {
    /// Zero for non-positive energies and wherever the fit leaves its
    /// physical range (non-positive S-factor).
    fn sigma(&self, reaction: ReactionKind, e_kev: f64) -> f64 {
        if !e_kev.is_finite() || e_kev <= 0.0 {
            return 0.0;
        }
        let c = match reaction {
            ReactionKind::DT => &DT,
            ReactionKind::DHe3 => &DHE3,
            ReactionKind::DDn => &DDN,
            ReactionKind::DDp => &DDP,
        };
        let s = c.s_factor(e_kev);
        if s.is_nan() || s <= 0.0 {
            return 0.0;
        }
        let sigma_mb = s / (e_kev * (c.bg / e_kev.sqrt()).exp());
        sigma_mb * MILLIBARN_M2
    }
}
