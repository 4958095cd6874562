// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Reactions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{AFSI_M_A3, AFSI_M_DEUTERIUM};
use crate::error::{FusionError, FusionResult};
use serde::{Deserialize, Serialize};

/// Binary fusion reaction with fixed reactant rest masses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionKind {
    /// D + T → He4 + n
    #[serde(rename = "dt")]
    DT,
    /// D + He3 → He4 + p
    #[serde(rename = "dhe3")]
    DHe3,
    /// D + D → T + p
    #[serde(rename = "ddp")]
    DDp,
    /// D + D → He3 + n
    #[serde(rename = "ddn")]
    DDn,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 4] = [
        ReactionKind::DT,
        ReactionKind::DHe3,
        ReactionKind::DDp,
        ReactionKind::DDn,
    ];

    /// Reactant rest masses `(m1, m2)` in kg.
    pub fn masses(self) -> (f64, f64) {
        match self {
            ReactionKind::DT | ReactionKind::DHe3 => (AFSI_M_DEUTERIUM, AFSI_M_A3),
            ReactionKind::DDp | ReactionKind::DDn => (AFSI_M_DEUTERIUM, AFSI_M_DEUTERIUM),
        }
    }

    /// Reduced mass `m1·m2/(m1+m2)`.
    pub fn reduced_mass(self) -> f64 {
        let (m1, m2) = self.masses();
        m1 * m2 / (m1 + m2)
    }

    /// Numeric reaction id (1 = DT, 2 = DHe3, 3 = DDp, 4 = DDn).
    pub fn id(self) -> u8 {
        match self {
            ReactionKind::DT => 1,
            ReactionKind::DHe3 => 2,
            ReactionKind::DDp => 3,
            ReactionKind::DDn => 4,
        }
    }

    pub fn from_id(id: u8) -> FusionResult<Self> {
        match id {
            1 => Ok(ReactionKind::DT),
            2 => Ok(ReactionKind::DHe3),
            3 => Ok(ReactionKind::DDp),
            4 => Ok(ReactionKind::DDn),
            other => Err(FusionError::ConfigError(format!(
                "unknown reaction id {other}, expected 1..=4"
            ))),
        }
    }
}
