// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::axis::{Axis, GridLayout};
use crate::constants::{M_ALPHA, Q_ELECTRON};
use crate::error::{FusionError, FusionResult};
use crate::reaction::ReactionKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub dist: DistConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub afsi: Option<AfsiConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmc: Option<BmcConfig>,
}

/// One histogram axis as written in JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisConfig {
    pub n: usize,
    pub min: f64,
    pub max: f64,
}

/// Histogram layout plus one axis entry per layout axis, in layout order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistConfig {
    pub layout: GridLayout,
    pub axes: Vec<AxisConfig>,
}

impl DistConfig {
    /// Validated axes in layout order.
    pub fn axes(&self) -> FusionResult<Vec<Axis>> {
        let kinds = self.layout.axis_kinds();
        if self.axes.len() != kinds.len() {
            return Err(FusionError::ConfigError(format!(
                "layout {:?} needs {} axes, config lists {}",
                self.layout,
                kinds.len(),
                self.axes.len()
            )));
        }
        kinds
            .iter()
            .zip(&self.axes)
            .map(|(kind, cfg)| {
                let axis = Axis::new(cfg.n, cfg.min, cfg.max);
                axis.validate(kind.label())?;
                Ok(axis)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AfsiConfig {
    pub reaction: ReactionKind,
    /// Velocity-pair draws per spatial bin.
    #[serde(default = "default_afsi_samples")]
    pub n_samples: usize,
    #[serde(default)]
    pub seed: u64,
}

fn default_afsi_samples() -> usize {
    1000
}

/// Marker allocation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmcStrategy {
    #[default]
    Direct,
    MarkovChain,
    FullMesh,
    SourceReplication,
}

/// Localized source-region factor
/// `exp(radial_gain·r − (z − z_center)² / z_width)` applied for
/// `phi_min <= φ <= phi_max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceRegion {
    #[serde(default = "default_phi_min")]
    pub phi_min: f64,
    #[serde(default = "default_phi_max")]
    pub phi_max: f64,
    #[serde(default = "default_radial_gain")]
    pub radial_gain: f64,
    #[serde(default = "default_z_center")]
    pub z_center: f64,
    #[serde(default = "default_z_width")]
    pub z_width: f64,
}

fn default_phi_min() -> f64 {
    3.67
}
fn default_phi_max() -> f64 {
    4.19
}
fn default_radial_gain() -> f64 {
    2.61
}
fn default_z_center() -> f64 {
    0.093
}
fn default_z_width() -> f64 {
    0.021
}

impl Default for SourceRegion {
    fn default() -> Self {
        SourceRegion {
            phi_min: default_phi_min(),
            phi_max: default_phi_max(),
            radial_gain: default_radial_gain(),
            z_center: default_z_center(),
            z_width: default_z_width(),
        }
    }
}

impl SourceRegion {
    /// Multiplicative factor at `(r, φ, z)`; 1 outside the toroidal window.
    pub fn factor(&self, r: f64, phi: f64, z: f64) -> f64 {
        if phi >= self.phi_min && phi <= self.phi_max {
            let dz = z - self.z_center;
            (self.radial_gain * r - dz * dz / self.z_width).exp()
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BmcConfig {
    /// Requested total marker count.
    pub n_total: usize,
    #[serde(default)]
    pub strategy: BmcStrategy,
    #[serde(default)]
    pub from_probability: bool,
    #[serde(default)]
    pub from_density: bool,
    #[serde(default)]
    pub from_particles: bool,
    #[serde(default = "default_probability_path")]
    pub probability_path: PathBuf,
    #[serde(default)]
    pub seed: u64,
    /// Initial time stamped on generated markers.
    #[serde(default)]
    pub time: f64,
    #[serde(default = "default_marker_mass")]
    pub mass: f64,
    #[serde(default = "default_marker_charge")]
    pub charge: f64,
    #[serde(default = "default_n_per_vertex")]
    pub n_per_vertex: usize,
    /// Markov-chain proposals allowed per requested marker.
    #[serde(default = "default_max_proposals_factor")]
    pub max_proposals_factor: usize,
    #[serde(default)]
    pub rank: usize,
    #[serde(default = "default_n_ranks")]
    pub n_ranks: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_region: Option<SourceRegion>,
}

fn default_probability_path() -> PathBuf {
    PathBuf::from("distr_prob")
}
fn default_marker_mass() -> f64 {
    M_ALPHA
}
fn default_marker_charge() -> f64 {
    2.0 * Q_ELECTRON
}
fn default_n_per_vertex() -> usize {
    1
}
fn default_max_proposals_factor() -> usize {
    100
}
fn default_n_ranks() -> usize {
    1
}

impl BmcConfig {
    pub fn new(n_total: usize, strategy: BmcStrategy) -> Self {
        BmcConfig {
            n_total,
            strategy,
            from_probability: false,
            from_density: false,
            from_particles: false,
            probability_path: default_probability_path(),
            seed: 0,
            time: 0.0,
            mass: default_marker_mass(),
            charge: default_marker_charge(),
            n_per_vertex: default_n_per_vertex(),
            max_proposals_factor: default_max_proposals_factor(),
            rank: 0,
            n_ranks: default_n_ranks(),
            source_region: None,
        }
    }

    pub fn validate(&self) -> FusionResult<()> {
        if self.n_total == 0 {
            return Err(FusionError::ConfigError(
                "bmc.n_total must be >= 1".to_string(),
            ));
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(FusionError::ConfigError(format!(
                "bmc.mass must be finite and > 0, got {}",
                self.mass
            )));
        }
        if !self.charge.is_finite() {
            return Err(FusionError::ConfigError(
                "bmc.charge must be finite".to_string(),
            ));
        }
        if self.n_per_vertex == 0 {
            return Err(FusionError::ConfigError(
                "bmc.n_per_vertex must be >= 1".to_string(),
            ));
        }
        if self.n_ranks == 0 || self.rank >= self.n_ranks {
            return Err(FusionError::ConfigError(format!(
                "bmc.rank {} out of range for {} ranks",
                self.rank, self.n_ranks
            )));
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> FusionResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }
}
