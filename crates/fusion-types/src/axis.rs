// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Axis
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Uniform histogram axes and the axis sets of the distribution layouts.

use crate::constants::TWO_PI;
use crate::error::{FusionError, FusionResult};
use serde::{Deserialize, Serialize};

/// Largest number of axes any layout carries (rho 6D).
pub const MAX_AXES: usize = 8;

/// Physical quantity binned along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    R,
    Phi,
    Z,
    Rho,
    Theta,
    PPara,
    PPerp,
    PR,
    PPhi,
    PZ,
    Time,
    Charge,
}

impl AxisKind {
    /// Angular axes are wrapped into [0, 2π) before bin lookup.
    pub fn is_angular(self) -> bool {
        matches!(self, AxisKind::Phi | AxisKind::Theta)
    }

    pub fn label(self) -> &'static str {
        match self {
            AxisKind::R => "r",
            AxisKind::Phi => "phi",
            AxisKind::Z => "z",
            AxisKind::Rho => "rho",
            AxisKind::Theta => "theta",
            AxisKind::PPara => "ppara",
            AxisKind::PPerp => "pperp",
            AxisKind::PR => "pr",
            AxisKind::PPhi => "pphi",
            AxisKind::PZ => "pz",
            AxisKind::Time => "time",
            AxisKind::Charge => "charge",
        }
    }
}

/// Axis set of a histogram, most-significant axis first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridLayout {
    /// (r, φ, z, p∥, p⊥, t, q)
    #[serde(rename = "lab5d")]
    Lab5D,
    /// (ρ, θ, φ, p∥, p⊥, t, q)
    #[serde(rename = "rho5d")]
    Rho5D,
    /// (ρ, θ, φ, p_r, p_φ, p_z, t, q)
    #[serde(rename = "rho6d")]
    Rho6D,
    /// (r, φ, z), used for fusion source output.
    #[serde(rename = "spatial3d")]
    Spatial3D,
}

const LAB5D_AXES: [AxisKind; 7] = [
    AxisKind::R,
    AxisKind::Phi,
    AxisKind::Z,
    AxisKind::PPara,
    AxisKind::PPerp,
    AxisKind::Time,
    AxisKind::Charge,
];

const RHO5D_AXES: [AxisKind; 7] = [
    AxisKind::Rho,
    AxisKind::Theta,
    AxisKind::Phi,
    AxisKind::PPara,
    AxisKind::PPerp,
    AxisKind::Time,
    AxisKind::Charge,
];

const RHO6D_AXES: [AxisKind; 8] = [
    AxisKind::Rho,
    AxisKind::Theta,
    AxisKind::Phi,
    AxisKind::PR,
    AxisKind::PPhi,
    AxisKind::PZ,
    AxisKind::Time,
    AxisKind::Charge,
];

const SPATIAL3D_AXES: [AxisKind; 3] = [AxisKind::R, AxisKind::Phi, AxisKind::Z];

impl GridLayout {
    pub fn axis_kinds(self) -> &'static [AxisKind] {
        match self {
            GridLayout::Lab5D => &LAB5D_AXES,
            GridLayout::Rho5D => &RHO5D_AXES,
            GridLayout::Rho6D => &RHO6D_AXES,
            GridLayout::Spatial3D => &SPATIAL3D_AXES,
        }
    }

    pub fn n_axes(self) -> usize {
        self.axis_kinds().len()
    }

    /// Position of `kind` in this layout, if present.
    pub fn position(self, kind: AxisKind) -> Option<usize> {
        self.axis_kinds().iter().position(|&k| k == kind)
    }
}

/// Uniform partition of `[min, max)` into `n` bins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub n: usize,
    pub min: f64,
    pub max: f64,
}

impl Axis {
    pub fn new(n: usize, min: f64, max: f64) -> Self {
        Axis { n, min, max }
    }

    pub fn validate(&self, name: &str) -> FusionResult<()> {
        if self.n == 0 {
            return Err(FusionError::InvalidAxis {
                name: name.to_string(),
                message: "bin count must be >= 1".to_string(),
            });
        }
        if !self.min.is_finite() || !self.max.is_finite() || self.max <= self.min {
            return Err(FusionError::InvalidAxis {
                name: name.to_string(),
                message: format!(
                    "range must be finite with max > min, got [{}, {}]",
                    self.min, self.max
                ),
            });
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.n as f64
    }

    /// True when `value` lies in `[min, max)`. NaN is never contained.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }

    /// `floor((value - min) / width)` clamped to `0..=n-1`; NaN maps to 0.
    ///
    /// Total over all inputs so callers can evaluate a whole lane set before
    /// masking with [`Axis::contains`].
    #[inline]
    pub fn clamped_bin(&self, value: f64) -> usize {
        let f = ((value - self.min) / self.width()).floor();
        // NaN clamps to NaN and casts to 0.
        f.clamp(0.0, (self.n - 1) as f64) as usize
    }

    /// Bin holding `value`, or `None` when out of range. A value exactly at
    /// `max` is out of range even when `(max - min) / width` rounds below `n`.
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        if self.contains(value) {
            Some(self.clamped_bin(value))
        } else {
            None
        }
    }

    pub fn center(&self, i: usize) -> f64 {
        self.min + (i as f64 + 0.5) * self.width()
    }

    /// Lower edge of bin `i`.
    pub fn edge(&self, i: usize) -> f64 {
        self.min + i as f64 * self.width()
    }

    /// Mesh vertex `i` when the axis is read as `n` points spanning
    /// `[min, max]` inclusive.
    pub fn vertex(&self, i: usize) -> f64 {
        let denom = self.n.saturating_sub(1).max(1) as f64;
        self.min + (self.max - self.min) * i as f64 / denom
    }
}

/// Wrap an angle into `[0, 2π)`.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TWO_PI);
    if wrapped >= TWO_PI {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_of_boundaries() {
        let axis = Axis::new(4, 0.0, 2.0);
        assert_eq!(axis.bin_of(0.0), Some(0));
        assert_eq!(axis.bin_of(0.49), Some(0));
        assert_eq!(axis.bin_of(0.5), Some(1));
        assert_eq!(axis.bin_of(1.999), Some(3));
        assert_eq!(axis.bin_of(2.0), None, "value at max must be rejected");
        assert_eq!(axis.bin_of(-1e-12), None);
        assert_eq!(axis.bin_of(f64::NAN), None);
    }

    #[test]
    fn test_value_at_max_rejected_for_any_bin_count() {
        let ranges: [(f64, f64); 5] = [(4.0, 8.5), (0.1, 1.0), (-4.5, 4.5), (0.0, 59.60122739012425), (-2.0, 2.0)];
        for &(min, max) in &ranges {
            let below_max = f64::from_bits(max.to_bits() - 1);
            for n in 1..200 {
                let axis = Axis::new(n, min, max);
                assert_eq!(axis.bin_of(max), None, "n {n} range [{min}, {max}]");
                assert_eq!(axis.bin_of(below_max), Some(n - 1), "n {n} range [{min}, {max}]");
                assert_eq!(axis.bin_of(min), Some(0));
                assert!(axis.clamped_bin(max) < n);
            }
        }
    }

    #[test]
    fn test_center_and_vertex() {
        let axis = Axis::new(4, 1.0, 3.0);
        assert!((axis.center(0) - 1.25).abs() < 1e-12);
        assert!((axis.center(3) - 2.75).abs() < 1e-12);
        assert!((axis.vertex(0) - 1.0).abs() < 1e-12);
        assert!((axis.vertex(3) - 3.0).abs() < 1e-12);
        let single = Axis::new(1, 0.0, 1.0);
        assert_eq!(single.vertex(0), 0.0);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(-0.5) - (TWO_PI - 0.5)).abs() < 1e-12);
        assert!((wrap_angle(TWO_PI + 0.25) - 0.25).abs() < 1e-12);
        assert_eq!(wrap_angle(0.0), 0.0);
        assert!(wrap_angle(-1e-300) < TWO_PI);
    }

    #[test]
    fn test_validate_rejects_bad_axes() {
        assert!(Axis::new(0, 0.0, 1.0).validate("r").is_err());
        assert!(Axis::new(2, 1.0, 1.0).validate("r").is_err());
        assert!(Axis::new(2, f64::NAN, 1.0).validate("r").is_err());
        assert!(Axis::new(2, 0.0, 1.0).validate("r").is_ok());
    }

    #[test]
    fn test_layout_positions() {
        assert_eq!(GridLayout::Lab5D.n_axes(), 7);
        assert_eq!(GridLayout::Rho6D.n_axes(), MAX_AXES);
        assert_eq!(GridLayout::Rho5D.position(AxisKind::Phi), Some(2));
        assert_eq!(GridLayout::Spatial3D.position(AxisKind::PPara), None);
        assert!(AxisKind::Theta.is_angular());
        assert!(!AxisKind::Rho.is_angular());
    }
}
