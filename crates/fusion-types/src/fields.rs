// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Collaborator Interfaces
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Narrow interfaces to the field, plasma and wall subsystems, plus small
//! analytic implementations used by tests, benches and simple setups.
//!
//! Vectors are in the local right-handed basis `(r̂, φ̂, ẑ)`.

use crate::error::{FusionError, FusionResult};

/// Magnetic field and flux-coordinate evaluation.
pub trait MagneticField: Sync {
    /// `(B_r, B_φ, B_z)` at a point.
    fn b_field(&self, r: f64, phi: f64, z: f64, t: f64) -> FusionResult<[f64; 3]>;

    /// Field and its spatial derivatives,
    /// `[B_r, ∂rB_r, ∂φB_r, ∂zB_r, B_φ, …, B_z, …]`.
    fn b_db(&self, r: f64, phi: f64, z: f64, t: f64) -> FusionResult<[f64; 12]> {
        let b = self.b_field(r, phi, z, t)?;
        let mut out = [0.0; 12];
        out[0] = b[0];
        out[4] = b[1];
        out[8] = b[2];
        Ok(out)
    }

    /// Normalized flux coordinate ρ.
    fn rho(&self, r: f64, phi: f64, z: f64, t: f64) -> FusionResult<f64>;
}

/// Local plasma density (m⁻³) and temperature (eV) per species.
pub trait PlasmaProfile: Sync {
    fn n_species(&self) -> usize;
    fn density(&self, rho: f64, species: usize) -> FusionResult<f64>;
    fn temperature(&self, rho: f64, species: usize) -> FusionResult<f64>;
}

/// Guiding-center `(p∥, μ, ζ)` to particle momentum `(p_r, p_φ, p_z)`.
pub trait GuidingCenterTransform: Sync {
    #[allow(clippy::too_many_arguments)]
    fn momentum(
        &self,
        mass: f64,
        charge: f64,
        b_db: &[f64; 12],
        phi: f64,
        ppar: f64,
        mu: f64,
        zeta: f64,
    ) -> [f64; 3];
}

/// First-wall inside/outside test in the poloidal plane.
pub trait WallGeometry: Sync {
    fn inside(&self, r: f64, z: f64) -> bool;
}

/// Spatially uniform field with a circular-cross-section ρ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformField {
    pub b: [f64; 3],
    pub axis_r: f64,
    pub axis_z: f64,
    pub minor_radius: f64,
}

impl UniformField {
    pub fn new(b: [f64; 3], axis_r: f64, axis_z: f64, minor_radius: f64) -> FusionResult<Self> {
        if b.iter().any(|c| !c.is_finite()) {
            return Err(FusionError::PhysicsViolation(
                "field components must be finite".to_string(),
            ));
        }
        if !minor_radius.is_finite() || minor_radius <= 0.0 {
            return Err(FusionError::PhysicsViolation(format!(
                "minor radius must be finite and > 0, got {minor_radius}"
            )));
        }
        Ok(UniformField {
            b,
            axis_r,
            axis_z,
            minor_radius,
        })
    }
}

impl MagneticField for UniformField {
    fn b_field(&self, _r: f64, _phi: f64, _z: f64, _t: f64) -> FusionResult<[f64; 3]> {
        Ok(self.b)
    }

    fn rho(&self, r: f64, _phi: f64, z: f64, _t: f64) -> FusionResult<f64> {
        let dr = r - self.axis_r;
        let dz = z - self.axis_z;
        Ok((dr * dr + dz * dz).sqrt() / self.minor_radius)
    }
}

/// Zeroth-order gyro transform: `p = p∥ b̂ + p⊥ (cos ζ ê₁ + sin ζ ê₂)`
/// with `p⊥ = sqrt(2 m |B| μ)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZerothOrderTransform;

impl GuidingCenterTransform for ZerothOrderTransform {
    fn momentum(
        &self,
        mass: f64,
        _charge: f64,
        b_db: &[f64; 12],
        _phi: f64,
        ppar: f64,
        mu: f64,
        zeta: f64,
    ) -> [f64; 3] {
        let b = [b_db[0], b_db[4], b_db[8]];
        let bnorm = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
        if bnorm == 0.0 {
            return [0.0; 3];
        }
        let bhat = [b[0] / bnorm, b[1] / bnorm, b[2] / bnorm];
        // Reference direction not parallel to b̂.
        let a = if bhat[2].abs() < 0.9 {
            [0.0, 0.0, 1.0]
        } else {
            [1.0, 0.0, 0.0]
        };
        let e1 = normalize(cross(bhat, a));
        let e2 = cross(bhat, e1);
        let pperp = (2.0 * mass * bnorm * mu).max(0.0).sqrt();
        let (s, c) = zeta.sin_cos();
        std::array::from_fn(|k| ppar * bhat[k] + pperp * (c * e1[k] + s * e2[k]))
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    [v[0] / n, v[1] / n, v[2] / n]
}

/// Profile `edge + (core − edge)·(1 − ρ²)^α` inside ρ < 1, edge value outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesProfile {
    pub density_core: f64,
    pub density_edge: f64,
    pub temperature_core: f64,
    pub temperature_edge: f64,
    pub alpha: f64,
}

impl SpeciesProfile {
    fn shape(&self, rho: f64) -> f64 {
        if rho < 1.0 {
            (1.0 - rho * rho).powf(self.alpha)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParabolicProfile {
    pub species: Vec<SpeciesProfile>,
}

impl ParabolicProfile {
    pub fn new(species: Vec<SpeciesProfile>) -> FusionResult<Self> {
        for (i, s) in species.iter().enumerate() {
            let values = [
                s.density_core,
                s.density_edge,
                s.temperature_core,
                s.temperature_edge,
                s.alpha,
            ];
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(FusionError::PhysicsViolation(format!(
                    "species {i} profile parameters must be finite and >= 0"
                )));
            }
        }
        Ok(ParabolicProfile { species })
    }

    fn get(&self, species: usize) -> FusionResult<&SpeciesProfile> {
        self.species.get(species).ok_or_else(|| {
            FusionError::ConfigError(format!(
                "species index {species} out of range ({} species)",
                self.species.len()
            ))
        })
    }
}

impl PlasmaProfile for ParabolicProfile {
    fn n_species(&self) -> usize {
        self.species.len()
    }

    fn density(&self, rho: f64, species: usize) -> FusionResult<f64> {
        let s = self.get(species)?;
        Ok(s.density_edge + (s.density_core - s.density_edge) * s.shape(rho))
    }

    fn temperature(&self, rho: f64, species: usize) -> FusionResult<f64> {
        let s = self.get(species)?;
        Ok(s.temperature_edge + (s.temperature_core - s.temperature_edge) * s.shape(rho))
    }
}

/// Axis-aligned box wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangularWall {
    pub r_min: f64,
    pub r_max: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl WallGeometry for RectangularWall {
    fn inside(&self, r: f64, z: f64) -> bool {
        r >= self.r_min && r <= self.r_max && z >= self.z_min && z <= self.z_max
    }
}

/// Closed polygon wall, point-in-polygon by ray casting.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonWall {
    r: Vec<f64>,
    z: Vec<f64>,
}

impl PolygonWall {
    pub fn new(r: Vec<f64>, z: Vec<f64>) -> FusionResult<Self> {
        if r.len() != z.len() {
            return Err(FusionError::ShapeMismatch {
                expected: r.len(),
                got: z.len(),
            });
        }
        if r.len() < 3 {
            return Err(FusionError::ConfigError(format!(
                "wall polygon needs at least 3 vertices, got {}",
                r.len()
            )));
        }
        if r.iter().chain(&z).any(|v| !v.is_finite()) {
            return Err(FusionError::PhysicsViolation(
                "wall vertices must be finite".to_string(),
            ));
        }
        Ok(PolygonWall { r, z })
    }

    pub fn n_vertices(&self) -> usize {
        self.r.len()
    }
}

impl WallGeometry for PolygonWall {
    fn inside(&self, r: f64, z: f64) -> bool {
        let n = self.r.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (ri, zi) = (self.r[i], self.z[i]);
            let (rj, zj) = (self.r[j], self.z[j]);
            if (zi > z) != (zj > z) && r < (rj - ri) * (z - zi) / (zj - zi) + ri {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_field_rho() {
        let field = UniformField::new([0.0, 5.0, 0.0], 6.0, 0.0, 2.0).unwrap();
        assert!((field.rho(7.0, 0.0, 0.0, 0.0).unwrap() - 0.5).abs() < 1e-12);
        let b_db = field.b_db(6.0, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(b_db[4], 5.0);
        assert_eq!(b_db[5], 0.0);
        assert!(UniformField::new([0.0, 1.0, 0.0], 6.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_transform_preserves_invariants() {
        let mut b_db = [0.0; 12];
        b_db[0] = 1.0;
        b_db[4] = 4.0;
        b_db[8] = -2.0;
        let bnorm = (1.0f64 + 16.0 + 4.0).sqrt();
        let (mass, ppar, pperp) = (2.0, 3.0, 1.5);
        let mu = pperp * pperp / (2.0 * mass * bnorm);
        for zeta in [0.0, 1.0, 2.5, 5.0] {
            let p = ZerothOrderTransform.momentum(mass, 1.0, &b_db, 0.0, ppar, mu, zeta);
            let along = (p[0] * 1.0 + p[1] * 4.0 + p[2] * -2.0) / bnorm;
            let total2 = p[0] * p[0] + p[1] * p[1] + p[2] * p[2];
            assert!((along - ppar).abs() < 1e-12);
            assert!((total2 - ppar * ppar - pperp * pperp).abs() < 1e-10);
        }
    }

    #[test]
    fn test_parabolic_profile() {
        let profile = ParabolicProfile::new(vec![SpeciesProfile {
            density_core: 1e20,
            density_edge: 1e18,
            temperature_core: 10e3,
            temperature_edge: 100.0,
            alpha: 1.0,
        }])
        .unwrap();
        assert_eq!(profile.n_species(), 1);
        assert!((profile.density(0.0, 0).unwrap() - 1e20).abs() < 1.0);
        assert!((profile.temperature(1.5, 0).unwrap() - 100.0).abs() < 1e-12);
        let mid = profile.temperature(0.5, 0).unwrap();
        assert!((mid - (100.0 + 9900.0 * 0.75)).abs() < 1e-9);
        match profile.density(0.2, 3) {
            Err(FusionError::ConfigError(msg)) => assert!(msg.contains("species index 3")),
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_polygon_wall() {
        let wall = PolygonWall::new(vec![4.0, 8.0, 8.0, 4.0], vec![-2.0, -2.0, 2.0, 2.0]).unwrap();
        assert_eq!(wall.n_vertices(), 4);
        assert!(wall.inside(6.0, 0.0));
        assert!(!wall.inside(3.9, 0.0));
        assert!(!wall.inside(6.0, 2.5));

        let triangle = PolygonWall::new(vec![0.0, 2.0, 0.0], vec![0.0, 0.0, 2.0]).unwrap();
        assert!(triangle.inside(0.5, 0.5));
        assert!(!triangle.inside(1.5, 1.5));
    }

    #[test]
    fn test_polygon_wall_rejects_bad_input() {
        assert!(matches!(
            PolygonWall::new(vec![0.0, 1.0], vec![0.0, 1.0, 2.0]),
            Err(FusionError::ShapeMismatch { .. })
        ));
        assert!(PolygonWall::new(vec![0.0, 1.0], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_rectangular_wall() {
        let wall = RectangularWall {
            r_min: 1.0,
            r_max: 2.0,
            z_min: -1.0,
            z_max: 1.0,
        };
        assert!(wall.inside(1.5, 0.0));
        assert!(!wall.inside(2.5, 0.0));
    }
}
