// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Particle and marker states handed over by the orbit integrator.
//!
//! Batches are structure-of-arrays with a fixed lane count `W` and a
//! `running` mask, so per-lane arithmetic can be vectorized or scalarized
//! per target without changing the accumulation logic.

/// Default lane width of particle batches.
pub const NSIMD: usize = 8;

/// Magnitude of B from the 12-component field-and-derivatives array
/// `[B_r, ∂B_r/∂r, ∂B_r/∂φ, ∂B_r/∂z, B_φ, …, B_z, …]`.
#[inline]
pub fn b_norm(b_db: &[f64; 12]) -> f64 {
    (b_db[0] * b_db[0] + b_db[4] * b_db[4] + b_db[8] * b_db[8]).sqrt()
}

/// Single full-orbit particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoParticle {
    pub id: i64,
    pub r: f64,
    pub phi: f64,
    pub z: f64,
    pub rho: f64,
    pub theta: f64,
    pub p_r: f64,
    pub p_phi: f64,
    pub p_z: f64,
    pub b_field: [f64; 3],
    pub mass: f64,
    pub charge: f64,
    pub weight: f64,
    pub time: f64,
}

/// Single guiding-center particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcParticle {
    pub id: i64,
    pub r: f64,
    pub phi: f64,
    pub z: f64,
    pub rho: f64,
    pub theta: f64,
    pub ppar: f64,
    pub mu: f64,
    pub zeta: f64,
    pub b_db: [f64; 12],
    pub mass: f64,
    pub charge: f64,
    pub weight: f64,
    pub time: f64,
}

/// Full-orbit particle lanes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoBatch<const W: usize> {
    pub r: [f64; W],
    pub phi: [f64; W],
    pub z: [f64; W],
    pub rho: [f64; W],
    pub theta: [f64; W],
    pub p_r: [f64; W],
    pub p_phi: [f64; W],
    pub p_z: [f64; W],
    pub b_r: [f64; W],
    pub b_phi: [f64; W],
    pub b_z: [f64; W],
    pub mass: [f64; W],
    pub charge: [f64; W],
    pub weight: [f64; W],
    pub time: [f64; W],
    pub id: [i64; W],
    pub running: [bool; W],
    pub endcond: [u32; W],
}

impl<const W: usize> FoBatch<W> {
    /// All lanes idle (`running == false`, `id == -1`).
    pub fn empty() -> Self {
        FoBatch {
            r: [0.0; W],
            phi: [0.0; W],
            z: [0.0; W],
            rho: [0.0; W],
            theta: [0.0; W],
            p_r: [0.0; W],
            p_phi: [0.0; W],
            p_z: [0.0; W],
            b_r: [0.0; W],
            b_phi: [0.0; W],
            b_z: [0.0; W],
            mass: [0.0; W],
            charge: [0.0; W],
            weight: [0.0; W],
            time: [0.0; W],
            id: [-1; W],
            running: [false; W],
            endcond: [0; W],
        }
    }

    pub fn set_lane(&mut self, lane: usize, p: &FoParticle) {
        self.r[lane] = p.r;
        self.phi[lane] = p.phi;
        self.z[lane] = p.z;
        self.rho[lane] = p.rho;
        self.theta[lane] = p.theta;
        self.p_r[lane] = p.p_r;
        self.p_phi[lane] = p.p_phi;
        self.p_z[lane] = p.p_z;
        self.b_r[lane] = p.b_field[0];
        self.b_phi[lane] = p.b_field[1];
        self.b_z[lane] = p.b_field[2];
        self.mass[lane] = p.mass;
        self.charge[lane] = p.charge;
        self.weight[lane] = p.weight;
        self.time[lane] = p.time;
        self.id[lane] = p.id;
        self.running[lane] = true;
        self.endcond[lane] = 0;
    }

    pub fn n_running(&self) -> usize {
        self.running.iter().filter(|&&r| r).count()
    }
}

impl<const W: usize> Default for FoBatch<W> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Guiding-center particle lanes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcBatch<const W: usize> {
    pub r: [f64; W],
    pub phi: [f64; W],
    pub z: [f64; W],
    pub rho: [f64; W],
    pub theta: [f64; W],
    pub ppar: [f64; W],
    pub mu: [f64; W],
    pub zeta: [f64; W],
    pub b_db: [[f64; 12]; W],
    pub mass: [f64; W],
    pub charge: [f64; W],
    pub weight: [f64; W],
    pub time: [f64; W],
    pub id: [i64; W],
    pub running: [bool; W],
    pub endcond: [u32; W],
}

impl<const W: usize> GcBatch<W> {
    pub fn empty() -> Self {
        GcBatch {
            r: [0.0; W],
            phi: [0.0; W],
            z: [0.0; W],
            rho: [0.0; W],
            theta: [0.0; W],
            ppar: [0.0; W],
            mu: [0.0; W],
            zeta: [0.0; W],
            b_db: [[0.0; 12]; W],
            mass: [0.0; W],
            charge: [0.0; W],
            weight: [0.0; W],
            time: [0.0; W],
            id: [-1; W],
            running: [false; W],
            endcond: [0; W],
        }
    }

    pub fn set_lane(&mut self, lane: usize, p: &GcParticle) {
        self.r[lane] = p.r;
        self.phi[lane] = p.phi;
        self.z[lane] = p.z;
        self.rho[lane] = p.rho;
        self.theta[lane] = p.theta;
        self.ppar[lane] = p.ppar;
        self.mu[lane] = p.mu;
        self.zeta[lane] = p.zeta;
        self.b_db[lane] = p.b_db;
        self.mass[lane] = p.mass;
        self.charge[lane] = p.charge;
        self.weight[lane] = p.weight;
        self.time[lane] = p.time;
        self.id[lane] = p.id;
        self.running[lane] = true;
        self.endcond[lane] = 0;
    }

    pub fn n_running(&self) -> usize {
        self.running.iter().filter(|&&r| r).count()
    }
}

impl<const W: usize> Default for GcBatch<W> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Pack particles into `W`-wide batches; trailing lanes stay idle.
pub fn pack_fo<const W: usize>(particles: &[FoParticle]) -> Vec<FoBatch<W>> {
    particles
        .chunks(W)
        .map(|chunk| {
            let mut batch = FoBatch::<W>::empty();
            for (lane, p) in chunk.iter().enumerate() {
                batch.set_lane(lane, p);
            }
            batch
        })
        .collect()
}

pub fn pack_gc<const W: usize>(particles: &[GcParticle]) -> Vec<GcBatch<W>> {
    particles
        .chunks(W)
        .map(|chunk| {
            let mut batch = GcBatch::<W>::empty();
            for (lane, p) in chunk.iter().enumerate() {
                batch.set_lane(lane, p);
            }
            batch
        })
        .collect()
}

/// Guiding-center initial state of a generated marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerState {
    pub id: u64,
    pub r: f64,
    pub phi: f64,
    pub z: f64,
    pub rho: f64,
    pub ppar: f64,
    pub mu: f64,
    pub zeta: f64,
    pub b_norm: f64,
    pub mass: f64,
    pub charge: f64,
    pub weight: f64,
    pub time: f64,
}

impl MarkerState {
    /// Total momentum magnitude from p∥ and μ.
    pub fn momentum(&self) -> f64 {
        let pperp2 = 2.0 * self.b_norm * self.mu * self.mass;
        (self.ppar * self.ppar + pperp2.max(0.0)).sqrt()
    }

    pub fn pperp(&self) -> f64 {
        (2.0 * self.b_norm * self.mu * self.mass).max(0.0).sqrt()
    }
}

/// Marker with the inverse sampling density used to unbias estimators and
/// the flat histogram bin it was drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub state: MarkerState,
    pub inverse_weight: f64,
    pub bin: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fo(id: i64) -> FoParticle {
        FoParticle {
            id,
            r: 6.0,
            phi: 0.1,
            z: 0.0,
            rho: 0.5,
            theta: 0.2,
            p_r: 0.0,
            p_phi: 1e-20,
            p_z: 0.0,
            b_field: [0.0, 5.0, 0.0],
            mass: 3.344e-27,
            charge: 1.602e-19,
            weight: 1.0,
            time: 0.0,
        }
    }

    #[test]
    fn test_pack_fo_fills_and_masks_lanes() {
        let particles: Vec<FoParticle> = (0..11).map(fo).collect();
        let batches = pack_fo::<4>(&particles);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].n_running(), 4);
        assert_eq!(batches[2].n_running(), 3);
        assert!(!batches[2].running[3]);
        assert_eq!(batches[2].id[3], -1);
        assert_eq!(batches[2].id[2], 10);
    }

    #[test]
    fn test_b_norm_uses_field_components() {
        let mut b_db = [0.0; 12];
        b_db[0] = 3.0;
        b_db[4] = 4.0;
        b_db[1] = 100.0;
        assert!((b_norm(&b_db) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_marker_state_momentum() {
        let state = MarkerState {
            id: 0,
            r: 6.0,
            phi: 0.0,
            z: 0.0,
            rho: 0.3,
            ppar: 3.0,
            mu: 4.0 * 4.0 / (2.0 * 2.0 * 1.0),
            zeta: 0.0,
            b_norm: 2.0,
            mass: 1.0,
            charge: 1.0,
            weight: 1.0,
            time: 0.0,
        };
        assert!((state.pperp() - 4.0).abs() < 1e-12);
        assert!((state.momentum() - 5.0).abs() < 1e-12);
    }
}
