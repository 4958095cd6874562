// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Importance Field
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-bin importance over the `(r, φ, z, p∥, p⊥)` mesh and the helpers
//! that map between mesh points, bins and marker states.

use crate::bmc::ImportanceSampler;
use fusion_dist::grid::load_flat_f64;
use fusion_types::axis::wrap_angle;
use fusion_types::constants::C_LIGHT;
use fusion_types::error::{FusionError, FusionResult};
use fusion_types::state::MarkerState;
use log::{debug, info, warn};

/// Number of binned phase-space axes `(r, φ, z, p∥, p⊥)`.
pub const PHASE_AXES: usize = 5;

/// Vertices of a multilinear stencil in 5D.
pub const STENCIL_SIZE: usize = 1 << PHASE_AXES;

const PPARA: usize = 3;
const PPERP: usize = 4;

/// The 2⁵ nearest bins of a phase-space point and their multilinear
/// weights, which sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stencil {
    pub bins: [usize; STENCIL_SIZE],
    pub weights: [f64; STENCIL_SIZE],
}

/// Relativistic kinetic energy `sqrt(p²c² + m²c⁴) − mc²` (J), evaluated
/// without cancellation at low momentum.
pub fn kinetic_energy(mass: f64, p: f64) -> f64 {
    let pc2 = p * p * C_LIGHT * C_LIGHT;
    let mc2 = mass * C_LIGHT * C_LIGHT;
    pc2 / ((pc2 + mc2 * mc2).sqrt() + mc2)
}

/// `(r, φ, z, p∥, p⊥)` of a marker, φ wrapped into [0, 2π).
pub fn marker_coordinates(state: &MarkerState) -> [f64; PHASE_AXES] {
    [
        state.r,
        wrap_angle(state.phi),
        state.z,
        state.ppar,
        state.pperp(),
    ]
}

impl ImportanceSampler<'_> {
    /// Flat grid index of a 5D bin tuple (time and charge bin 0).
    pub(crate) fn mesh_flat(&self, idx: &[usize; PHASE_AXES]) -> usize {
        let strides = self.grid.strides();
        idx.iter().zip(strides).map(|(&i, &s)| i * s).sum()
    }

    pub(crate) fn mesh_shape(&self) -> [usize; PHASE_AXES] {
        let axes = self.grid.axes();
        std::array::from_fn(|k| axes[k].n)
    }

    pub(crate) fn mesh_index(&self, flat: usize) -> [usize; PHASE_AXES] {
        let mut coords = [0usize; 7];
        self.grid.unindex_into(flat, &mut coords);
        [coords[0], coords[1], coords[2], coords[3], coords[4]]
    }

    pub(crate) fn bin_centers(&self, idx: &[usize; PHASE_AXES]) -> [f64; PHASE_AXES] {
        let axes = self.grid.axes();
        std::array::from_fn(|k| axes[k].center(idx[k]))
    }

    /// Bin holding a phase-space point.
    pub(crate) fn locate(&self, coords: &[f64; PHASE_AXES]) -> Option<usize> {
        let mut idx = [0usize; PHASE_AXES];
        for k in 0..PHASE_AXES {
            idx[k] = self.grid.bin_of(k, coords[k])?;
        }
        Some(self.mesh_flat(&idx))
    }

    /// Multilinear stencil around bin centers; neighbours past the mesh
    /// edge are clamped to the edge bin. `None` when the point lies outside
    /// the mesh.
    pub(crate) fn stencil(&self, coords: &[f64; PHASE_AXES]) -> Option<Stencil> {
        let axes = self.grid.axes();
        let mut lo = [0usize; PHASE_AXES];
        let mut hi = [0usize; PHASE_AXES];
        let mut frac = [0.0; PHASE_AXES];
        for k in 0..PHASE_AXES {
            let axis = &axes[k];
            let v = coords[k];
            if v.is_nan() || v < axis.min || v >= axis.max {
                return None;
            }
            let x = (v - axis.min) / axis.width() - 0.5;
            let i0 = x.floor();
            frac[k] = x - i0;
            let top = (axis.n - 1) as f64;
            lo[k] = i0.clamp(0.0, top) as usize;
            hi[k] = (i0 + 1.0).clamp(0.0, top) as usize;
        }

        let mut stencil = Stencil {
            bins: [0; STENCIL_SIZE],
            weights: [0.0; STENCIL_SIZE],
        };
        for corner in 0..STENCIL_SIZE {
            let mut idx = [0usize; PHASE_AXES];
            let mut w = 1.0;
            for k in 0..PHASE_AXES {
                if (corner >> k) & 1 == 1 {
                    idx[k] = hi[k];
                    w *= frac[k];
                } else {
                    idx[k] = lo[k];
                    w *= 1.0 - frac[k];
                }
            }
            stencil.bins[corner] = self.mesh_flat(&idx);
            stencil.weights[corner] = w;
        }
        Some(stencil)
    }

    /// Multilinear interpolation of a per-bin field; negative entries are
    /// treated as zero.
    pub(crate) fn interpolate(&self, values: &[f64], stencil: &Stencil) -> f64 {
        stencil
            .bins
            .iter()
            .zip(&stencil.weights)
            .map(|(&bin, &w)| {
                let v = values[bin];
                if v < 0.0 {
                    warn!("probability ill-defined ({v}) at bin {bin}, using 0; increase velocity mesh size");
                    0.0
                } else {
                    w * v
                }
            })
            .sum()
    }

    /// Guiding-center marker at a mesh point; `None` if the field cannot be
    /// evaluated there.
    pub(crate) fn mesh_marker(&self, point: &[f64; PHASE_AXES], id: u64) -> Option<MarkerState> {
        let [r, phi, z, ppara, pperp] = *point;
        let cfg = &self.config;
        let b = match self.field.b_field(r, phi, z, cfg.time) {
            Ok(b) => b,
            Err(err) => {
                debug!("no field at r {r} phi {phi} z {z}: {err}");
                return None;
            }
        };
        let rho = match self.field.rho(r, phi, z, cfg.time) {
            Ok(rho) => rho,
            Err(err) => {
                debug!("no rho at r {r} phi {phi} z {z}: {err}");
                return None;
            }
        };
        let b_norm = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
        if !b_norm.is_finite() || b_norm <= 0.0 {
            return None;
        }
        Some(MarkerState {
            id,
            r,
            phi,
            z,
            rho,
            ppar: ppara,
            mu: pperp * pperp / (2.0 * cfg.mass * b_norm),
            zeta: 0.0,
            b_norm,
            mass: cfg.mass,
            charge: cfg.charge,
            weight: 1.0,
            time: cfg.time,
        })
    }

    /// Energy-weighted density of an existing marker population, spread
    /// over each marker's stencil. Vertices outside the wall are skipped.
    pub fn rebin_markers(&self, markers: &[MarkerState]) -> Vec<f64> {
        let mut density = vec![0.0; self.grid.len()];
        for m in markers {
            let coords = marker_coordinates(m);
            let Some(stencil) = self.stencil(&coords) else {
                warn!(
                    "input marker {} outside mesh: r {:e} phi {:e} z {:e} ppar {:e}",
                    m.id, m.r, m.phi, m.z, m.ppar
                );
                continue;
            };
            for (&bin, &w) in stencil.bins.iter().zip(&stencil.weights) {
                let [r, _, z, ppara, pperp] = self.bin_centers(&self.mesh_index(bin));
                if !self.wall.inside(r, z) {
                    continue;
                }
                let energy = kinetic_energy(m.mass, ppara.hypot(pperp));
                density[bin] += w * m.weight * energy;
            }
        }
        density
    }

    /// Product of the enabled importance factors per bin.
    ///
    /// Bins on the first or last p∥/p⊥ row and bins whose `(r, z)` center
    /// lies outside the wall are zero.
    pub fn importance_field(&self, input: &[MarkerState]) -> FusionResult<Vec<f64>> {
        let cfg = &self.config;
        let len = self.grid.len();

        let probability = if cfg.from_probability {
            Some(load_flat_f64(&cfg.probability_path, len)?)
        } else {
            None
        };
        let from_particles = if cfg.from_particles {
            Some(self.rebin_markers(input))
        } else {
            None
        };
        let profile = if cfg.from_density {
            Some(self.profile.ok_or_else(|| {
                FusionError::ConfigError(
                    "density-based importance needs a plasma profile".to_string(),
                )
            })?)
        } else {
            None
        };

        let shape = self.mesh_shape();
        let mut field = Vec::with_capacity(len);
        for flat in 0..len {
            let idx = self.mesh_index(flat);
            if idx[PPARA] == 0
                || idx[PPARA] == shape[PPARA] - 1
                || idx[PPERP] == 0
                || idx[PPERP] == shape[PPERP] - 1
            {
                field.push(0.0);
                continue;
            }
            let [r, phi, z, _, _] = self.bin_centers(&idx);
            if !self.wall.inside(r, z) {
                field.push(0.0);
                continue;
            }

            let mut h = 1.0;
            if let Some(density) = &from_particles {
                h *= density[flat];
            }
            if let Some(profile) = profile {
                match self.field.rho(r, phi, z, cfg.time) {
                    Ok(rho) => h *= profile.density(rho, 0)?,
                    Err(err) => {
                        debug!("no rho at bin {flat}: {err}");
                        h = 0.0;
                    }
                }
                if let Some(region) = &cfg.source_region {
                    h *= region.factor(r, phi, z);
                }
            }
            if let Some(prob) = &probability {
                let mut p = prob[flat];
                if p < 0.0 {
                    warn!("probability ill-defined ({p}) at bin {flat}, using 0; increase velocity mesh size");
                    p = 0.0;
                }
                h *= p;
            }
            if !h.is_finite() || h < 0.0 {
                warn!("importance ill-defined ({h}) at bin {flat}, using 0");
                h = 0.0;
            }
            field.push(h);
        }

        let sum: f64 = field.iter().sum();
        info!(
            "importance field over {len} bins: sum {sum:e}, {} positive",
            field.iter().filter(|&&h| h > 0.0).count()
        );
        Ok(field)
    }
}
