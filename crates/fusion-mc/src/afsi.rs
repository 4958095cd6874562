// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Fusion Source Integrator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Monte Carlo fusion production rate between two reactant populations.
//!
//! For every spatial bin with positive density in both populations, `n`
//! momentum pairs are drawn, turned into velocities with a random
//! perpendicular orientation, and
//! `ρ₁·ρ₂·|v_rel|·σ(E_com)/n·V` is summed over the draws. Bins are
//! independent; each owns an RNG stream keyed by `(seed, flat_index)`, so
//! the output does not depend on the rayon thread count.

use crate::cross_section::CrossSection;
use crate::rng::{sign, stream};
use crate::sampler::MomentumSource;
use fusion_dist::HistogramGrid;
use fusion_types::axis::{Axis, GridLayout};
use fusion_types::config::AfsiConfig;
use fusion_types::constants::AFSI_EV_J;
use fusion_types::error::{FusionError, FusionResult};
use fusion_types::reaction::ReactionKind;
use log::{debug, info};
use rand::Rng;
use rayon::prelude::*;

pub struct ReactionIntegrator<'a, C: CrossSection + ?Sized> {
    reaction: ReactionKind,
    n_samples: usize,
    seed: u64,
    cross_section: &'a C,
}

impl<'a, C: CrossSection + ?Sized> ReactionIntegrator<'a, C> {
    pub fn new(
        reaction: ReactionKind,
        n_samples: usize,
        seed: u64,
        cross_section: &'a C,
    ) -> FusionResult<Self> {
        if n_samples == 0 {
            return Err(FusionError::ConfigError(
                "afsi n_samples must be >= 1".to_string(),
            ));
        }
        Ok(ReactionIntegrator {
            reaction,
            n_samples,
            seed,
            cross_section,
        })
    }

    pub fn from_config(cfg: &AfsiConfig, cross_section: &'a C) -> FusionResult<Self> {
        Self::new(cfg.reaction, cfg.n_samples, cfg.seed, cross_section)
    }

    /// Production rate (s⁻¹) per spatial bin as a new spatial 3D grid.
    pub fn run(&self, dist1: &MomentumSource, dist2: &MomentumSource) -> FusionResult<HistogramGrid> {
        let axes = dist1.spatial_axes();
        let out = HistogramGrid::new(GridLayout::Spatial3D, axes.to_vec())?;
        self.run_into(dist1, dist2, &out)?;
        Ok(out)
    }

    /// Overwrite every bin of `out` with the production rate.
    pub fn run_into(
        &self,
        dist1: &MomentumSource,
        dist2: &MomentumSource,
        out: &HistogramGrid,
    ) -> FusionResult<()> {
        let axes = dist1.spatial_axes();
        check_same_mesh(&axes, &dist2.spatial_axes(), "reactant 2")?;
        if out.layout() != GridLayout::Spatial3D {
            return Err(FusionError::ConfigError(format!(
                "fusion rate output must be spatial3d, got {:?}",
                out.layout()
            )));
        }
        check_same_mesh(&axes, &[out.axes()[0], out.axes()[1], out.axes()[2]], "output")?;

        (0..out.len()).into_par_iter().try_for_each(|flat| {
            let coords = out.unindex(flat);
            let mut rng = stream(self.seed, flat as u64);
            let rate = self.bin_rate(dist1, dist2, coords[0], coords[1], coords[2], &mut rng)?;
            out.store(flat, rate);
            Ok::<(), FusionError>(())
        })?;

        info!(
            "AFSI {:?}: {} spatial bins, {} samples/bin, total rate {:e} 1/s",
            self.reaction,
            out.len(),
            self.n_samples,
            out.total()
        );
        Ok(())
    }

    /// Production rate of one spatial bin.
    pub fn bin_rate<R: Rng + ?Sized>(
        &self,
        dist1: &MomentumSource,
        dist2: &MomentumSource,
        ir: usize,
        iphi: usize,
        iz: usize,
        rng: &mut R,
    ) -> FusionResult<f64> {
        let density1 = dist1.density(ir, iphi, iz)?;
        let density2 = dist2.density(ir, iphi, iz)?;
        if density1 <= 0.0 || density2 <= 0.0 || density1.is_nan() || density2.is_nan() {
            return Ok(0.0);
        }

        let (m1, m2) = self.reaction.masses();
        let n = self.n_samples;
        let (ppara1, pperp1) = dist1.draw_momentum(ir, iphi, iz, m1, n, rng)?;
        let (ppara2, pperp2) = dist2.draw_momentum(ir, iphi, iz, m2, n, rng)?;
        let volume = dist1.shell_volume(ir, iz);
        let reduced = self.reaction.reduced_mass();

        let mut rate = 0.0;
        for i in 0..n {
            let v1 = velocity(ppara1[i], pperp1[i], m1, rng);
            let v2 = velocity(ppara2[i], pperp2[i], m2, rng);
            let vrel2 = (v1[0] - v2[0]).powi(2) + (v1[1] - v2[1]).powi(2) + (v1[2] - v2[2]).powi(2);
            let e_com = 0.5 * reduced * vrel2 / AFSI_EV_J;
            let sigma = self.cross_section.sigma(self.reaction, 1e-3 * e_com);
            rate += density1 * density2 * vrel2.sqrt() * sigma / n as f64 * volume;
        }
        debug!("AFSI bin ({ir}, {iphi}, {iz}): n1 {density1:e} n2 {density2:e} rate {rate:e}");
        Ok(rate)
    }
}

/// Velocity with p∥ along ẑ and p⊥ split between x̂ and ŷ by a uniform
/// fraction, each perpendicular component with a random sign.
fn velocity<R: Rng + ?Sized>(ppara: f64, pperp: f64, mass: f64, rng: &mut R) -> [f64; 3] {
    let sx = sign(rng);
    let sy = sign(rng);
    let frac: f64 = rng.gen();
    [
        sx * pperp / mass * frac.sqrt(),
        sy * pperp / mass * (1.0 - frac).sqrt(),
        ppara / mass,
    ]
}

fn check_same_mesh(expected: &[Axis; 3], got: &[Axis; 3], what: &str) -> FusionResult<()> {
    if expected != got {
        return Err(FusionError::ConfigError(format!(
            "{what} spatial mesh {got:?} differs from reactant 1 mesh {expected:?}"
        )));
    }
    Ok(())
}
