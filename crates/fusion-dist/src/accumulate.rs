// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Batch Accumulator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Time-residence accumulation of particle batches into a histogram.
//!
//! Each running lane of the "after" batch deposits
//! `weight · (t_after − t_before)` into the bin holding its "after" state.
//! Coordinates are first computed for every lane, one axis at a time, and
//! a lane is deposited only if all of its coordinates are in range.

use crate::grid::HistogramGrid;
use fusion_types::axis::{wrap_angle, AxisKind, GridLayout, MAX_AXES};
use fusion_types::constants::Q_ELECTRON;
use fusion_types::error::{FusionError, FusionResult};
use fusion_types::fields::GuidingCenterTransform;
use fusion_types::state::{b_norm, FoBatch, GcBatch};
use log::debug;
use rayon::prelude::*;

/// Per-axis coordinates of every lane of a batch.
struct LaneValues<const W: usize> {
    values: [[f64; W]; MAX_AXES],
}

impl<const W: usize> LaneValues<W> {
    fn new() -> Self {
        LaneValues {
            values: [[0.0; W]; MAX_AXES],
        }
    }

    fn set(&mut self, k: usize, src: &[f64; W]) {
        self.values[k] = *src;
    }

    fn set_wrapped(&mut self, k: usize, src: &[f64; W]) {
        for (dst, &v) in self.values[k].iter_mut().zip(src) {
            *dst = wrap_angle(v);
        }
    }

    fn set_charge(&mut self, k: usize, charge: &[f64; W]) {
        for (dst, &q) in self.values[k].iter_mut().zip(charge) {
            *dst = q / Q_ELECTRON;
        }
    }
}

/// Deposits particle batches into a shared [`HistogramGrid`].
///
/// All methods take `&self` and may be called from many threads at once.
#[derive(Debug, Clone, Copy)]
pub struct BatchAccumulator<'g> {
    grid: &'g HistogramGrid,
}

impl<'g> BatchAccumulator<'g> {
    /// Accumulator for a phase-space grid; spatial-only grids are rejected.
    pub fn new(grid: &'g HistogramGrid) -> FusionResult<Self> {
        if grid.layout() == GridLayout::Spatial3D {
            return Err(FusionError::ConfigError(
                "spatial3d grids cannot accumulate particle batches".to_string(),
            ));
        }
        Ok(BatchAccumulator { grid })
    }

    pub fn grid(&self) -> &'g HistogramGrid {
        self.grid
    }

    /// Deposit a full-orbit batch. Returns the number of lanes deposited.
    ///
    /// p∥ is the momentum projected on the local field direction and p⊥ the
    /// orthogonal remainder.
    pub fn update_fo<const W: usize>(&self, before: &FoBatch<W>, after: &FoBatch<W>) -> usize {
        let kinds = self.grid.layout().axis_kinds();
        let needs_split = kinds
            .iter()
            .any(|k| matches!(k, AxisKind::PPara | AxisKind::PPerp));

        let mut ppara = [0.0; W];
        let mut pperp = [0.0; W];
        if needs_split {
            for lane in 0..W {
                let (pr, pphi, pz) = (after.p_r[lane], after.p_phi[lane], after.p_z[lane]);
                let (br, bphi, bz) = (after.b_r[lane], after.b_phi[lane], after.b_z[lane]);
                let bnorm = (br * br + bphi * bphi + bz * bz).sqrt();
                let p2 = pr * pr + pphi * pphi + pz * pz;
                ppara[lane] = (pr * br + pphi * bphi + pz * bz) / bnorm;
                pperp[lane] = (p2 - ppara[lane] * ppara[lane]).max(0.0).sqrt();
            }
        }

        let mut lanes = LaneValues::<W>::new();
        for (k, kind) in kinds.iter().enumerate() {
            match kind {
                AxisKind::R => lanes.set(k, &after.r),
                AxisKind::Z => lanes.set(k, &after.z),
                AxisKind::Rho => lanes.set(k, &after.rho),
                AxisKind::Phi => lanes.set_wrapped(k, &after.phi),
                AxisKind::Theta => lanes.set_wrapped(k, &after.theta),
                AxisKind::PPara => lanes.set(k, &ppara),
                AxisKind::PPerp => lanes.set(k, &pperp),
                AxisKind::PR => lanes.set(k, &after.p_r),
                AxisKind::PPhi => lanes.set(k, &after.p_phi),
                AxisKind::PZ => lanes.set(k, &after.p_z),
                AxisKind::Time => lanes.set(k, &after.time),
                AxisKind::Charge => lanes.set_charge(k, &after.charge),
            }
        }

        let mut deposit = [0.0; W];
        for lane in 0..W {
            deposit[lane] = after.weight[lane] * (after.time[lane] - before.time[lane]);
        }
        self.deposit(&lanes, &after.running, &deposit)
    }

    /// Deposit a guiding-center batch. Returns the number of lanes deposited.
    ///
    /// p⊥ is `sqrt(2|B|μm)`; Cartesian momentum axes are filled through
    /// `transform` from the 12-component field array.
    pub fn update_gc<const W: usize, T>(
        &self,
        before: &GcBatch<W>,
        after: &GcBatch<W>,
        transform: &T,
    ) -> usize
    where
        T: GuidingCenterTransform + ?Sized,
    {
        let kinds = self.grid.layout().axis_kinds();

        let mut pperp = [0.0; W];
        if kinds.contains(&AxisKind::PPerp) {
            for lane in 0..W {
                let bnorm = b_norm(&after.b_db[lane]);
                pperp[lane] = (2.0 * bnorm * after.mu[lane] * after.mass[lane])
                    .max(0.0)
                    .sqrt();
            }
        }

        let mut p_cart = [[0.0; W]; 3];
        if kinds.contains(&AxisKind::PR) {
            for lane in 0..W {
                if !after.running[lane] {
                    continue;
                }
                let p = transform.momentum(
                    after.mass[lane],
                    after.charge[lane],
                    &after.b_db[lane],
                    after.phi[lane],
                    after.ppar[lane],
                    after.mu[lane],
                    after.zeta[lane],
                );
                for c in 0..3 {
                    p_cart[c][lane] = p[c];
                }
            }
        }

        let mut lanes = LaneValues::<W>::new();
        for (k, kind) in kinds.iter().enumerate() {
            match kind {
                AxisKind::R => lanes.set(k, &after.r),
                AxisKind::Z => lanes.set(k, &after.z),
                AxisKind::Rho => lanes.set(k, &after.rho),
                AxisKind::Phi => lanes.set_wrapped(k, &after.phi),
                AxisKind::Theta => lanes.set_wrapped(k, &after.theta),
                AxisKind::PPara => lanes.set(k, &after.ppar),
                AxisKind::PPerp => lanes.set(k, &pperp),
                AxisKind::PR => lanes.set(k, &p_cart[0]),
                AxisKind::PPhi => lanes.set(k, &p_cart[1]),
                AxisKind::PZ => lanes.set(k, &p_cart[2]),
                AxisKind::Time => lanes.set(k, &after.time),
                AxisKind::Charge => lanes.set_charge(k, &after.charge),
            }
        }

        let mut deposit = [0.0; W];
        for lane in 0..W {
            deposit[lane] = after.weight[lane] * (after.time[lane] - before.time[lane]);
        }
        self.deposit(&lanes, &after.running, &deposit)
    }

    fn deposit<const W: usize>(
        &self,
        lanes: &LaneValues<W>,
        running: &[bool; W],
        amount: &[f64; W],
    ) -> usize {
        let mut valid = *running;
        let mut flat = [0usize; W];
        for (k, (axis, &stride)) in self
            .grid
            .axes()
            .iter()
            .zip(self.grid.strides())
            .enumerate()
        {
            for lane in 0..W {
                let v = lanes.values[k][lane];
                valid[lane] &= axis.contains(v);
                flat[lane] += axis.clamped_bin(v) * stride;
            }
        }

        let mut deposited = 0;
        for lane in 0..W {
            if valid[lane] {
                self.grid.accumulate(flat[lane], amount[lane]);
                deposited += 1;
            }
        }
        deposited
    }
}

/// Deposit many full-orbit batches in parallel into one grid.
pub fn accumulate_fo_batches<const W: usize>(
    grid: &HistogramGrid,
    before: &[FoBatch<W>],
    after: &[FoBatch<W>],
) -> FusionResult<usize> {
    if before.len() != after.len() {
        return Err(FusionError::ShapeMismatch {
            expected: before.len(),
            got: after.len(),
        });
    }
    let acc = BatchAccumulator::new(grid)?;
    let deposited: usize = before
        .par_iter()
        .zip(after.par_iter())
        .map(|(b, a)| acc.update_fo(b, a))
        .sum();
    debug!("fo accumulate: {} batches, {deposited} lanes deposited", before.len());
    Ok(deposited)
}

/// Deposit many guiding-center batches in parallel into one grid.
pub fn accumulate_gc_batches<const W: usize, T>(
    grid: &HistogramGrid,
    before: &[GcBatch<W>],
    after: &[GcBatch<W>],
    transform: &T,
) -> FusionResult<usize>
where
    T: GuidingCenterTransform + ?Sized,
{
    if before.len() != after.len() {
        return Err(FusionError::ShapeMismatch {
            expected: before.len(),
            got: after.len(),
        });
    }
    let acc = BatchAccumulator::new(grid)?;
    let deposited: usize = before
        .par_iter()
        .zip(after.par_iter())
        .map(|(b, a)| acc.update_gc(b, a, transform))
        .sum();
    debug!("gc accumulate: {} batches, {deposited} lanes deposited", before.len());
    Ok(deposited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_types::axis::Axis;
    use fusion_types::constants::{AFSI_M_DEUTERIUM, TWO_PI};
    use fusion_types::fields::ZerothOrderTransform;
    use fusion_types::state::{pack_fo, FoParticle, GcParticle};

    const P0: f64 = 1.0e-19;

    fn lab5d() -> HistogramGrid {
        HistogramGrid::new(
            GridLayout::Lab5D,
            vec![
                Axis::new(4, 4.0, 8.0),
                Axis::new(2, 0.0, TWO_PI),
                Axis::new(4, -2.0, 2.0),
                Axis::new(4, -P0, P0),
                Axis::new(2, 0.0, P0),
                Axis::new(1, 0.0, 1.0),
                Axis::new(2, 0.5, 2.5),
            ],
        )
        .unwrap()
    }

    fn fo_particle(r: f64, p_phi: f64, p_z: f64, time: f64) -> FoParticle {
        FoParticle {
            id: 1,
            r,
            phi: 0.5,
            z: 0.5,
            rho: 0.4,
            theta: 1.0,
            p_r: 0.0,
            p_phi,
            p_z,
            b_field: [0.0, 5.0, 0.0],
            mass: AFSI_M_DEUTERIUM,
            charge: Q_ELECTRON,
            weight: 2.0,
            time,
        }
    }

    fn gc_particle(ppar: f64, pperp: f64, time: f64) -> GcParticle {
        let mut b_db = [0.0; 12];
        b_db[4] = 2.0;
        GcParticle {
            id: 7,
            r: 6.0,
            phi: -0.1,
            z: 0.0,
            rho: 0.35,
            theta: 7.0,
            ppar,
            mu: pperp * pperp / (2.0 * AFSI_M_DEUTERIUM * 2.0),
            zeta: 0.3,
            b_db,
            mass: AFSI_M_DEUTERIUM,
            charge: 2.0 * Q_ELECTRON,
            weight: 1.0,
            time,
        }
    }

    #[test]
    fn test_fo_lab5d_projects_momentum_on_field() {
        let grid = lab5d();
        let acc = BatchAccumulator::new(&grid).unwrap();
        // p∥ = 0.6 P0 along φ̂, p⊥ = 0.3 P0 along ẑ.
        let before = pack_fo::<4>(&[fo_particle(6.5, 0.6 * P0, 0.3 * P0, 0.0)]);
        let after = pack_fo::<4>(&[fo_particle(6.5, 0.6 * P0, 0.3 * P0, 0.25)]);
        assert_eq!(acc.update_fo(&before[0], &after[0]), 1);

        let flat = grid.index(&[2, 0, 2, 3, 0, 0, 0]);
        assert!((grid.read(flat) - 0.5).abs() < 1e-15);
        assert!((grid.total() - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_out_of_range_lane_contributes_nothing() {
        let grid = lab5d();
        let acc = BatchAccumulator::new(&grid).unwrap();
        let before = pack_fo::<4>(&[
            fo_particle(6.0, 0.1 * P0, 0.0, 0.0),
            fo_particle(8.0, 0.1 * P0, 0.0, 0.0),
            fo_particle(6.0, 2.0 * P0, 0.0, 0.0),
        ]);
        let after = pack_fo::<4>(&[
            fo_particle(6.0, 0.1 * P0, 0.0, 0.5),
            fo_particle(8.0, 0.1 * P0, 0.0, 0.5),
            fo_particle(6.0, 2.0 * P0, 0.0, 0.5),
        ]);
        assert_eq!(acc.update_fo(&before[0], &after[0]), 1);
        assert!((grid.total() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_lane_at_axis_max_is_rejected_when_width_rounds_down() {
        // (8.5 - 4.0) / (4.5 / 7) rounds to just below 7.
        let grid = HistogramGrid::new(
            GridLayout::Lab5D,
            vec![
                Axis::new(7, 4.0, 8.5),
                Axis::new(2, 0.0, TWO_PI),
                Axis::new(4, -2.0, 2.0),
                Axis::new(4, -P0, P0),
                Axis::new(2, 0.0, P0),
                Axis::new(1, 0.0, 1.0),
                Axis::new(2, 0.5, 2.5),
            ],
        )
        .unwrap();
        let acc = BatchAccumulator::new(&grid).unwrap();
        let below = f64::from_bits(8.5f64.to_bits() - 1);
        let before = pack_fo::<2>(&[
            fo_particle(8.5, 0.1 * P0, 0.0, 0.0),
            fo_particle(below, 0.1 * P0, 0.0, 0.0),
        ]);
        let after = pack_fo::<2>(&[
            fo_particle(8.5, 0.1 * P0, 0.0, 0.5),
            fo_particle(below, 0.1 * P0, 0.0, 0.5),
        ]);
        assert_eq!(acc.update_fo(&before[0], &after[0]), 1);
        let flat = grid.index(&[6, 0, 2, 2, 0, 0, 0]);
        assert!((grid.read(flat) - 1.0).abs() < 1e-15);
        assert!((grid.total() - 1.0).abs() < 1e-15);
    }

    fn rho5d() -> HistogramGrid {
        HistogramGrid::new(
            GridLayout::Rho5D,
            vec![
                Axis::new(10, 0.0, 1.0),
                Axis::new(4, 0.0, TWO_PI),
                Axis::new(2, 0.0, TWO_PI),
                Axis::new(4, -P0, P0),
                Axis::new(2, 0.0, P0),
                Axis::new(1, 0.0, 1.0),
                Axis::new(2, 0.5, 2.5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_fo_rho5d_wraps_angles_in_axis_order() {
        let grid = rho5d();
        let acc = BatchAccumulator::new(&grid).unwrap();
        let mut p = fo_particle(6.0, 0.6 * P0, 0.3 * P0, 0.0);
        // θ = -1 wraps to 2π - 1 (bin 3), φ = -0.5 wraps to 2π - 0.5 (bin 1).
        p.rho = 0.45;
        p.theta = -1.0;
        p.phi = -0.5;
        let mut q = p;
        q.time = 0.25;
        let before = pack_fo::<4>(&[p]);
        let after = pack_fo::<4>(&[q]);
        assert_eq!(acc.update_fo(&before[0], &after[0]), 1);

        let flat = grid.index(&[4, 3, 1, 3, 0, 0, 0]);
        assert!((grid.read(flat) - 0.5).abs() < 1e-15);
        assert!((grid.total() - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_gc_rho5d_wraps_angles_in_axis_order() {
        let grid = rho5d();
        let acc = BatchAccumulator::new(&grid).unwrap();
        let mut before = GcBatch::<2>::empty();
        let mut after = GcBatch::<2>::empty();
        before.set_lane(0, &gc_particle(-0.9 * P0, 0.75 * P0, 0.0));
        after.set_lane(0, &gc_particle(-0.9 * P0, 0.75 * P0, 0.5));
        assert_eq!(acc.update_gc(&before, &after, &ZerothOrderTransform), 1);

        // ρ = 0.35, θ = 7 wraps to 7 - 2π (bin 0), φ = -0.1 wraps (bin 1),
        // p⊥ = 0.75 P0 from μ and |B| = 2, q = 2 e.
        let flat = grid.index(&[3, 0, 1, 0, 1, 0, 1]);
        assert!((grid.read(flat) - 0.5).abs() < 1e-15);
        assert!((grid.total() - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_fo_rho6d_uses_raw_momentum_components() {
        let grid = HistogramGrid::new(
            GridLayout::Rho6D,
            vec![
                Axis::new(10, 0.0, 1.0),
                Axis::new(4, 0.0, TWO_PI),
                Axis::new(1, 0.0, TWO_PI),
                Axis::new(2, -P0, P0),
                Axis::new(2, -P0, P0),
                Axis::new(2, -P0, P0),
                Axis::new(1, 0.0, 1.0),
                Axis::new(1, 0.5, 1.5),
            ],
        )
        .unwrap();
        let acc = BatchAccumulator::new(&grid).unwrap();
        let mut p = fo_particle(6.0, 0.6 * P0, -0.3 * P0, 0.0);
        p.rho = 0.45;
        p.p_r = -0.4 * P0;
        let mut q = p;
        q.time = 0.25;
        let before = pack_fo::<4>(&[p]);
        let after = pack_fo::<4>(&[q]);
        assert_eq!(acc.update_fo(&before[0], &after[0]), 1);

        let flat = grid.index(&[4, 0, 0, 0, 1, 0, 0, 0]);
        assert!((grid.read(flat) - 0.5).abs() < 1e-15);
        assert!((grid.total() - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_inactive_lane_is_skipped() {
        let grid = lab5d();
        let acc = BatchAccumulator::new(&grid).unwrap();
        let before = pack_fo::<2>(&[fo_particle(6.0, 0.0, 0.1 * P0, 0.0)]);
        let mut after = pack_fo::<2>(&[fo_particle(6.0, 0.0, 0.1 * P0, 1.0)]);
        after[0].running[0] = false;
        assert_eq!(acc.update_fo(&before[0], &after[0]), 0);
        assert_eq!(grid.total(), 0.0);
    }

    #[test]
    fn test_gc_lab5d_uses_magnetic_moment() {
        let grid = lab5d();
        let acc = BatchAccumulator::new(&grid).unwrap();
        let mut before = GcBatch::<1>::empty();
        let mut after = GcBatch::<1>::empty();
        before.set_lane(0, &gc_particle(-0.9 * P0, 0.75 * P0, 0.0));
        after.set_lane(0, &gc_particle(-0.9 * P0, 0.75 * P0, 0.5));
        assert_eq!(acc.update_gc(&before, &after, &ZerothOrderTransform), 1);
        // φ = -0.1 wraps into the upper φ bin, q = 2 e.
        let flat = grid.index(&[2, 1, 2, 0, 1, 0, 1]);
        assert!((grid.read(flat) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_gc_rho6d_uses_transform() {
        let grid = HistogramGrid::new(
            GridLayout::Rho6D,
            vec![
                Axis::new(10, 0.0, 1.0),
                Axis::new(4, 0.0, TWO_PI),
                Axis::new(1, 0.0, TWO_PI),
                Axis::new(2, -P0, P0),
                Axis::new(2, -P0, P0),
                Axis::new(2, -P0, P0),
                Axis::new(1, 0.0, 1.0),
                Axis::new(1, 1.5, 2.5),
            ],
        )
        .unwrap();
        let acc = BatchAccumulator::new(&grid).unwrap();
        let mut before = GcBatch::<2>::empty();
        let mut after = GcBatch::<2>::empty();
        before.set_lane(0, &gc_particle(0.5 * P0, 0.2 * P0, 0.0));
        after.set_lane(0, &gc_particle(0.5 * P0, 0.2 * P0, 0.1));
        assert_eq!(acc.update_gc(&before, &after, &ZerothOrderTransform), 1);

        let p = ZerothOrderTransform.momentum(
            after.mass[0],
            after.charge[0],
            &after.b_db[0],
            after.phi[0],
            after.ppar[0],
            after.mu[0],
            after.zeta[0],
        );
        let bin = |v: f64| if v < 0.0 { 0 } else { 1 };
        // θ = 7.0 wraps to 7.0 − 2π.
        let itheta = ((7.0 - TWO_PI) / (TWO_PI / 4.0)).floor() as usize;
        let flat = grid.index(&[3, itheta, 0, bin(p[0]), bin(p[1]), bin(p[2]), 0, 0]);
        assert!((grid.read(flat) - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_spatial_grid_is_rejected() {
        let grid = HistogramGrid::new(
            GridLayout::Spatial3D,
            vec![
                Axis::new(1, 4.0, 8.0),
                Axis::new(1, 0.0, TWO_PI),
                Axis::new(1, -1.0, 1.0),
            ],
        )
        .unwrap();
        assert!(BatchAccumulator::new(&grid).is_err());
    }

    #[test]
    fn test_parallel_driver_length_mismatch() {
        let grid = lab5d();
        let before = pack_fo::<4>(&[fo_particle(6.0, 0.0, 0.0, 0.0)]);
        let err = accumulate_fo_batches::<4>(&grid, &before, &[]).unwrap_err();
        assert!(matches!(err, FusionError::ShapeMismatch { expected: 1, got: 0 }));
    }
}
