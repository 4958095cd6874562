// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Histogram Grid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! N-dimensional histogram over a [`GridLayout`] with a flat, row-major,
//! atomically updated bin array.
//!
//! The flat index of a bin tuple `(i_0, …, i_{k-1})` is `Σ i_k · stride_k`
//! with `stride_k = Π_{j>k} n_j`, most-significant axis first. The flat
//! array is also the only persisted form of a grid.

use crate::atomic::AtomicF64;
use fusion_types::axis::{wrap_angle, Axis, AxisKind, GridLayout};
use fusion_types::config::DistConfig;
use fusion_types::constants::TWO_PI;
use fusion_types::error::{FusionError, FusionResult};
use log::debug;
use ndarray::{ArrayD, IxDyn};
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Clone)]
pub struct HistogramGrid {
    layout: GridLayout,
    axes: Vec<Axis>,
    strides: Vec<usize>,
    bins: Vec<AtomicF64>,
}

impl fmt::Debug for HistogramGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistogramGrid")
            .field("layout", &self.layout)
            .field("shape", &self.shape())
            .field("total", &self.total())
            .finish()
    }
}

impl HistogramGrid {
    /// Zero-filled grid. `axes` must be given in layout order.
    pub fn new(layout: GridLayout, axes: Vec<Axis>) -> FusionResult<Self> {
        let kinds = layout.axis_kinds();
        if axes.len() != kinds.len() {
            return Err(FusionError::ConfigError(format!(
                "layout {layout:?} needs {} axes, got {}",
                kinds.len(),
                axes.len()
            )));
        }
        for (kind, axis) in kinds.iter().zip(&axes) {
            axis.validate(kind.label())?;
        }

        let mut strides = vec![1usize; axes.len()];
        let mut total = 1usize;
        for k in (0..axes.len()).rev() {
            strides[k] = total;
            total = total.checked_mul(axes[k].n).ok_or_else(|| {
                FusionError::ConfigError(format!("grid {layout:?} bin count overflows usize"))
            })?;
        }

        let bins = (0..total).map(|_| AtomicF64::new(0.0)).collect();
        Ok(HistogramGrid {
            layout,
            axes,
            strides,
            bins,
        })
    }

    pub fn from_config(cfg: &DistConfig) -> FusionResult<Self> {
        Self::new(cfg.layout, cfg.axes()?)
    }

    /// Grid with bin values taken from a flat row-major array.
    pub fn from_flat(layout: GridLayout, axes: Vec<Axis>, data: &[f64]) -> FusionResult<Self> {
        let grid = Self::new(layout, axes)?;
        if data.len() != grid.len() {
            return Err(FusionError::ShapeMismatch {
                expected: grid.len(),
                got: data.len(),
            });
        }
        for (bin, &value) in grid.bins.iter().zip(data) {
            bin.store(value);
        }
        Ok(grid)
    }

    /// Empty grid with the same axes.
    pub fn zeros_like(&self) -> Self {
        HistogramGrid {
            layout: self.layout,
            axes: self.axes.clone(),
            strides: self.strides.clone(),
            bins: (0..self.bins.len()).map(|_| AtomicF64::new(0.0)).collect(),
        }
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.n).collect()
    }

    /// Axis of the given kind, if the layout has one.
    pub fn axis(&self, kind: AxisKind) -> Option<&Axis> {
        self.layout.position(kind).map(|k| &self.axes[k])
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Flat index of a bin tuple. Tuple entries must be in range.
    #[inline]
    pub fn index(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.axes.len());
        coords
            .iter()
            .zip(&self.strides)
            .map(|(&i, &stride)| i * stride)
            .sum()
    }

    /// Like [`HistogramGrid::index`] but `None` for a malformed tuple.
    pub fn checked_index(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.axes.len() || coords.iter().zip(&self.axes).any(|(&i, a)| i >= a.n)
        {
            return None;
        }
        Some(self.index(coords))
    }

    /// Inverse of [`HistogramGrid::index`].
    pub fn unindex(&self, flat: usize) -> Vec<usize> {
        let mut coords = vec![0; self.axes.len()];
        self.unindex_into(flat, &mut coords);
        coords
    }

    #[inline]
    pub fn unindex_into(&self, flat: usize, coords: &mut [usize]) {
        let mut rest = flat;
        for (c, &stride) in coords.iter_mut().zip(&self.strides) {
            *c = rest / stride;
            rest %= stride;
        }
    }

    pub fn bin_center(&self, axis: usize, i: usize) -> f64 {
        self.axes[axis].center(i)
    }

    /// Bin of a physical value along axis `axis`; angular axes are wrapped
    /// first.
    pub fn bin_of(&self, axis: usize, value: f64) -> Option<usize> {
        let kind = self.layout.axis_kinds()[axis];
        let value = if kind.is_angular() {
            wrap_angle(value)
        } else {
            value
        };
        self.axes[axis].bin_of(value)
    }

    /// Flat index of a physical point, or `None` when any coordinate is out
    /// of range.
    pub fn locate(&self, values: &[f64]) -> Option<usize> {
        if values.len() != self.axes.len() {
            return None;
        }
        let mut flat = 0;
        for (k, &v) in values.iter().enumerate() {
            flat += self.bin_of(k, v)? * self.strides[k];
        }
        Some(flat)
    }

    /// Atomic add; concurrent callers never lose updates.
    #[inline]
    pub fn accumulate(&self, flat: usize, delta: f64) {
        self.bins[flat].fetch_add(delta);
    }

    #[inline]
    pub fn read(&self, flat: usize) -> f64 {
        self.bins[flat].load()
    }

    /// Overwrite a bin.
    #[inline]
    pub fn store(&self, flat: usize, value: f64) {
        self.bins[flat].store(value);
    }

    pub fn clear(&self) {
        for bin in &self.bins {
            bin.store(0.0);
        }
    }

    pub fn total(&self) -> f64 {
        self.bins.iter().map(AtomicF64::load).sum()
    }

    pub fn to_flat(&self) -> Vec<f64> {
        self.bins.iter().map(AtomicF64::load).collect()
    }

    pub fn to_ndarray(&self) -> FusionResult<ArrayD<f64>> {
        let data = self.to_flat();
        let got = data.len();
        ArrayD::from_shape_vec(IxDyn(&self.shape()), data).map_err(|_| {
            FusionError::ShapeMismatch {
                expected: self.len(),
                got,
            }
        })
    }

    fn require(&self, kind: AxisKind) -> FusionResult<usize> {
        self.layout.position(kind).ok_or_else(|| {
            FusionError::ConfigError(format!(
                "grid layout {:?} has no {} axis",
                self.layout,
                kind.label()
            ))
        })
    }

    /// Number of momentum bins `(n_p∥, n_p⊥)` of a lab 5D grid.
    pub fn momentum_shape(&self) -> FusionResult<(usize, usize)> {
        let kpara = self.require(AxisKind::PPara)?;
        let kperp = self.require(AxisKind::PPerp)?;
        Ok((self.axes[kpara].n, self.axes[kperp].n))
    }

    /// Momentum sub-grid at a spatial bin of a lab 5D grid, p∥ outer and p⊥
    /// inner, summed over any time and charge bins.
    pub fn momentum_marginal(&self, ir: usize, iphi: usize, iz: usize) -> FusionResult<Vec<f64>> {
        if self.layout != GridLayout::Lab5D {
            return Err(FusionError::ConfigError(format!(
                "momentum marginal needs a lab5d grid, got {:?}",
                self.layout
            )));
        }
        let [nr, nphi, nz, npara, nperp, nt, nq] =
            [0, 1, 2, 3, 4, 5, 6].map(|k| self.axes[k].n);
        if ir >= nr || iphi >= nphi || iz >= nz {
            return Err(FusionError::ConfigError(format!(
                "spatial bin ({ir}, {iphi}, {iz}) outside grid ({nr}, {nphi}, {nz})"
            )));
        }
        let s = &self.strides;
        let base = ir * s[0] + iphi * s[1] + iz * s[2];
        let mut out = vec![0.0; npara * nperp];
        for ipara in 0..npara {
            for iperp in 0..nperp {
                let cell = base + ipara * s[3] + iperp * s[4];
                let mut sum = 0.0;
                for it in 0..nt {
                    for iq in 0..nq {
                        sum += self.read(cell + it * s[5] + iq * s[6]);
                    }
                }
                out[ipara * nperp + iperp] = sum;
            }
        }
        Ok(out)
    }

    /// Volume `2π·r_c·Δr·Δz` of the toroidal shell of spatial bin `(ir, iz)`.
    pub fn shell_volume(&self, ir: usize, iz: usize) -> FusionResult<f64> {
        let r = &self.axes[self.require(AxisKind::R)?];
        let z = &self.axes[self.require(AxisKind::Z)?];
        Ok(TWO_PI * r.center(ir) * r.width() * z.width())
    }

    /// Phase-space-integrated density of a spatial bin of a lab 5D grid.
    pub fn spatial_density(&self, ir: usize, iphi: usize, iz: usize) -> FusionResult<f64> {
        let mass: f64 = self.momentum_marginal(ir, iphi, iz)?.iter().sum();
        Ok(mass / self.shell_volume(ir, iz)?)
    }
}

/// Read a native-endian flat `f64` array with exactly `expected_len` values.
///
/// A missing file yields [`FusionError::MissingResource`]; callers that
/// requested the resource must treat that as fatal.
pub fn load_flat_f64(path: impl AsRef<Path>, expected_len: usize) -> FusionResult<Vec<f64>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            FusionError::MissingResource {
                path: path.to_path_buf(),
                source,
            }
        } else {
            FusionError::Io(source)
        }
    })?;
    const WIDTH: usize = std::mem::size_of::<f64>();
    if bytes.len() % WIDTH != 0 || bytes.len() / WIDTH != expected_len {
        return Err(FusionError::ShapeMismatch {
            expected: expected_len,
            got: bytes.len() / WIDTH,
        });
    }
    debug!("loaded {expected_len} values from {}", path.display());
    Ok(bytes
        .chunks_exact(WIDTH)
        .map(|chunk| {
            let mut word = [0u8; WIDTH];
            word.copy_from_slice(chunk);
            f64::from_ne_bytes(word)
        })
        .collect())
}

/// Write a flat `f64` array in the format read by [`load_flat_f64`].
pub fn save_flat_f64(path: impl AsRef<Path>, data: &[f64]) -> FusionResult<()> {
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_ne_bytes()).collect();
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn lab_grid(nt: usize) -> HistogramGrid {
        HistogramGrid::new(
            GridLayout::Lab5D,
            vec![
                Axis::new(2, 4.0, 8.0),
                Axis::new(3, 0.0, TWO_PI),
                Axis::new(2, -2.0, 2.0),
                Axis::new(4, -1.0, 1.0),
                Axis::new(4, 0.0, 1.0),
                Axis::new(nt, 0.0, 1.0),
                Axis::new(1, 0.5, 1.5),
            ],
        )
        .unwrap()
    }

    fn temp_path(tag: &str) -> std::path::PathBuf {
        let epoch_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "fusion_dist_{tag}_{}_{}.bin",
            std::process::id(),
            epoch_ns
        ))
    }

    #[test]
    fn test_strides_row_major() {
        let grid = lab_grid(2);
        assert_eq!(grid.len(), 2 * 3 * 2 * 4 * 4 * 2);
        assert_eq!(grid.strides(), &[192, 64, 32, 8, 2, 1, 1]);
        assert_eq!(grid.index(&[1, 0, 0, 0, 0, 0, 0]), 192);
        assert_eq!(grid.index(&[0, 0, 0, 0, 1, 0, 0]), 2);
    }

    #[test]
    fn test_index_unindex_roundtrip() {
        let grid = lab_grid(2);
        for flat in 0..grid.len() {
            let coords = grid.unindex(flat);
            assert_eq!(grid.index(&coords), flat);
        }
        assert_eq!(grid.checked_index(&[2, 0, 0, 0, 0, 0, 0]), None);
        assert_eq!(grid.checked_index(&[0, 0]), None);
    }

    #[test]
    fn test_new_rejects_wrong_axis_count() {
        let err = HistogramGrid::new(GridLayout::Spatial3D, vec![Axis::new(1, 0.0, 1.0)]);
        match err {
            Err(FusionError::ConfigError(msg)) => assert!(msg.contains("needs 3 axes")),
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_locate_wraps_angles() {
        let grid = lab_grid(1);
        let flat = grid
            .locate(&[5.0, -0.1, 0.5, 0.1, 0.3, 0.2, 1.0])
            .unwrap();
        assert_eq!(grid.unindex(flat), vec![0, 2, 1, 2, 1, 0, 0]);
        assert_eq!(grid.locate(&[8.0, 0.0, 0.0, 0.0, 0.5, 0.5, 1.0]), None);
    }

    #[test]
    fn test_momentum_marginal_sums_time_bins() {
        let grid = lab_grid(2);
        grid.accumulate(grid.index(&[1, 2, 0, 3, 1, 0, 0]), 1.0);
        grid.accumulate(grid.index(&[1, 2, 0, 3, 1, 1, 0]), 2.0);
        grid.accumulate(grid.index(&[0, 2, 0, 3, 1, 1, 0]), 5.0);
        let m = grid.momentum_marginal(1, 2, 0).unwrap();
        assert_eq!(m.len(), 16);
        assert_eq!(m[3 * 4 + 1], 3.0);
        assert_eq!(m.iter().sum::<f64>(), 3.0);
        assert!(grid.momentum_marginal(2, 0, 0).is_err());
    }

    #[test]
    fn test_spatial_density_divides_by_shell_volume() {
        let grid = lab_grid(1);
        grid.accumulate(grid.index(&[0, 0, 1, 0, 0, 0, 0]), 10.0);
        let vol = grid.shell_volume(0, 1).unwrap();
        assert!((vol - TWO_PI * 5.0 * 2.0 * 2.0).abs() < 1e-12);
        assert!((grid.spatial_density(0, 0, 1).unwrap() - 10.0 / vol).abs() < 1e-15);
        assert_eq!(grid.spatial_density(1, 0, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_flat_and_ndarray_views() {
        let grid = lab_grid(1);
        let flat = grid.index(&[1, 1, 1, 1, 1, 0, 0]);
        grid.accumulate(flat, 0.25);
        let data = grid.to_flat();
        assert_eq!(data[flat], 0.25);

        let arr = grid.to_ndarray().unwrap();
        assert_eq!(arr.shape(), &[2, 3, 2, 4, 4, 1, 1]);
        assert_eq!(arr[IxDyn(&[1, 1, 1, 1, 1, 0, 0])], 0.25);

        let back = HistogramGrid::from_flat(grid.layout(), grid.axes().to_vec(), &data).unwrap();
        assert_eq!(back.read(flat), 0.25);
        assert_eq!(back.total(), grid.total());

        match HistogramGrid::from_flat(grid.layout(), grid.axes().to_vec(), &data[1..]) {
            Err(FusionError::ShapeMismatch { expected, got }) => {
                assert_eq!(expected, data.len());
                assert_eq!(got, data.len() - 1);
            }
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_flat_file_roundtrip_and_missing() {
        let path = temp_path("roundtrip");
        let data = vec![0.5, -1.0, 3.25];
        save_flat_f64(&path, &data).unwrap();
        assert_eq!(load_flat_f64(&path, 3).unwrap(), data);
        assert!(matches!(
            load_flat_f64(&path, 4),
            Err(FusionError::ShapeMismatch { expected: 4, got: 3 })
        ));
        let _ = std::fs::remove_file(&path);

        match load_flat_f64(&path, 3) {
            Err(FusionError::MissingResource { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Unexpected result: {other:?}"),
        }
    }
}
