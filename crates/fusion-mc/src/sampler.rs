// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Distribution Sampler
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Momentum-space draws `(p∥, p⊥)` at a fixed spatial bin, either by
//! inverse-CDF search over a lab 5D histogram or from a local Maxwellian.

use crate::rng::open_unit;
use fusion_dist::HistogramGrid;
use fusion_types::axis::{Axis, AxisKind, GridLayout};
use fusion_types::constants::{AFSI_EV_J, TWO_PI};
use fusion_types::error::{FusionError, FusionResult};
use fusion_types::fields::{MagneticField, PlasmaProfile};
use rand::Rng;

/// Normalized cumulative momentum distribution of one spatial bin,
/// p∥ outer and p⊥ inner.
#[derive(Debug, Clone)]
pub struct MomentumTable {
    cumulative: Vec<f64>,
    ppara: Axis,
    pperp: Axis,
}

impl MomentumTable {
    /// Fails with [`FusionError::DegenerateDistribution`] when the bin holds
    /// no weight.
    pub fn from_grid(grid: &HistogramGrid, ir: usize, iphi: usize, iz: usize) -> FusionResult<Self> {
        let marginal = grid.momentum_marginal(ir, iphi, iz)?;
        let mut cumulative = Vec::with_capacity(marginal.len());
        let mut acc = 0.0;
        for v in marginal {
            acc += v;
            cumulative.push(acc);
        }
        if !acc.is_finite() || acc <= 0.0 {
            return Err(FusionError::DegenerateDistribution(format!(
                "momentum distribution at spatial bin ({ir}, {iphi}, {iz}) sums to {acc}"
            )));
        }
        for c in &mut cumulative {
            *c /= acc;
        }
        let axis = |kind: AxisKind| {
            grid.axis(kind).copied().ok_or_else(|| {
                FusionError::ConfigError(format!("grid has no {} axis", kind.label()))
            })
        };
        Ok(MomentumTable {
            cumulative,
            ppara: axis(AxisKind::PPara)?,
            pperp: axis(AxisKind::PPerp)?,
        })
    }

    /// Flat momentum index of the first cumulative entry exceeding `u`.
    #[inline]
    pub fn search(&self, u: f64) -> usize {
        let j = self.cumulative.partition_point(|&c| c <= u);
        j.min(self.cumulative.len() - 1)
    }

    /// One `(p∥, p⊥)` draw at bin centers.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        let j = self.search(rng.gen::<f64>());
        let n_perp = self.pperp.n;
        (self.ppara.center(j / n_perp), self.pperp.center(j % n_perp))
    }
}

/// Draw `n` momenta from a lab 5D histogram at a spatial bin.
pub fn sample_histogram<R: Rng + ?Sized>(
    grid: &HistogramGrid,
    ir: usize,
    iphi: usize,
    iz: usize,
    n: usize,
    rng: &mut R,
) -> FusionResult<(Vec<f64>, Vec<f64>)> {
    let table = MomentumTable::from_grid(grid, ir, iphi, iz)?;
    Ok((0..n).map(|_| table.draw(rng)).unzip())
}

/// Kinetic energy (eV) of a Maxwellian at temperature `t_ev`.
///
/// Polar method: `E = −T·(cos²α·ln u₃ + ln u₄)` with `cos²α = r₁²/(r₁²+r₂²)`
/// from a point uniform in the open unit quarter disk, which is exactly
/// Γ(3/2, T).
pub fn thermal_energy<R: Rng + ?Sized>(t_ev: f64, rng: &mut R) -> f64 {
    let (r1, w2) = loop {
        let r1: f64 = rng.gen();
        let r2: f64 = rng.gen();
        let w2 = r1 * r1 + r2 * r2;
        if w2 > 0.0 && w2 < 1.0 {
            break (r1, w2);
        }
    };
    let r3 = open_unit(rng);
    let r4 = open_unit(rng);
    -t_ev * (r1 * r1 / w2 * r3.ln() + r4.ln())
}

/// Draw `n` isotropic Maxwellian momenta `(p∥, p⊥)` for particles of `mass`.
pub fn sample_thermal<R: Rng + ?Sized>(
    t_ev: f64,
    mass: f64,
    n: usize,
    rng: &mut R,
) -> (Vec<f64>, Vec<f64>) {
    (0..n)
        .map(|_| {
            let energy = thermal_energy(t_ev, rng);
            let speed = (2.0 * energy * AFSI_EV_J / mass).sqrt();
            // Azimuth is drawn to keep the stream layout of an isotropic
            // 3-vector; only the polar angle enters (p∥, p⊥).
            let _azimuth = TWO_PI * rng.gen::<f64>();
            let polar = (1.0 - 2.0 * rng.gen::<f64>()).acos();
            (speed * polar.cos() * mass, speed * polar.sin() * mass)
        })
        .unzip()
}

/// Local Maxwellian plasma on an `(r, φ, z)` mesh.
#[derive(Debug, Clone)]
pub struct ThermalDistribution {
    axes: [Axis; 3],
    density: Vec<f64>,
    temperature: Vec<f64>,
}

impl ThermalDistribution {
    /// `density` (m⁻³) and `temperature` (eV) are row-major over `(r, φ, z)`.
    pub fn new(axes: [Axis; 3], density: Vec<f64>, temperature: Vec<f64>) -> FusionResult<Self> {
        for (axis, name) in axes.iter().zip(["r", "phi", "z"]) {
            axis.validate(name)?;
        }
        let len = axes[0].n * axes[1].n * axes[2].n;
        for values in [&density, &temperature] {
            if values.len() != len {
                return Err(FusionError::ShapeMismatch {
                    expected: len,
                    got: values.len(),
                });
            }
        }
        if density.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(FusionError::PhysicsViolation(
                "thermal density must be finite and >= 0".to_string(),
            ));
        }
        if temperature.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(FusionError::PhysicsViolation(
                "thermal temperature must be finite and >= 0".to_string(),
            ));
        }
        Ok(ThermalDistribution {
            axes,
            density,
            temperature,
        })
    }

    pub fn uniform(axes: [Axis; 3], density: f64, temperature: f64) -> FusionResult<Self> {
        let len = axes[0].n * axes[1].n * axes[2].n;
        Self::new(axes, vec![density; len], vec![temperature; len])
    }

    /// Evaluate ρ at every bin center and read density and temperature of
    /// `species` from the profile.
    pub fn from_profile<F, P>(
        axes: [Axis; 3],
        field: &F,
        profile: &P,
        species: usize,
        time: f64,
    ) -> FusionResult<Self>
    where
        F: MagneticField + ?Sized,
        P: PlasmaProfile + ?Sized,
    {
        let [ra, pa, za] = axes;
        let mut density = Vec::with_capacity(ra.n * pa.n * za.n);
        let mut temperature = Vec::with_capacity(density.capacity());
        for ir in 0..ra.n {
            for iphi in 0..pa.n {
                for iz in 0..za.n {
                    let rho = field.rho(ra.center(ir), pa.center(iphi), za.center(iz), time)?;
                    density.push(profile.density(rho, species)?);
                    temperature.push(profile.temperature(rho, species)?);
                }
            }
        }
        Self::new(axes, density, temperature)
    }

    pub fn axes(&self) -> &[Axis; 3] {
        &self.axes
    }

    fn index(&self, ir: usize, iphi: usize, iz: usize) -> usize {
        ir * (self.axes[1].n * self.axes[2].n) + iphi * self.axes[2].n + iz
    }

    pub fn density(&self, ir: usize, iphi: usize, iz: usize) -> f64 {
        self.density[self.index(ir, iphi, iz)]
    }

    pub fn temperature(&self, ir: usize, iphi: usize, iz: usize) -> f64 {
        self.temperature[self.index(ir, iphi, iz)]
    }
}

/// A reactant population: either a simulated histogram or a thermal plasma.
#[derive(Debug, Clone)]
pub enum MomentumSource {
    Histogram(HistogramGrid),
    Thermal(ThermalDistribution),
}

impl MomentumSource {
    /// Wrap a histogram; it must be a lab 5D grid.
    pub fn histogram(grid: HistogramGrid) -> FusionResult<Self> {
        if grid.layout() != GridLayout::Lab5D {
            return Err(FusionError::ConfigError(format!(
                "momentum sampling needs a lab5d histogram, got {:?}",
                grid.layout()
            )));
        }
        Ok(MomentumSource::Histogram(grid))
    }

    /// `(r, φ, z)` axes.
    pub fn spatial_axes(&self) -> [Axis; 3] {
        match self {
            MomentumSource::Histogram(grid) => {
                let a = grid.axes();
                [a[0], a[1], a[2]]
            }
            MomentumSource::Thermal(t) => t.axes,
        }
    }

    /// Shell volume `2π·r_c·Δr·Δz` of a spatial bin.
    pub fn shell_volume(&self, ir: usize, iz: usize) -> f64 {
        let [r, _, z] = self.spatial_axes();
        TWO_PI * r.center(ir) * r.width() * z.width()
    }

    /// Particle density (m⁻³) of a spatial bin.
    pub fn density(&self, ir: usize, iphi: usize, iz: usize) -> FusionResult<f64> {
        match self {
            MomentumSource::Histogram(grid) => grid.spatial_density(ir, iphi, iz),
            MomentumSource::Thermal(t) => Ok(t.density(ir, iphi, iz)),
        }
    }

    /// Draw `n` `(p∥, p⊥)` pairs at a spatial bin. `mass` is used by the
    /// thermal variant only.
    pub fn draw_momentum<R: Rng + ?Sized>(
        &self,
        ir: usize,
        iphi: usize,
        iz: usize,
        mass: f64,
        n: usize,
        rng: &mut R,
    ) -> FusionResult<(Vec<f64>, Vec<f64>)> {
        match self {
            MomentumSource::Histogram(grid) => sample_histogram(grid, ir, iphi, iz, n, rng),
            MomentumSource::Thermal(t) => {
                Ok(sample_thermal(t.temperature(ir, iphi, iz), mass, n, rng))
            }
        }
    }
}
