// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Backward Monte Carlo Marker Generation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Importance-sampled marker generation over a lab 5D mesh.
//!
//! Markers carry `inverse_weight`, the reciprocal of how often their bin
//! was sampled, so that summing `inverse_weight` over the markers of one
//! bin gives exactly one.

use crate::importance::{marker_coordinates, PHASE_AXES};
use fusion_dist::grid::load_flat_f64;
use fusion_dist::HistogramGrid;
use fusion_types::axis::GridLayout;
use fusion_types::config::{BmcConfig, BmcStrategy};
use fusion_types::error::{FusionError, FusionResult};
use fusion_types::fields::{MagneticField, PlasmaProfile, WallGeometry};
use fusion_types::state::{Marker, MarkerState};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CHAIN_STEPS: [i64; 4] = [-2, -1, 1, 2];

/// Ceil-rounded marker counts per bin, proportional to `importance`.
///
/// The total is at least `n_total`; each bin count exceeds its exact share
/// by less than one.
pub fn allocate(importance: &[f64], n_total: usize) -> FusionResult<Vec<usize>> {
    let sum: f64 = importance.iter().filter(|h| **h > 0.0).sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(FusionError::DegenerateDistribution(format!(
            "importance sums to {sum}; no bin can be sampled"
        )));
    }
    Ok(importance
        .iter()
        .map(|&h| {
            if h > 0.0 {
                (h / sum * n_total as f64).ceil() as usize
            } else {
                0
            }
        })
        .collect())
}

/// Marker generator over a lab 5D mesh with one time and one charge bin.
pub struct ImportanceSampler<'a> {
    pub(crate) grid: &'a HistogramGrid,
    pub(crate) field: &'a dyn MagneticField,
    pub(crate) wall: &'a dyn WallGeometry,
    pub(crate) profile: Option<&'a dyn PlasmaProfile>,
    pub(crate) config: BmcConfig,
}

impl<'a> ImportanceSampler<'a> {
    pub fn new(
        grid: &'a HistogramGrid,
        field: &'a dyn MagneticField,
        wall: &'a dyn WallGeometry,
        config: BmcConfig,
    ) -> FusionResult<Self> {
        config.validate()?;
        if grid.layout() != GridLayout::Lab5D {
            return Err(FusionError::ConfigError(format!(
                "marker generation needs a lab 5D mesh, got {:?}",
                grid.layout()
            )));
        }
        let axes = grid.axes();
        if axes[5].n != 1 || axes[6].n != 1 {
            return Err(FusionError::ConfigError(format!(
                "marker generation needs one time and one charge bin, got {} and {}",
                axes[5].n, axes[6].n
            )));
        }
        Ok(ImportanceSampler {
            grid,
            field,
            wall,
            profile: None,
            config,
        })
    }

    pub fn with_profile(mut self, profile: &'a dyn PlasmaProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn config(&self) -> &BmcConfig {
        &self.config
    }

    pub fn grid(&self) -> &HistogramGrid {
        self.grid
    }

    /// Runs the configured strategy. `input` is the existing marker
    /// population used for particle-based importance and for source
    /// replication; other strategies may pass an empty slice.
    pub fn generate(&self, input: &[MarkerState]) -> FusionResult<Vec<Marker>> {
        let axes = self.grid.axes();
        info!(
            "bmc {:?}: {} markers requested on mesh r[{}] phi[{}] z[{}] ppara[{}] pperp[{}]",
            self.config.strategy,
            self.config.n_total,
            axes[0].n,
            axes[1].n,
            axes[2].n,
            axes[3].n,
            axes[4].n
        );
        let markers = match self.config.strategy {
            BmcStrategy::Direct => {
                let importance = self.importance_field(input)?;
                self.direct(&importance)?
            }
            BmcStrategy::MarkovChain => {
                let importance = self.importance_field(input)?;
                self.markov_chain(&importance)?
            }
            BmcStrategy::FullMesh => self.full_mesh()?,
            BmcStrategy::SourceReplication => self.replicate_source(input)?,
        };
        info!("bmc generated {} markers", markers.len());
        Ok(markers)
    }

    /// Bin-by-bin allocation: each bin gets `ceil(h/Σh · n_total)` markers
    /// at its center.
    pub fn direct(&self, importance: &[f64]) -> FusionResult<Vec<Marker>> {
        self.check_len(importance)?;
        let counts = allocate(importance, self.config.n_total)?;
        let planned: usize = counts.iter().sum();
        info!(
            "direct allocation: {planned} markers over {} bins",
            counts.iter().filter(|&&c| c > 0).count()
        );

        let mut markers = Vec::with_capacity(planned);
        for (flat, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let point = self.bin_centers(&self.mesh_index(flat));
            if !self.wall.inside(point[0], point[2]) {
                continue;
            }
            let Some(state) = self.mesh_marker(&point, 0) else {
                continue;
            };
            let inverse_weight = 1.0 / count as f64;
            for _ in 0..count {
                let mut state = state;
                state.id = markers.len() as u64;
                markers.push(Marker {
                    state,
                    inverse_weight,
                    bin: flat,
                });
            }
        }
        Ok(markers)
    }

    /// Metropolis random walk over bin indices with exactly `n_total`
    /// emitted states.
    ///
    /// Each proposal moves one axis by ±1 or ±2 bins, cycling through the
    /// axes that have more than one bin. A proposal off the mesh, outside
    /// the wall or where no marker can be built is a rejected move, as is a
    /// failed Metropolis test; either way the current state is emitted
    /// again. The walk starts at the mesh center, or at the most important
    /// bin when the center has zero importance.
    pub fn markov_chain(&self, importance: &[f64]) -> FusionResult<Vec<Marker>> {
        self.check_len(importance)?;
        let cfg = &self.config;
        let shape = self.mesh_shape();

        let (argmax, max) = importance
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, h)| if h > best.1 { (i, h) } else { best });
        if max <= 0.0 {
            return Err(FusionError::DegenerateDistribution(
                "markov chain has no bin with positive importance".to_string(),
            ));
        }
        let center: [usize; PHASE_AXES] = std::array::from_fn(|k| shape[k] / 2);
        let mut current = if importance[self.mesh_flat(&center)] > 0.0 {
            center
        } else {
            self.mesh_index(argmax)
        };
        let mut current_flat = self.mesh_flat(&current);
        let mut current_state = self.mesh_marker(&self.bin_centers(&current), 0);
        let movable: Vec<usize> = (0..PHASE_AXES).filter(|&k| shape[k] > 1).collect();

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let budget = cfg.n_total.saturating_mul(cfg.max_proposals_factor);
        let mut visits = vec![0usize; importance.len()];
        let mut chain: Vec<(MarkerState, usize)> = Vec::with_capacity(cfg.n_total);
        let mut proposals = 0usize;

        while chain.len() < cfg.n_total {
            if proposals >= budget {
                return Err(FusionError::DegenerateDistribution(format!(
                    "markov chain spent {budget} proposals and emitted {} of {} markers",
                    chain.len(),
                    cfg.n_total
                )));
            }
            proposals += 1;

            if !movable.is_empty() {
                let dim = movable[proposals % movable.len()];
                let step = CHAIN_STEPS[rng.gen_range(0..CHAIN_STEPS.len())];
                let moved = current[dim] as i64 + step;
                if moved >= 0 && moved < shape[dim] as i64 {
                    let mut proposal = current;
                    proposal[dim] = moved as usize;
                    let proposal_flat = self.mesh_flat(&proposal);
                    let ratio = importance[proposal_flat] / importance[current_flat];
                    if ratio > rng.gen::<f64>() {
                        let centers = self.bin_centers(&proposal);
                        if self.wall.inside(centers[0], centers[2]) {
                            if let Some(state) = self.mesh_marker(&centers, 0) {
                                current = proposal;
                                current_flat = proposal_flat;
                                current_state = Some(state);
                            }
                        }
                    }
                }
            }

            if let Some(mut state) = current_state {
                state.id = chain.len() as u64;
                visits[current_flat] += 1;
                chain.push((state, current_flat));
            }
        }

        debug!(
            "markov chain: {proposals} proposals, {} distinct bins",
            visits.iter().filter(|&&v| v > 0).count()
        );
        Ok(chain
            .into_iter()
            .map(|(state, bin)| Marker {
                state,
                inverse_weight: 1.0 / visits[bin] as f64,
                bin,
            })
            .collect())
    }

    /// `n_per_vertex` markers at every mesh vertex inside the wall, sharded
    /// across ranks. The last rank takes the remainder.
    pub fn full_mesh(&self) -> FusionResult<Vec<Marker>> {
        let cfg = &self.config;
        let axes = self.grid.axes();
        let mut vertices: Vec<(MarkerState, usize)> = Vec::new();
        for flat in 0..self.grid.len() {
            let idx = self.mesh_index(flat);
            let point: [f64; PHASE_AXES] = std::array::from_fn(|k| axes[k].vertex(idx[k]));
            if !self.wall.inside(point[0], point[2]) {
                continue;
            }
            if let Some(state) = self.mesh_marker(&point, 0) {
                vertices.push((state, flat));
            }
        }

        let n_mesh = vertices.len() * cfg.n_per_vertex;
        let share = n_mesh / cfg.n_ranks;
        let start = cfg.rank * share;
        let count = if cfg.rank + 1 == cfg.n_ranks {
            n_mesh - start
        } else {
            share
        };
        info!(
            "full mesh: {} vertices inside wall, {n_mesh} markers, rank {} of {} takes {count} from {start}",
            vertices.len(),
            cfg.rank,
            cfg.n_ranks
        );

        let inverse_weight = 1.0 / cfg.n_per_vertex as f64;
        Ok((start..start + count)
            .map(|global| {
                let (mut state, bin) = vertices[global / cfg.n_per_vertex];
                state.id = global as u64;
                Marker {
                    state,
                    inverse_weight,
                    bin,
                }
            })
            .collect())
    }

    /// Copies each input marker `ceil(w/Σw · n_total)` times, splitting its
    /// weight evenly among the copies. `w` is the interpolated probability
    /// at the marker, or 1 without a probability file.
    pub fn replicate_source(&self, input: &[MarkerState]) -> FusionResult<Vec<Marker>> {
        let cfg = &self.config;
        let probability = if cfg.from_probability {
            Some(load_flat_f64(&cfg.probability_path, self.grid.len())?)
        } else {
            None
        };

        let mut located: Vec<(usize, f64)> = Vec::with_capacity(input.len());
        for m in input {
            let coords = marker_coordinates(m);
            let importance = match (self.locate(&coords), &probability) {
                (None, _) => None,
                (Some(bin), None) => Some((bin, 1.0)),
                (Some(bin), Some(p)) => self
                    .stencil(&coords)
                    .map(|stencil| (bin, self.interpolate(p, &stencil))),
            };
            match importance {
                Some(entry) => located.push(entry),
                None => {
                    warn!(
                        "input marker {} outside mesh: r {:e} phi {:e} z {:e} ppar {:e}",
                        m.id, m.r, m.phi, m.z, m.ppar
                    );
                    located.push((0, 0.0));
                }
            }
        }

        let weights: Vec<f64> = located.iter().map(|&(_, w)| w).collect();
        let counts = allocate(&weights, cfg.n_total)?;
        let mut markers = Vec::with_capacity(counts.iter().sum());
        for ((m, &(bin, _)), &copies) in input.iter().zip(&located).zip(&counts) {
            if copies == 0 {
                continue;
            }
            let inverse_weight = 1.0 / copies as f64;
            for _ in 0..copies {
                let mut state = *m;
                state.weight = m.weight * inverse_weight;
                state.id = markers.len() as u64;
                markers.push(Marker {
                    state,
                    inverse_weight,
                    bin,
                });
            }
        }
        info!(
            "source replication: {} input markers, {} copies",
            input.len(),
            markers.len()
        );
        Ok(markers)
    }

    fn check_len(&self, importance: &[f64]) -> FusionResult<()> {
        if importance.len() != self.grid.len() {
            return Err(FusionError::ShapeMismatch {
                expected: self.grid.len(),
                got: importance.len(),
            });
        }
        Ok(())
    }
}
