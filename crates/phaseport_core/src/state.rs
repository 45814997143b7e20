//! State containers: point clouds, trajectories and initial-condition rules.

use crate::error::{Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::slice::{ChunksExact, ChunksExactMut};

/// Batch of independent states of one dimension, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateCloud {
    dim: usize,
    coords: Vec<f64>,
}

impl StateCloud {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            coords: Vec::new(),
        }
    }

    pub fn from_states<I, S>(dim: usize, states: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[f64]>,
    {
        let mut cloud = Self::new(dim);
        for state in states {
            cloud.push(state.as_ref())?;
        }
        Ok(cloud)
    }

    pub fn from_grid(grid: &GridSpec) -> Result<Self> {
        grid.check()?;
        let xs = grid.x.samples();
        let ys = grid.y.samples();
        let mut coords = Vec::with_capacity(xs.len() * ys.len() * 2);
        // Row-major over y, matching a meshgrid ravel.
        for &y in &ys {
            for &x in &xs {
                coords.push(x);
                coords.push(y);
            }
        }
        Ok(Self { dim: 2, coords })
    }

    pub fn push(&mut self, state: &[f64]) -> Result<()> {
        if state.len() != self.dim {
            return Err(SimulationError::DimensionMismatch {
                expected: self.dim,
                found: state.len(),
            });
        }
        self.coords.extend_from_slice(state);
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.coords.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn point(&self, idx: usize) -> &[f64] {
        &self.coords[idx * self.dim..(idx + 1) * self.dim]
    }

    pub fn points(&self) -> ChunksExact<'_, f64> {
        self.coords.chunks_exact(self.dim.max(1))
    }

    pub fn points_mut(&mut self) -> ChunksExactMut<'_, f64> {
        self.coords.chunks_exact_mut(self.dim.max(1))
    }

    /// Flat row-major coordinates, ready for upload to a renderer.
    pub fn as_slice(&self) -> &[f64] {
        &self.coords
    }
}

/// Append-only sequence of timed states from one initial condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    dim: usize,
    times: Vec<f64>,
    coords: Vec<f64>,
}

impl Trajectory {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            times: Vec::new(),
            coords: Vec::new(),
        }
    }

    pub fn with_capacity(dim: usize, samples: usize) -> Self {
        Self {
            dim,
            times: Vec::with_capacity(samples),
            coords: Vec::with_capacity(samples * dim),
        }
    }

    /// A trajectory holding only its initial condition.
    pub fn seeded(t0: f64, state: &[f64]) -> Self {
        let mut trajectory = Self::new(state.len());
        trajectory.times.push(t0);
        trajectory.coords.extend_from_slice(state);
        trajectory
    }

    pub fn push(&mut self, t: f64, state: &[f64]) -> Result<()> {
        if state.len() != self.dim {
            return Err(SimulationError::DimensionMismatch {
                expected: self.dim,
                found: state.len(),
            });
        }
        self.times.push(t);
        self.coords.extend_from_slice(state);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.coords.clear();
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn time(&self, idx: usize) -> f64 {
        self.times[idx]
    }

    pub fn state(&self, idx: usize) -> &[f64] {
        &self.coords[idx * self.dim..(idx + 1) * self.dim]
    }

    pub fn first(&self) -> Option<&[f64]> {
        (!self.is_empty()).then(|| self.state(0))
    }

    pub fn last(&self) -> Option<&[f64]> {
        self.len().checked_sub(1).map(|idx| self.state(idx))
    }

    pub fn states(&self) -> ChunksExact<'_, f64> {
        self.coords.chunks_exact(self.dim.max(1))
    }

    /// The most recent `n` states, oldest first.
    pub fn tail(&self, n: usize) -> ChunksExact<'_, f64> {
        let skip = self.len().saturating_sub(n);
        self.coords[skip * self.dim..].chunks_exact(self.dim.max(1))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.coords
    }
}

/// Uniformly sampled closed interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl AxisRange {
    pub fn new(min: f64, max: f64, samples: usize) -> Self {
        Self { min, max, samples }
    }

    /// Inclusive linspace; a single sample sits at `min`.
    pub fn samples(&self) -> Vec<f64> {
        match self.samples {
            0 => Vec::new(),
            1 => vec![self.min],
            n => {
                let step = (self.max - self.min) / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        if i == n - 1 {
                            self.max
                        } else {
                            self.min + step * i as f64
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Rectangular grid of planar states.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub x: AxisRange,
    pub y: AxisRange,
}

impl GridSpec {
    pub fn new(x: AxisRange, y: AxisRange) -> Self {
        Self { x, y }
    }

    /// `size × size` grid of the given extent around `center`.
    pub fn centered(center: [f64; 2], width: f64, height: f64, size: usize) -> Self {
        Self {
            x: AxisRange::new(center[0] - width / 2.0, center[0] + width / 2.0, size),
            y: AxisRange::new(center[1] - height / 2.0, center[1] + height / 2.0, size),
        }
    }

    pub fn len(&self) -> usize {
        self.x.samples * self.y.samples
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<()> {
        for axis in [&self.x, &self.y] {
            if axis.samples == 0 {
                return Err(SimulationError::invalid("grid axes need at least one sample"));
            }
            if !axis.min.is_finite() || !axis.max.is_finite() {
                return Err(SimulationError::invalid("grid bounds must be finite"));
            }
        }
        Ok(())
    }
}

/// Rule that (re)builds a session's states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InitialConditions {
    Single { state: Vec<f64> },
    Grid { grid: GridSpec },
    List { states: Vec<Vec<f64>> },
}

impl InitialConditions {
    /// Dimension of the states this rule produces.
    pub fn dimension(&self) -> Result<usize> {
        match self {
            InitialConditions::Single { state } => Ok(state.len()),
            InitialConditions::Grid { .. } => Ok(2),
            InitialConditions::List { states } => {
                let first = states
                    .first()
                    .ok_or_else(|| SimulationError::invalid("initial-condition list is empty"))?;
                if let Some(bad) = states.iter().find(|s| s.len() != first.len()) {
                    return Err(SimulationError::DimensionMismatch {
                        expected: first.len(),
                        found: bad.len(),
                    });
                }
                Ok(first.len())
            }
        }
    }

    /// Fails with `DimensionMismatch` unless every produced state has `expected` coordinates.
    pub fn check_dimension(&self, expected: usize) -> Result<()> {
        let found = self.dimension()?;
        if found != expected {
            return Err(SimulationError::DimensionMismatch { expected, found });
        }
        Ok(())
    }

    pub fn to_cloud(&self, dim: usize) -> Result<StateCloud> {
        self.check_dimension(dim)?;
        match self {
            InitialConditions::Single { state } => StateCloud::from_states(dim, [state]),
            InitialConditions::Grid { grid } => StateCloud::from_grid(grid),
            InitialConditions::List { states } => StateCloud::from_states(dim, states),
        }
    }

    pub fn to_trajectories(&self, dim: usize, t0: f64) -> Result<Vec<Trajectory>> {
        let cloud = self.to_cloud(dim)?;
        Ok(cloud.points().map(|s| Trajectory::seeded(t0, s)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_rejects_mixed_dimensions() {
        let result = StateCloud::from_states(2, [vec![0.0, 1.0], vec![1.0, 2.0, 3.0]]);
        assert_eq!(
            result,
            Err(SimulationError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn grid_is_row_major_over_y() {
        let grid = GridSpec::new(AxisRange::new(0.0, 1.0, 3), AxisRange::new(-1.0, 1.0, 2));
        let cloud = StateCloud::from_grid(&grid).unwrap();
        assert_eq!(cloud.len(), 6);
        assert_eq!(cloud.point(0), &[0.0, -1.0]);
        assert_eq!(cloud.point(1), &[0.5, -1.0]);
        assert_eq!(cloud.point(2), &[1.0, -1.0]);
        assert_eq!(cloud.point(3), &[0.0, 1.0]);
        assert_eq!(cloud.point(5), &[1.0, 1.0]);
    }

    #[test]
    fn linspace_hits_both_endpoints_exactly() {
        let axis = AxisRange::new(0.0, std::f64::consts::TAU, 50);
        let samples = axis.samples();
        assert_eq!(samples.len(), 50);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[49], std::f64::consts::TAU);
        assert_eq!(AxisRange::new(2.0, 5.0, 1).samples(), vec![2.0]);
    }

    #[test]
    fn centered_grid_spans_extent() {
        let grid = GridSpec::centered([0.0, 0.0], 4.0, 4.0, 20);
        assert_eq!(grid.len(), 400);
        assert_eq!(grid.x.min, -2.0);
        assert_eq!(grid.y.max, 2.0);
    }

    #[test]
    fn empty_grid_axis_is_rejected() {
        let grid = GridSpec::new(AxisRange::new(0.0, 1.0, 0), AxisRange::new(0.0, 1.0, 4));
        assert!(matches!(
            StateCloud::from_grid(&grid),
            Err(SimulationError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn trajectory_is_append_only_with_tail_view() {
        let mut trajectory = Trajectory::seeded(0.0, &[1.0, 2.0]);
        for step in 1..=5 {
            let v = step as f64;
            trajectory.push(v * 0.1, &[v, -v]).unwrap();
        }
        assert_eq!(trajectory.len(), 6);
        assert_eq!(trajectory.first(), Some(&[1.0, 2.0][..]));
        assert_eq!(trajectory.last(), Some(&[5.0, -5.0][..]));

        let tail: Vec<&[f64]> = trajectory.tail(2).collect();
        assert_eq!(tail, vec![&[4.0, -4.0][..], &[5.0, -5.0][..]]);
        assert_eq!(trajectory.tail(100).count(), 6);

        assert!(trajectory.push(1.0, &[0.0]).is_err());
        trajectory.clear();
        assert!(trajectory.is_empty());
        assert_eq!(trajectory.last(), None);
    }

    #[test]
    fn initial_conditions_check_dimension_before_building() {
        let grid = InitialConditions::Grid {
            grid: GridSpec::centered([0.0, 0.0], 1.0, 1.0, 3),
        };
        assert_eq!(
            grid.to_cloud(3),
            Err(SimulationError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        );

        let ragged = InitialConditions::List {
            states: vec![vec![0.0, 0.0, 0.0], vec![1.0, 1.0]],
        };
        assert!(matches!(
            ragged.to_trajectories(3, 0.0),
            Err(SimulationError::DimensionMismatch { .. })
        ));

        let list = InitialConditions::List {
            states: vec![vec![0.5, 0.0, 0.5], vec![1.0, 0.0, 1.0]],
        };
        let trajectories = list.to_trajectories(3, 0.0).unwrap();
        assert_eq!(trajectories.len(), 2);
        assert_eq!(trajectories[1].first(), Some(&[1.0, 0.0, 1.0][..]));
    }
}
