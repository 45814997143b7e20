use crate::controller::AnimationSettings;
use crate::error::{Result, SimulationError};
use crate::fields::{pendulum_state_from_degrees, VectorField};
use crate::integrator::IntegratorSettings;
use crate::maps::MapFunction;
use crate::params::{ParamSpec, ParameterSet};
use crate::state::{AxisRange, GridSpec, InitialConditions};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

/// Every explorer is either a flow or a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "system", rename_all = "snake_case")]
pub enum SystemKind {
    Flow(VectorField),
    Map(MapFunction),
}

impl SystemKind {
    pub fn all() -> impl Iterator<Item = SystemKind> {
        VectorField::ALL
            .into_iter()
            .map(SystemKind::Flow)
            .chain(MapFunction::ALL.into_iter().map(SystemKind::Map))
    }

    pub fn name(self) -> &'static str {
        match self {
            SystemKind::Flow(field) => field.name(),
            SystemKind::Map(map) => map.name(),
        }
    }

    pub fn dimension(self) -> usize {
        match self {
            SystemKind::Flow(field) => field.dimension(),
            SystemKind::Map(map) => map.dimension(),
        }
    }

    pub fn parameter_specs(self) -> &'static [ParamSpec] {
        match self {
            SystemKind::Flow(field) => field.parameter_specs(),
            SystemKind::Map(map) => map.parameter_specs(),
        }
    }

    pub fn default_parameters(self) -> ParameterSet {
        ParameterSet::defaults(self.parameter_specs())
    }

    /// Starting states of the stock explorer for this system.
    pub fn default_initial_conditions(self) -> InitialConditions {
        use InitialConditions::{Grid, List};
        match self {
            SystemKind::Flow(VectorField::SaddleNode) => List {
                states: vec![vec![0.0, 0.0], vec![0.2, 0.2]],
            },
            SystemKind::Flow(VectorField::Pitchfork) => List {
                states: vec![
                    vec![-1.0, 0.5],
                    vec![-0.2, -0.5],
                    vec![0.2, 0.5],
                    vec![1.0, -0.5],
                ],
            },
            SystemKind::Flow(VectorField::Hopf) => List {
                states: vec![
                    vec![0.5, 0.0, 0.5],
                    vec![1.0, 0.0, 1.0],
                    vec![0.0, 0.5, 0.0],
                    vec![0.0, 1.0, 1.0],
                ],
            },
            SystemKind::Flow(VectorField::Lorenz) => List {
                states: vec![vec![1.0, 1.0, 1.0]],
            },
            SystemKind::Flow(VectorField::DoublePendulum) => List {
                states: vec![
                    pendulum_state_from_degrees(90.0, 90.0).to_vec(),
                    pendulum_state_from_degrees(90.0, 91.0).to_vec(),
                ],
            },
            SystemKind::Map(MapFunction::Ikeda) => Grid {
                grid: GridSpec::centered([0.0, 0.0], 2.0, 2.0, 250),
            },
            SystemKind::Map(MapFunction::IkedaQuadraticPhase) => Grid {
                grid: GridSpec::centered([0.0, 0.0], 4.0, 4.0, 20),
            },
            SystemKind::Map(MapFunction::Henon) => Grid {
                grid: GridSpec::centered([0.0, 0.0], 1.0, 1.0, 50),
            },
            SystemKind::Map(MapFunction::Zaslavsky) => Grid {
                grid: GridSpec::new(AxisRange::new(0.0, TAU, 50), AxisRange::new(-5.0, 15.0, 50)),
            },
            SystemKind::Map(MapFunction::CorrugatedMirror) => Grid {
                grid: GridSpec::centered([PI, PI], TAU, TAU, 20),
            },
        }
    }

    pub fn default_animation(self) -> AnimationSettings {
        let (iteration_limit, frame_delay_ms, dt) = match self {
            SystemKind::Flow(VectorField::SaddleNode | VectorField::Pitchfork) => (1000, 20, 0.01),
            SystemKind::Flow(VectorField::Hopf) => (1000, 20, 0.02),
            SystemKind::Flow(VectorField::Lorenz) => (4000, 10, 0.01),
            SystemKind::Flow(VectorField::DoublePendulum) => (1500, 20, 0.02),
            SystemKind::Map(MapFunction::Ikeda | MapFunction::Zaslavsky) => (1000, 50, 1.0),
            SystemKind::Map(MapFunction::IkedaQuadraticPhase | MapFunction::CorrugatedMirror) => {
                (50, 50, 1.0)
            }
            SystemKind::Map(MapFunction::Henon) => (1000, 250, 1.0),
        };
        AnimationSettings {
            iteration_limit,
            frame_delay_ms,
            dt,
            integrator: IntegratorSettings::default(),
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SystemKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        SystemKind::all()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| SimulationError::invalid(format!("unknown system `{s}`")))
    }
}
