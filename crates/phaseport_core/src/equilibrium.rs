//! Equilibria of the continuous systems and their stability labels.
//!
//! The normal forms (saddle-node, pitchfork, Hopf) use closed-form tables
//! with exact comparisons against μ = 0. Lorenz and the double pendulum
//! place their equilibria analytically and label them from the eigenvalues
//! of a finite-difference Jacobian.

use crate::error::{Result, SimulationError};
use crate::fields::{FlowSystem, VectorField};
use crate::params::ParameterSet;
use nalgebra::Complex;
use serde::Serialize;
use std::cmp::Ordering;
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StabilityLabel {
    StableNode,
    Saddle,
    UnstableNode,
    SaddleNode,
    StableFocus,
    UnstableFocus,
    Center,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquilibriumPoint {
    pub state: Vec<f64>,
    pub label: StabilityLabel,
    /// Radius of the limit cycle born around this point, if any.
    pub cycle_radius: Option<f64>,
}

impl EquilibriumPoint {
    fn new(state: Vec<f64>, label: StabilityLabel) -> Self {
        Self {
            state,
            label,
            cycle_radius: None,
        }
    }
}

/// Equilibria of `field` under `params`, sorted by ascending coordinates.
pub fn classify(field: VectorField, params: &ParameterSet) -> Result<Vec<EquilibriumPoint>> {
    let system = field.bind(params)?;
    let p = system.params();
    let mut points = match field {
        VectorField::SaddleNode => saddle_node(p[0], p[1]),
        VectorField::Pitchfork => pitchfork(p[0]),
        VectorField::Hopf => vec![hopf(p[0])],
        VectorField::Lorenz => {
            let (beta, rho) = (p[2], p[1]);
            let mut states = vec![vec![0.0, 0.0, 0.0]];
            if rho > 1.0 {
                let r = (beta * (rho - 1.0)).sqrt();
                states.push(vec![r, r, rho - 1.0]);
                states.push(vec![-r, -r, rho - 1.0]);
            }
            label_all(&system, states)?
        }
        VectorField::DoublePendulum => {
            let mut states = Vec::with_capacity(4);
            for theta1 in [0.0, PI] {
                for theta2 in [0.0, PI] {
                    states.push(vec![theta1, 0.0, theta2, 0.0]);
                }
            }
            label_all(&system, states)?
        }
    };
    points.sort_by(|a, b| lexicographic(&a.state, &b.state));
    Ok(points)
}

fn lexicographic(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn saddle_node(mu: f64, y_sign: f64) -> Vec<EquilibriumPoint> {
    if mu > 0.0 {
        return Vec::new();
    }
    if mu == 0.0 {
        return vec![EquilibriumPoint::new(vec![0.0, 0.0], StabilityLabel::SaddleNode)];
    }
    let x = (-mu).sqrt();
    // With an expanding y direction the left branch becomes the saddle.
    let (left, right) = if y_sign > 0.0 {
        (StabilityLabel::Saddle, StabilityLabel::UnstableNode)
    } else {
        (StabilityLabel::StableNode, StabilityLabel::Saddle)
    };
    vec![
        EquilibriumPoint::new(vec![-x, 0.0], left),
        EquilibriumPoint::new(vec![x, 0.0], right),
    ]
}

fn pitchfork(mu: f64) -> Vec<EquilibriumPoint> {
    if mu <= 0.0 {
        return vec![EquilibriumPoint::new(vec![0.0, 0.0], StabilityLabel::StableNode)];
    }
    let x = mu.sqrt();
    vec![
        EquilibriumPoint::new(vec![-x, 0.0], StabilityLabel::StableNode),
        EquilibriumPoint::new(vec![0.0, 0.0], StabilityLabel::Saddle),
        EquilibriumPoint::new(vec![x, 0.0], StabilityLabel::StableNode),
    ]
}

fn hopf(mu: f64) -> EquilibriumPoint {
    let origin = vec![0.0, 0.0, 0.0];
    if mu < 0.0 {
        EquilibriumPoint::new(origin, StabilityLabel::StableFocus)
    } else if mu == 0.0 {
        EquilibriumPoint::new(origin, StabilityLabel::Center)
    } else {
        EquilibriumPoint {
            state: origin,
            label: StabilityLabel::UnstableFocus,
            cycle_radius: Some(mu.sqrt()),
        }
    }
}

fn label_all(system: &FlowSystem, states: Vec<Vec<f64>>) -> Result<Vec<EquilibriumPoint>> {
    states
        .into_iter()
        .map(|state| {
            let label = linear_stability(system, &state)?;
            Ok(EquilibriumPoint::new(state, label))
        })
        .collect()
}

/// Labels `state` from the eigenvalues of the Jacobian there.
pub fn linear_stability(system: &FlowSystem, state: &[f64]) -> Result<StabilityLabel> {
    let dim = system.field().dimension();
    if state.len() != dim {
        return Err(SimulationError::DimensionMismatch {
            expected: dim,
            found: state.len(),
        });
    }
    let jacobian = system.jacobian(state);
    if jacobian.iter().any(|v| !v.is_finite()) {
        return Err(SimulationError::invalid(
            "jacobian is not finite at the requested state",
        ));
    }
    let eigenvalues: Vec<Complex<f64>> = jacobian.complex_eigenvalues().iter().copied().collect();
    Ok(label_from_eigenvalues(&eigenvalues))
}

pub fn label_from_eigenvalues(eigenvalues: &[Complex<f64>]) -> StabilityLabel {
    let scale = eigenvalues.iter().map(|l| l.norm()).fold(1.0, f64::max);
    let tol = 1e-7 * scale;

    let negative = eigenvalues.iter().filter(|l| l.re < -tol).count();
    let positive = eigenvalues.iter().filter(|l| l.re > tol).count();
    let oscillatory = eigenvalues.iter().any(|l| l.im.abs() > tol);
    let marginal: Vec<&Complex<f64>> = eigenvalues.iter().filter(|l| l.re.abs() <= tol).collect();

    if negative > 0 && positive > 0 {
        return StabilityLabel::Saddle;
    }
    if marginal.is_empty() {
        return match (positive, oscillatory) {
            (0, true) => StabilityLabel::StableFocus,
            (0, false) => StabilityLabel::StableNode,
            (_, true) => StabilityLabel::UnstableFocus,
            (_, false) => StabilityLabel::UnstableNode,
        };
    }
    if positive == 0 && marginal.iter().all(|l| l.im.abs() > tol) {
        return StabilityLabel::Center;
    }
    StabilityLabel::SaddleNode
}
