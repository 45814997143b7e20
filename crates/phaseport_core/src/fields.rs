//! Continuous-time systems: normal forms, Lorenz and the double pendulum.

use crate::error::Result;
use crate::params::{ParamSpec, ParameterSet};
use crate::traits::DynamicalSystem;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

const SADDLE_NODE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("mu", "μ", -1.0, 1.0, 0.0),
    ParamSpec::new("y_sign", "sign(y)", -1.0, 1.0, -1.0),
];

const PITCHFORK_PARAMS: &[ParamSpec] = &[ParamSpec::new("mu", "μ", -1.0, 1.0, 0.0)];

const HOPF_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("mu", "μ", -1.0, 1.0, 0.0),
    ParamSpec::new("omega", "ω", 0.1, 5.0, 1.0),
    ParamSpec::new("lambda_z", "λ_z", 0.1, 5.0, 1.0),
];

const LORENZ_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("sigma", "σ", 0.1, 50.0, 10.0),
    ParamSpec::new("rho", "ρ", 0.1, 50.0, 28.0),
    ParamSpec::new("beta", "β", 0.1, 10.0, 1.0),
];

const PENDULUM_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("l1", "L₁", 0.1, 3.0, 1.0),
    ParamSpec::new("l2", "L₂", 0.1, 3.0, 1.0),
    ParamSpec::new("m1", "m₁", 0.1, 10.0, 2.0),
    ParamSpec::new("m2", "m₂", 0.1, 10.0, 1.0),
    ParamSpec::new("g", "g", 0.0, 20.0, 9.81),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorField {
    /// dx = μ + x², dy = sign·y
    SaddleNode,
    /// dx = μx − x³, dy = −y
    Pitchfork,
    /// Planar Hopf normal form with a decaying z axis.
    Hopf,
    Lorenz,
    /// State (θ1, ω1, θ2, ω2).
    DoublePendulum,
}

impl VectorField {
    pub const ALL: [VectorField; 5] = [
        VectorField::SaddleNode,
        VectorField::Pitchfork,
        VectorField::Hopf,
        VectorField::Lorenz,
        VectorField::DoublePendulum,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VectorField::SaddleNode => "saddle_node",
            VectorField::Pitchfork => "pitchfork",
            VectorField::Hopf => "hopf",
            VectorField::Lorenz => "lorenz",
            VectorField::DoublePendulum => "double_pendulum",
        }
    }

    pub fn dimension(self) -> usize {
        match self {
            VectorField::SaddleNode | VectorField::Pitchfork => 2,
            VectorField::Hopf | VectorField::Lorenz => 3,
            VectorField::DoublePendulum => 4,
        }
    }

    pub fn parameter_specs(self) -> &'static [ParamSpec] {
        match self {
            VectorField::SaddleNode => SADDLE_NODE_PARAMS,
            VectorField::Pitchfork => PITCHFORK_PARAMS,
            VectorField::Hopf => HOPF_PARAMS,
            VectorField::Lorenz => LORENZ_PARAMS,
            VectorField::DoublePendulum => PENDULUM_PARAMS,
        }
    }

    /// Writes dx/dt into `out`. `p` holds values in declaration order.
    pub fn evaluate(self, x: &[f64], p: &[f64], out: &mut [f64]) {
        match self {
            VectorField::SaddleNode => {
                out[0] = p[0] + x[0] * x[0];
                out[1] = p[1] * x[1];
            }
            VectorField::Pitchfork => {
                out[0] = p[0] * x[0] - x[0] * x[0] * x[0];
                out[1] = -x[1];
            }
            VectorField::Hopf => {
                let (mu, omega, lambda_z) = (p[0], p[1], p[2]);
                let r2 = x[0] * x[0] + x[1] * x[1];
                out[0] = (mu - r2) * x[0] - omega * x[1];
                out[1] = omega * x[0] + (mu - r2) * x[1];
                out[2] = -lambda_z * x[2];
            }
            VectorField::Lorenz => {
                let (sigma, rho, beta) = (p[0], p[1], p[2]);
                out[0] = sigma * (x[1] - x[0]);
                out[1] = x[0] * (rho - x[2]) - x[1];
                out[2] = x[0] * x[1] - beta * x[2];
            }
            VectorField::DoublePendulum => pendulum_rhs(x, &PendulumParams::from_slice(p), out),
        }
    }

    /// Binds the field to one parameter snapshot.
    pub fn bind(self, params: &ParameterSet) -> Result<FlowSystem> {
        Ok(FlowSystem {
            field: self,
            params: params.values_for(self.parameter_specs())?,
        })
    }
}

/// A vector field with frozen parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSystem {
    field: VectorField,
    params: Vec<f64>,
}

impl FlowSystem {
    pub fn field(&self) -> VectorField {
        self.field
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Jacobian of the field at `state` by central differences.
    pub fn jacobian(&self, state: &[f64]) -> DMatrix<f64> {
        let dim = self.field.dimension();
        let mut jac = DMatrix::zeros(dim, dim);
        let mut probe = state.to_vec();
        let mut forward = vec![0.0; dim];
        let mut backward = vec![0.0; dim];

        for col in 0..dim {
            let h = 1e-6 * state[col].abs().max(1.0);
            probe[col] = state[col] + h;
            self.field.evaluate(&probe, &self.params, &mut forward);
            probe[col] = state[col] - h;
            self.field.evaluate(&probe, &self.params, &mut backward);
            probe[col] = state[col];

            for row in 0..dim {
                jac[(row, col)] = (forward[row] - backward[row]) / (2.0 * h);
            }
        }
        jac
    }
}

impl DynamicalSystem<f64> for FlowSystem {
    fn dimension(&self) -> usize {
        self.field.dimension()
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        self.field.evaluate(x, &self.params, out);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendulumParams {
    pub l1: f64,
    pub l2: f64,
    pub m1: f64,
    pub m2: f64,
    pub g: f64,
}

impl PendulumParams {
    fn from_slice(p: &[f64]) -> Self {
        Self {
            l1: p[0],
            l2: p[1],
            m1: p[2],
            m2: p[3],
            g: p[4],
        }
    }

    pub fn from_set(params: &ParameterSet) -> Result<Self> {
        Ok(Self::from_slice(&params.values_for(PENDULUM_PARAMS)?))
    }
}

fn pendulum_rhs(x: &[f64], p: &PendulumParams, out: &mut [f64]) {
    let (theta1, omega1, theta2, omega2) = (x[0], x[1], x[2], x[3]);
    let total = p.m1 + p.m2;
    let delta = theta2 - theta1;
    let (sin_d, cos_d) = delta.sin_cos();
    let den = total - p.m2 * cos_d * cos_d;

    out[0] = omega1;
    out[1] = (p.m2 * p.l1 * omega1 * omega1 * sin_d * cos_d
        + p.m2 * p.g * theta2.sin() * cos_d
        + p.m2 * p.l2 * omega2 * omega2 * sin_d
        - total * p.g * theta1.sin())
        / (p.l1 * den);
    out[2] = omega2;
    out[3] = (-p.m2 * p.l2 * omega2 * omega2 * sin_d * cos_d
        + total
            * (p.g * theta1.sin() * cos_d - p.l1 * omega1 * omega1 * sin_d - p.g * theta2.sin()))
        / (p.l2 * den);
}

/// Pendulum state at rest from angles in degrees, measured from the downward vertical.
pub fn pendulum_state_from_degrees(theta1: f64, theta2: f64) -> [f64; 4] {
    [theta1.to_radians(), 0.0, theta2.to_radians(), 0.0]
}

/// Cartesian positions of both bobs, pivot at the origin and y pointing up.
pub fn pendulum_bobs(state: &[f64], p: &PendulumParams) -> [[f64; 2]; 2] {
    let (s1, c1) = state[0].sin_cos();
    let (s2, c2) = state[2].sin_cos();
    let first = [p.l1 * s1, -p.l1 * c1];
    let second = [first[0] + p.l2 * s2, first[1] - p.l2 * c2];
    [first, second]
}

/// Total mechanical energy, zero potential at the pivot height.
pub fn pendulum_energy(state: &[f64], p: &PendulumParams) -> f64 {
    let (theta1, omega1, theta2, omega2) = (state[0], state[1], state[2], state[3]);
    let total = p.m1 + p.m2;
    let kinetic = 0.5 * total * p.l1 * p.l1 * omega1 * omega1
        + 0.5 * p.m2 * p.l2 * p.l2 * omega2 * omega2
        + p.m2 * p.l1 * p.l2 * omega1 * omega2 * (theta1 - theta2).cos();
    let potential = -total * p.g * p.l1 * theta1.cos() - p.m2 * p.g * p.l2 * theta2.cos();
    kinetic + potential
}
