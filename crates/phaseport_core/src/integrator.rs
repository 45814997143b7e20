use crate::error::{Result, SimulationError};
use crate::solvers::{ExplicitRungeKutta, StepMethod};
use crate::state::Trajectory;
use crate::traits::{first_non_finite, DynamicalSystem, Steppable};
use serde::{Deserialize, Serialize};

/// Most sub-steps a single `integrate` or `advance` call may take.
pub const MAX_SUBSTEPS: f64 = 1e8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegratorSettings {
    pub method: StepMethod,
    /// Upper bound on the internal sub-step.
    pub max_step: f64,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            method: StepMethod::Rk4,
            max_step: 1e-3,
        }
    }
}

impl IntegratorSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.max_step.is_finite() || self.max_step <= 0.0 {
            return Err(SimulationError::invalid("max_step must be positive and finite"));
        }
        Ok(())
    }
}

/// Fixed-step integrator for continuous systems.
///
/// Every reporting interval is split into `ceil(|interval| / max_step)`
/// equal sub-steps, and the state is checked for non-finite values after
/// each of them.
pub struct Integrator {
    settings: IntegratorSettings,
    stepper: ExplicitRungeKutta<f64>,
    dim: usize,
}

impl Integrator {
    pub fn new(settings: IntegratorSettings, dim: usize) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            stepper: settings.method.build(dim),
            dim,
        })
    }

    pub fn settings(&self) -> &IntegratorSettings {
        &self.settings
    }

    fn check_dimension(&self, system: &impl DynamicalSystem<f64>, state: &[f64]) -> Result<()> {
        let expected = system.dimension();
        if expected != self.dim {
            return Err(SimulationError::DimensionMismatch {
                expected: self.dim,
                found: expected,
            });
        }
        if state.len() != expected {
            return Err(SimulationError::DimensionMismatch {
                expected,
                found: state.len(),
            });
        }
        Ok(())
    }

    /// Rejects spans that would need more than `MAX_SUBSTEPS` sub-steps.
    fn check_budget(&self, span: f64, intervals: usize) -> Result<()> {
        // Each reporting interval rounds its own count up.
        let needed = (span.abs() / self.settings.max_step).ceil() + intervals as f64;
        if needed > MAX_SUBSTEPS {
            return Err(SimulationError::invalid(format!(
                "span {} needs about {:.3e} sub-steps of {}, limit is {:e}",
                span, needed, self.settings.max_step, MAX_SUBSTEPS
            )));
        }
        Ok(())
    }

    /// Steps `state` from `t` across `span`, in place.
    fn cover(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: f64,
        state: &mut [f64],
        span: f64,
    ) -> Result<()> {
        if span == 0.0 {
            return Ok(());
        }
        let substeps = (span.abs() / self.settings.max_step).ceil().max(1.0) as usize;
        let h = span / substeps as f64;
        let mut time = t;
        for _ in 0..substeps {
            self.stepper.step(system, &mut time, state, h);
            if let Some(index) = first_non_finite(state) {
                return Err(SimulationError::NumericalDivergence { time, index });
            }
        }
        Ok(())
    }

    /// Samples the solution at `sample_count` uniformly spaced times over
    /// `[t_start, t_end]`. The first sample is `state0` itself.
    pub fn integrate(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        state0: &[f64],
        t_start: f64,
        t_end: f64,
        sample_count: usize,
    ) -> Result<Trajectory> {
        if sample_count < 2 {
            return Err(SimulationError::invalid("sample_count must be at least 2"));
        }
        if !t_start.is_finite() || !t_end.is_finite() {
            return Err(SimulationError::invalid("time span must be finite"));
        }
        self.check_dimension(system, state0)?;
        self.check_budget(t_end - t_start, sample_count - 1)?;

        let mut trajectory = Trajectory::with_capacity(state0.len(), sample_count);
        trajectory.push(t_start, state0)?;

        let intervals = (sample_count - 1) as f64;
        let sample_time = |i: usize| {
            if i == sample_count - 1 {
                t_end
            } else {
                t_start + (t_end - t_start) * i as f64 / intervals
            }
        };

        let mut state = state0.to_vec();
        for i in 1..sample_count {
            let (from, to) = (sample_time(i - 1), sample_time(i));
            self.cover(system, from, &mut state, to - from)?;
            trajectory.push(to, &state)?;
        }
        Ok(trajectory)
    }

    /// Continues from `state` at `t` over one window of length `dt` and
    /// returns only the final state.
    pub fn advance(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        state: &[f64],
        t: f64,
        dt: f64,
    ) -> Result<Vec<f64>> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimulationError::invalid("dt must be positive and finite"));
        }
        self.check_dimension(system, state)?;
        self.check_budget(dt, 1)?;
        let mut next = state.to_vec();
        self.cover(system, t, &mut next, dt)?;
        Ok(next)
    }
}

/// One-shot `integrate` with default settings.
pub fn integrate(
    system: &impl DynamicalSystem<f64>,
    state0: &[f64],
    t_start: f64,
    t_end: f64,
    sample_count: usize,
) -> Result<Trajectory> {
    Integrator::new(IntegratorSettings::default(), system.dimension())?
        .integrate(system, state0, t_start, t_end, sample_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{pendulum_energy, pendulum_state_from_degrees, PendulumParams, VectorField};
    use crate::params::ParameterSet;

    fn assert_err_matches<T: std::fmt::Debug>(
        result: Result<T>,
        pred: impl Fn(&SimulationError) -> bool,
    ) {
        match result {
            Err(err) if pred(&err) => {}
            other => panic!("unexpected result {other:?}"),
        }
    }

    fn system(field: VectorField, overrides: &[(&str, f64)]) -> crate::fields::FlowSystem {
        let mut params = ParameterSet::defaults(field.parameter_specs());
        for &(name, value) in overrides {
            params.set(name, value).unwrap();
        }
        field.bind(&params).unwrap()
    }

    #[test]
    fn samples_lie_on_a_uniform_grid_and_start_at_state0() {
        let lorenz = system(VectorField::Lorenz, &[]);
        let state0 = [1.0, 1.0, 1.0];
        let trajectory = integrate(&lorenz, &state0, 0.0, 1.0, 11).unwrap();
        assert_eq!(trajectory.len(), 11);
        assert_eq!(trajectory.first(), Some(&state0[..]));
        assert_eq!(trajectory.time(0), 0.0);
        assert_eq!(trajectory.time(10), 1.0);
        assert!((trajectory.time(3) - 0.3).abs() < 1e-15);
    }

    #[test]
    fn oversized_spans_are_refused_up_front() {
        let hopf = system(VectorField::Hopf, &[("mu", -0.5)]);
        assert_err_matches(integrate(&hopf, &[0.5, 0.0, 0.5], 0.0, 1e9, 10), |err| {
            matches!(err, SimulationError::InvalidRequest { reason }
                if reason.contains("sub-steps"))
        });

        let mut integrator = Integrator::new(IntegratorSettings::default(), 3).unwrap();
        assert_err_matches(integrator.advance(&hopf, &[0.5, 0.0, 0.5], 0.0, 1e6), |err| {
            matches!(err, SimulationError::InvalidRequest { .. })
        });
        assert!(integrator.advance(&hopf, &[0.5, 0.0, 0.5], 0.0, 1.0).is_ok());
    }

    #[test]
    fn integration_is_deterministic() {
        let hopf = system(VectorField::Hopf, &[("mu", 0.5)]);
        let a = integrate(&hopf, &[0.5, 0.0, 0.5], 0.0, 5.0, 100).unwrap();
        let b = integrate(&hopf, &[0.5, 0.0, 0.5], 0.0, 5.0, 100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hopf_orbit_settles_on_the_limit_cycle() {
        let hopf = system(VectorField::Hopf, &[("mu", 0.25)]);
        let trajectory = integrate(&hopf, &[0.1, 0.0, 1.0], 0.0, 40.0, 50).unwrap();
        let last = trajectory.last().unwrap();
        let radius = (last[0] * last[0] + last[1] * last[1]).sqrt();
        assert!((radius - 0.5).abs() < 1e-4, "radius {radius}");
        assert!(last[2].abs() < 1e-12);
    }

    #[test]
    fn saddle_node_diverges_in_finite_time() {
        // x' = 1 + x² blows up at t = π/2 from the origin.
        let saddle = system(VectorField::SaddleNode, &[("mu", 1.0)]);
        assert_err_matches(integrate(&saddle, &[0.0, 0.0], 0.0, 3.0, 4), |err| {
            matches!(err, SimulationError::NumericalDivergence { time, index: 0 }
                if *time > 1.5 && *time < 1.6)
        });
    }

    #[test]
    fn pendulum_energy_is_conserved() {
        let pendulum = system(VectorField::DoublePendulum, &[]);
        let params = PendulumParams::from_set(&ParameterSet::defaults(
            VectorField::DoublePendulum.parameter_specs(),
        ))
        .unwrap();
        let state0 = pendulum_state_from_degrees(90.0, 91.0);
        let e0 = pendulum_energy(&state0, &params);

        let trajectory = integrate(&pendulum, &state0, 0.0, 5.0, 51).unwrap();
        for state in trajectory.states() {
            let drift = (pendulum_energy(state, &params) - e0).abs();
            assert!(drift < 1e-6, "energy drift {drift}");
        }
    }

    #[test]
    fn advance_matches_integrate_over_the_same_window() {
        let lorenz = system(VectorField::Lorenz, &[]);
        let mut integrator = Integrator::new(IntegratorSettings::default(), 3).unwrap();
        let stepped = integrator.advance(&lorenz, &[1.0, 1.0, 1.0], 0.0, 0.01).unwrap();
        let sampled = integrate(&lorenz, &[1.0, 1.0, 1.0], 0.0, 0.01, 2).unwrap();
        assert_eq!(sampled.last(), Some(&stepped[..]));
    }

    #[test]
    fn tsit5_agrees_with_rk4() {
        let lorenz = system(VectorField::Lorenz, &[]);
        let settings = IntegratorSettings {
            method: StepMethod::Tsit5,
            ..Default::default()
        };
        let mut tsit5 = Integrator::new(settings, 3).unwrap();
        let a = tsit5.advance(&lorenz, &[1.0, 1.0, 1.0], 0.0, 0.5).unwrap();
        let b = Integrator::new(IntegratorSettings::default(), 3)
            .unwrap()
            .advance(&lorenz, &[1.0, 1.0, 1.0], 0.0, 0.5)
            .unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6, "{x} vs {y}");
        }
    }

    #[test]
    fn rejects_malformed_requests() {
        let lorenz = system(VectorField::Lorenz, &[]);
        assert_err_matches(integrate(&lorenz, &[1.0, 1.0, 1.0], 0.0, 1.0, 1), |err| {
            matches!(err, SimulationError::InvalidRequest { .. })
        });
        assert_err_matches(integrate(&lorenz, &[1.0, 1.0], 0.0, 1.0, 10), |err| {
            matches!(err, SimulationError::DimensionMismatch { expected: 3, found: 2 })
        });

        let mut integrator = Integrator::new(IntegratorSettings::default(), 3).unwrap();
        assert_err_matches(integrator.advance(&lorenz, &[1.0, 1.0, 1.0], 0.0, 0.0), |err| {
            matches!(err, SimulationError::InvalidRequest { .. })
        });
        assert_err_matches(integrator.advance(&lorenz, &[1.0, 1.0, 1.0], 0.0, f64::NAN), |err| {
            matches!(err, SimulationError::InvalidRequest { .. })
        });

        let bad = IntegratorSettings {
            max_step: 0.0,
            ..Default::default()
        };
        assert!(Integrator::new(bad, 3).is_err());
    }
}
