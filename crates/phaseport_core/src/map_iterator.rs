use crate::error::{Result, SimulationError};
use crate::maps::MapFunction;
use crate::params::ParameterSet;
use crate::solvers::DiscreteMap;
use crate::state::StateCloud;
use crate::traits::Steppable;
use std::f64::consts::TAU;

/// Reduces an angle into `[0, 2π)`.
pub fn wrap_angle(value: f64) -> f64 {
    let wrapped = value.rem_euclid(TAU);
    // rem_euclid can round up to exactly 2π for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Applies `map` to every member of `cloud` `steps` times, in place.
///
/// Angular coordinates are wrapped after each single step. Non-finite
/// results are kept as they are.
pub fn iterate_in_place(
    map: MapFunction,
    cloud: &mut StateCloud,
    params: &ParameterSet,
    steps: usize,
) -> Result<()> {
    if cloud.dimension() != map.dimension() {
        return Err(SimulationError::DimensionMismatch {
            expected: map.dimension(),
            found: cloud.dimension(),
        });
    }
    let system = map.bind(params)?;
    let angular = map.angular_coordinates();
    let mut stepper = DiscreteMap::new(map.dimension());

    for point in cloud.points_mut() {
        let mut t = 0.0;
        for _ in 0..steps {
            stepper.step(&system, &mut t, point, 1.0);
            for &idx in angular {
                point[idx] = wrap_angle(point[idx]);
            }
        }
    }
    Ok(())
}

/// Returns a new cloud advanced by `steps` map applications.
pub fn iterate(
    map: MapFunction,
    cloud: &StateCloud,
    params: &ParameterSet,
    steps: usize,
) -> Result<StateCloud> {
    let mut next = cloud.clone();
    iterate_in_place(map, &mut next, params, steps)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AxisRange, GridSpec};

    fn defaults(map: MapFunction) -> ParameterSet {
        ParameterSet::defaults(map.parameter_specs())
    }

    #[test]
    fn wrap_angle_is_half_open() {
        assert_eq!(wrap_angle(0.0), 0.0);
        assert_eq!(wrap_angle(TAU), 0.0);
        assert!((wrap_angle(-0.5) - (TAU - 0.5)).abs() < 1e-12);
        assert!((wrap_angle(3.0 * TAU + 1.0) - 1.0).abs() < 1e-9);
        assert!(wrap_angle(-1e-18) < TAU);
    }

    #[test]
    fn henon_single_step_from_origin() {
        let cloud = StateCloud::from_states(2, [[0.0, 0.0]]).unwrap();
        let next = iterate(MapFunction::Henon, &cloud, &defaults(MapFunction::Henon), 1).unwrap();
        assert_eq!(next.point(0), &[1.0, 0.0]);
    }

    #[test]
    fn steps_compose_sequentially() {
        let cloud = StateCloud::from_states(2, [[0.1, -0.2], [0.3, 0.4]]).unwrap();
        let params = defaults(MapFunction::Ikeda);
        let twice = iterate(MapFunction::Ikeda, &cloud, &params, 2).unwrap();
        let once = iterate(MapFunction::Ikeda, &cloud, &params, 1).unwrap();
        let again = iterate(MapFunction::Ikeda, &once, &params, 1).unwrap();
        assert_eq!(twice, again);
    }

    #[test]
    fn result_does_not_depend_on_member_order() {
        let a = [0.1, 0.2];
        let b = [-0.4, 0.3];
        let params = defaults(MapFunction::Henon);
        let forward = StateCloud::from_states(2, [a, b]).unwrap();
        let reversed = StateCloud::from_states(2, [b, a]).unwrap();
        let forward = iterate(MapFunction::Henon, &forward, &params, 5).unwrap();
        let reversed = iterate(MapFunction::Henon, &reversed, &params, 5).unwrap();
        assert_eq!(forward.point(0), reversed.point(1));
        assert_eq!(forward.point(1), reversed.point(0));
    }

    #[test]
    fn zaslavsky_angle_stays_wrapped() {
        let grid = GridSpec::new(AxisRange::new(0.0, TAU, 50), AxisRange::new(-5.0, 15.0, 50));
        let mut cloud = StateCloud::from_grid(&grid).unwrap();
        let params = defaults(MapFunction::Zaslavsky);
        for _ in 0..20 {
            iterate_in_place(MapFunction::Zaslavsky, &mut cloud, &params, 1).unwrap();
            for point in cloud.points() {
                assert!((0.0..TAU).contains(&point[0]), "theta {}", point[0]);
            }
        }
    }

    #[test]
    fn mirror_wraps_both_coordinates() {
        let grid = GridSpec::centered([std::f64::consts::PI; 2], TAU, TAU, 20);
        let cloud = StateCloud::from_grid(&grid).unwrap();
        let params = defaults(MapFunction::CorrugatedMirror);
        let next = iterate(MapFunction::CorrugatedMirror, &cloud, &params, 10).unwrap();
        for point in next.points().filter(|p| p.iter().all(|v| v.is_finite())) {
            assert!(point.iter().all(|v| (0.0..TAU).contains(v)), "{point:?}");
        }
    }

    #[test]
    fn divergence_is_returned_unmodified() {
        let params = defaults(MapFunction::Henon)
            .with("lambda", 2.0)
            .unwrap();
        let cloud = StateCloud::from_states(2, [[5.0, 5.0]]).unwrap();
        let next = iterate(MapFunction::Henon, &cloud, &params, 40).unwrap();
        assert!(!next.point(0)[0].is_finite());
    }

    #[test]
    fn wrong_dimension_is_rejected_before_touching_members() {
        let mut cloud = StateCloud::from_states(3, [[1.0, 2.0, 3.0]]).unwrap();
        let params = defaults(MapFunction::Henon);
        let err = iterate_in_place(MapFunction::Henon, &mut cloud, &params, 1);
        assert_eq!(
            err,
            Err(SimulationError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
        assert_eq!(cloud.point(0), &[1.0, 2.0, 3.0]);
    }
}
