//! Discrete-time systems on the plane.

use crate::error::Result;
use crate::params::{ParamSpec, ParameterSet};
use crate::traits::DynamicalSystem;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

const IKEDA_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("a", "A", 0.1, 1.5, 0.85),
    ParamSpec::new("b", "B", 0.1, 1.0, 0.9),
    ParamSpec::new("lambda", "λ", 0.1, 1.0, 0.4),
];

const IKEDA_QUADRATIC_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("a", "A", 0.0, 2.0, 1.0),
    ParamSpec::new("b", "B", 0.0, 1.0, 0.9),
];

const HENON_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("lambda", "λ", 0.1, 2.0, 1.4),
    ParamSpec::new("b", "b", 0.0, 1.2, 0.3),
];

const ZASLAVSKY_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("k", "K", 0.1, 10.0, 5.0),
    ParamSpec::new("gamma", "γ", 0.0, 1.0, 0.1),
    ParamSpec::new("omega", "Ω", 0.1, 2.0, 0.618),
];

const MIRROR_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("z", "z", 0.1, 5.0, 1.0),
    ParamSpec::new("h", "h", 0.1, 2.0, 0.5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapFunction {
    /// z' = A + B·z·exp(iλ / (1 + |z|²)), state (Re z, Im z).
    Ikeda,
    /// z' = A + B·z·exp(i|z|²).
    IkedaQuadraticPhase,
    /// x' = 1 − λx² − b·y, y' = x.
    Henon,
    /// State (θ, p); θ is angular.
    Zaslavsky,
    /// Corrugated mirror billiard, state (x, y), both angular.
    CorrugatedMirror,
}

impl MapFunction {
    pub const ALL: [MapFunction; 5] = [
        MapFunction::Ikeda,
        MapFunction::IkedaQuadraticPhase,
        MapFunction::Henon,
        MapFunction::Zaslavsky,
        MapFunction::CorrugatedMirror,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MapFunction::Ikeda => "ikeda",
            MapFunction::IkedaQuadraticPhase => "ikeda_quadratic_phase",
            MapFunction::Henon => "henon",
            MapFunction::Zaslavsky => "zaslavsky",
            MapFunction::CorrugatedMirror => "corrugated_mirror",
        }
    }

    pub fn dimension(self) -> usize {
        2
    }

    /// Coordinates with period 2π.
    pub fn angular_coordinates(self) -> &'static [usize] {
        match self {
            MapFunction::Zaslavsky => &[0],
            MapFunction::CorrugatedMirror => &[0, 1],
            _ => &[],
        }
    }

    pub fn parameter_specs(self) -> &'static [ParamSpec] {
        match self {
            MapFunction::Ikeda => IKEDA_PARAMS,
            MapFunction::IkedaQuadraticPhase => IKEDA_QUADRATIC_PARAMS,
            MapFunction::Henon => HENON_PARAMS,
            MapFunction::Zaslavsky => ZASLAVSKY_PARAMS,
            MapFunction::CorrugatedMirror => MIRROR_PARAMS,
        }
    }

    /// Writes the image of `x` into `out`, before any angular reduction.
    pub fn evaluate(self, x: &[f64], p: &[f64], out: &mut [f64]) {
        match self {
            MapFunction::Ikeda => {
                let z = Complex::new(x[0], x[1]);
                let phase = p[2] / (1.0 + z.norm_sqr());
                write_complex(z * Complex::from_polar(p[1], phase) + p[0], out);
            }
            MapFunction::IkedaQuadraticPhase => {
                let z = Complex::new(x[0], x[1]);
                write_complex(z * Complex::from_polar(p[1], z.norm_sqr()) + p[0], out);
            }
            MapFunction::Henon => {
                let (lambda, b) = (p[0], p[1]);
                out[0] = 1.0 - lambda * x[0] * x[0] - b * x[1];
                out[1] = x[0];
            }
            MapFunction::Zaslavsky => {
                let (k, gamma, omega) = (p[0], p[1], p[2]);
                let momentum = (1.0 - gamma) * x[1] + k * x[0].sin() + omega;
                out[0] = x[0] + momentum;
                out[1] = momentum;
            }
            MapFunction::CorrugatedMirror => {
                let (z, h) = (p[0], p[1]);
                let y = x[1] - z * x[0].sin();
                out[0] = x[0] + h * y.tan();
                out[1] = y;
            }
        }
    }

    pub fn bind(self, params: &ParameterSet) -> Result<MapSystem> {
        Ok(MapSystem {
            map: self,
            params: params.values_for(self.parameter_specs())?,
        })
    }

    /// Area behaviour and, where the map has one, its chaos regime.
    pub fn character(self, params: &ParameterSet) -> Result<MapCharacter> {
        let p = params.values_for(self.parameter_specs())?;
        let area_contraction = match self {
            MapFunction::Ikeda | MapFunction::IkedaQuadraticPhase => p[1] * p[1],
            MapFunction::Henon => p[1].abs(),
            MapFunction::Zaslavsky => (1.0 - p[1]).abs(),
            MapFunction::CorrugatedMirror => 1.0,
        };
        let dissipation = if is_close(area_contraction, 1.0) {
            Dissipation::Conservative
        } else {
            Dissipation::Dissipative
        };
        let regime = match self {
            MapFunction::Zaslavsky => Some(ChaosRegime::from_kick(p[0])),
            _ => None,
        };
        Ok(MapCharacter {
            area_contraction,
            dissipation,
            regime,
        })
    }
}

fn write_complex(z: Complex<f64>, out: &mut [f64]) {
    out[0] = z.re;
    out[1] = z.im;
}

// numpy.isclose defaults
fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// A map with frozen parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSystem {
    map: MapFunction,
    params: Vec<f64>,
}

impl DynamicalSystem<f64> for MapSystem {
    fn dimension(&self) -> usize {
        self.map.dimension()
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        self.map.evaluate(x, &self.params, out);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dissipation {
    Conservative,
    Dissipative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosRegime {
    Regular,
    StochasticLayer,
    DevelopedChaos,
}

impl ChaosRegime {
    fn from_kick(k: f64) -> Self {
        if k < 1.0 {
            ChaosRegime::Regular
        } else if k <= 5.0 {
            ChaosRegime::StochasticLayer
        } else {
            ChaosRegime::DevelopedChaos
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapCharacter {
    /// |det J|, constant over the plane for every map here.
    pub area_contraction: f64,
    pub dissipation: Dissipation,
    pub regime: Option<ChaosRegime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(map: MapFunction, params: &ParameterSet, x: [f64; 2]) -> [f64; 2] {
        let system = map.bind(params).unwrap();
        let mut out = [0.0; 2];
        system.apply(0.0, &x, &mut out);
        out
    }

    fn defaults(map: MapFunction) -> ParameterSet {
        ParameterSet::defaults(map.parameter_specs())
    }

    #[test]
    fn henon_sends_origin_to_one_zero() {
        let params = defaults(MapFunction::Henon);
        assert_eq!(image(MapFunction::Henon, &params, [0.0, 0.0]), [1.0, 0.0]);
        let out = image(MapFunction::Henon, &params, [1.0, 1.0]);
        assert!((out[0] - (1.0 - 1.4 - 0.3)).abs() < 1e-15);
        assert_eq!(out[1], 1.0);
    }

    #[test]
    fn ikeda_origin_maps_to_a() {
        let out = image(MapFunction::Ikeda, &defaults(MapFunction::Ikeda), [0.0, 0.0]);
        assert_eq!(out, [0.85, 0.0]);
    }

    #[test]
    fn ikeda_rotates_by_the_damped_phase() {
        let params = defaults(MapFunction::Ikeda).with("a", 0.1).unwrap();
        let out = image(MapFunction::Ikeda, &params, [1.0, 0.0]);
        // |z|² = 1, so the phase is λ / 2.
        let phase: f64 = 0.2;
        assert!((out[0] - (0.1 + 0.9 * phase.cos())).abs() < 1e-12);
        assert!((out[1] - 0.9 * phase.sin()).abs() < 1e-12);
    }

    #[test]
    fn quadratic_phase_variant_uses_squared_modulus() {
        let params = defaults(MapFunction::IkedaQuadraticPhase);
        let out = image(MapFunction::IkedaQuadraticPhase, &params, [0.0, 2.0]);
        // z = 2i, phase 4.
        let expected =
            Complex::new(1.0, 0.0) + Complex::new(0.0, 2.0) * Complex::from_polar(0.9, 4.0);
        assert!((out[0] - expected.re).abs() < 1e-12);
        assert!((out[1] - expected.im).abs() < 1e-12);
    }

    #[test]
    fn zaslavsky_kicks_momentum_then_shifts_angle() {
        let params = defaults(MapFunction::Zaslavsky);
        let theta = std::f64::consts::FRAC_PI_2;
        let out = image(MapFunction::Zaslavsky, &params, [theta, 1.0]);
        let momentum = 0.9 + 5.0 + 0.618;
        assert!((out[1] - momentum).abs() < 1e-12);
        assert!((out[0] - (theta + momentum)).abs() < 1e-12);
    }

    #[test]
    fn mirror_uses_updated_y_for_the_x_shift() {
        let params = defaults(MapFunction::CorrugatedMirror);
        let x = std::f64::consts::FRAC_PI_2;
        let out = image(MapFunction::CorrugatedMirror, &params, [x, 1.5]);
        assert!((out[1] - 0.5).abs() < 1e-12);
        assert!((out[0] - (x + 0.5 * 0.5f64.tan())).abs() < 1e-12);
    }

    #[test]
    fn character_reports_area_behaviour() {
        let ikeda = MapFunction::Ikeda.character(&defaults(MapFunction::Ikeda)).unwrap();
        assert!((ikeda.area_contraction - 0.81).abs() < 1e-12);
        assert_eq!(ikeda.dissipation, Dissipation::Dissipative);
        assert_eq!(ikeda.regime, None);

        let unit = defaults(MapFunction::Ikeda).with("b", 1.0).unwrap();
        assert_eq!(
            MapFunction::Ikeda.character(&unit).unwrap().dissipation,
            Dissipation::Conservative
        );

        let mirror = MapFunction::CorrugatedMirror
            .character(&defaults(MapFunction::CorrugatedMirror))
            .unwrap();
        assert_eq!(mirror.dissipation, Dissipation::Conservative);
    }

    #[test]
    fn zaslavsky_regimes_follow_kick_strength() {
        let regime = |k: f64, gamma: f64| {
            let params = defaults(MapFunction::Zaslavsky)
                .with("k", k)
                .unwrap()
                .with("gamma", gamma)
                .unwrap();
            MapFunction::Zaslavsky.character(&params).unwrap()
        };
        assert_eq!(regime(0.5, 0.1).regime, Some(ChaosRegime::Regular));
        assert_eq!(regime(1.0, 0.1).regime, Some(ChaosRegime::StochasticLayer));
        assert_eq!(regime(5.0, 0.1).regime, Some(ChaosRegime::StochasticLayer));
        assert_eq!(regime(7.5, 0.1).regime, Some(ChaosRegime::DevelopedChaos));
        assert_eq!(regime(5.0, 0.0).dissipation, Dissipation::Conservative);
        assert_eq!(regime(5.0, 0.1).dissipation, Dissipation::Dissipative);
    }

    #[test]
    fn defaults_are_in_range() {
        for map in MapFunction::ALL {
            assert!(defaults(map).validate().is_ok(), "{}", map.name());
            assert_eq!(map.bind(&defaults(map)).unwrap().dimension(), 2);
        }
    }
}
