//! Stateless entry points for static portraits.

use crate::{parameter_set, to_js};
use phaseport_core::equilibrium::classify;
use phaseport_core::fields::VectorField;
use phaseport_core::integrator::integrate;
use phaseport_core::maps::MapFunction;
use phaseport_core::SystemKind;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

fn flow_kind(system_name: &str) -> Result<VectorField, JsValue> {
    match system_name.parse::<SystemKind>().map_err(to_js)? {
        SystemKind::Flow(field) => Ok(field),
        SystemKind::Map(_) => Err(JsValue::from_str(&format!(
            "`{}` is a map, not a flow",
            system_name
        ))),
    }
}

fn map_kind(system_name: &str) -> Result<MapFunction, JsValue> {
    match system_name.parse::<SystemKind>().map_err(to_js)? {
        SystemKind::Map(map) => Ok(map),
        SystemKind::Flow(_) => Err(JsValue::from_str(&format!(
            "`{}` is a flow, not a map",
            system_name
        ))),
    }
}

#[wasm_bindgen]
pub fn system_names() -> Vec<String> {
    SystemKind::all().map(|kind| kind.name().to_string()).collect()
}

/// Samples one trajectory of a flow; returns the states flattened row-major.
#[wasm_bindgen]
pub fn integrate_trajectory(
    system_name: &str,
    params: Vec<f64>,
    state0: Vec<f64>,
    t_start: f64,
    t_end: f64,
    sample_count: usize,
) -> Result<Vec<f64>, JsValue> {
    let field = flow_kind(system_name)?;
    let params = parameter_set(SystemKind::Flow(field), &params).map_err(to_js)?;
    let system = field.bind(&params).map_err(to_js)?;
    let trajectory = integrate(&system, &state0, t_start, t_end, sample_count).map_err(to_js)?;
    Ok(trajectory.as_slice().to_vec())
}

#[wasm_bindgen]
pub fn classify_equilibria(system_name: &str, params: Vec<f64>) -> Result<JsValue, JsValue> {
    let field = flow_kind(system_name)?;
    let params = parameter_set(SystemKind::Flow(field), &params).map_err(to_js)?;
    let points = classify(field, &params).map_err(to_js)?;
    to_value(&points).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub fn map_character(system_name: &str, params: Vec<f64>) -> Result<JsValue, JsValue> {
    let map = map_kind(system_name)?;
    let params = parameter_set(SystemKind::Map(map), &params).map_err(to_js)?;
    let character = map.character(&params).map_err(to_js)?;
    to_value(&character).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_system() {
        let names = system_names();
        assert_eq!(names.len(), 10);
        assert!(names.iter().any(|name| name == "corrugated_mirror"));
    }

    #[test]
    fn integrates_a_hopf_portrait() {
        let coords =
            integrate_trajectory("hopf", vec![0.5, 1.0, 1.0], vec![0.5, 0.0, 0.5], 0.0, 20.0, 1000)
                .expect("trajectory");
        assert_eq!(coords.len(), 3 * 1000);
        assert_eq!(&coords[..3], &[0.5, 0.0, 0.5]);
        assert!(coords.iter().all(|v| v.is_finite()));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn rejects_maps_and_bad_parameters() {
        let err = integrate_trajectory("henon", vec![1.4, 0.3], vec![0.0, 0.0], 0.0, 1.0, 10)
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(err.contains("not a flow"));

        let err = classify_equilibria("pitchfork", vec![4.0])
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(err.contains("outside its valid range"));
    }

    #[wasm_bindgen_test]
    fn classifies_the_saddle_node() {
        let value = classify_equilibria("saddle_node", vec![-0.5, -1.0]).expect("points");
        let points = js_sys::Array::from(&value);
        assert_eq!(points.length(), 2);
    }
}
