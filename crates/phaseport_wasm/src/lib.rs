//! WASM bridge for the phaseport engine.
//!
//! `WasmExplorer` owns one animation session and is driven frame by frame
//! from the browser; the free functions in `portrait` serve static plots.

mod explorer;
mod portrait;

pub use explorer::WasmExplorer;
pub use portrait::{classify_equilibria, integrate_trajectory, map_character, system_names};

use phaseport_core::params::ParameterSet;
use phaseport_core::{SimulationError, SystemKind};
use wasm_bindgen::JsValue;

pub(crate) fn to_js(err: SimulationError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Parameter set for `kind` from values in declaration order, range-checked.
pub(crate) fn parameter_set(
    kind: SystemKind,
    values: &[f64],
) -> Result<ParameterSet, SimulationError> {
    let mut params = kind.default_parameters();
    params.set_values(values)?;
    params.validate()?;
    Ok(params)
}
