//! Interactive explorer handle: one animation session driven from JS.

use crate::{parameter_set, to_js};
use phaseport_core::controller::{FrameOutcome, SessionContent};
use phaseport_core::fields::{pendulum_bobs, PendulumParams, VectorField};
use phaseport_core::state::{AxisRange, GridSpec, InitialConditions};
use phaseport_core::{AnimationController, SystemKind};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmExplorer {
    controller: AnimationController,
}

#[wasm_bindgen]
impl WasmExplorer {
    #[wasm_bindgen(constructor)]
    pub fn new(system_name: &str) -> Result<WasmExplorer, JsValue> {
        console_error_panic_hook::set_once();

        let kind: SystemKind = system_name.parse().map_err(to_js)?;
        let controller = AnimationController::new(kind).map_err(to_js)?;
        Ok(WasmExplorer { controller })
    }

    pub fn system_name(&self) -> String {
        self.controller.kind().name().to_string()
    }

    pub fn dimension(&self) -> usize {
        self.controller.kind().dimension()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.controller
            .kind()
            .parameter_specs()
            .iter()
            .map(|spec| spec.name.to_string())
            .collect()
    }

    pub fn parameter_values(&self) -> Vec<f64> {
        self.controller.parameters().values().to_vec()
    }

    /// Name, symbol, range and default of every parameter.
    pub fn parameter_specs(&self) -> Result<JsValue, JsValue> {
        to_value(self.controller.kind().parameter_specs())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), JsValue> {
        self.controller.set_parameter(name, value).map_err(to_js)
    }

    /// Replaces every parameter at once, in declaration order.
    pub fn set_parameters(&mut self, values: Vec<f64>) -> Result<(), JsValue> {
        let params = parameter_set(self.controller.kind(), &values).map_err(to_js)?;
        self.controller.set_parameters(params).map_err(to_js)
    }

    /// Rebuilds the session from a serialized initial-condition rule.
    pub fn generate(&mut self, initial: JsValue) -> Result<(), JsValue> {
        let initial: InitialConditions = from_value(initial)
            .map_err(|e| JsValue::from_str(&format!("Invalid initial conditions: {}", e)))?;
        self.controller.generate(&initial).map_err(to_js)
    }

    pub fn generate_grid(
        &mut self,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        samples: usize,
    ) -> Result<(), JsValue> {
        let grid = GridSpec::new(
            AxisRange::new(x_min, x_max, samples),
            AxisRange::new(y_min, y_max, samples),
        );
        self.controller
            .generate(&InitialConditions::Grid { grid })
            .map_err(to_js)
    }

    pub fn start(&mut self) {
        self.controller.start();
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    pub fn reset(&mut self) {
        self.controller.reset();
    }

    pub fn state(&self) -> String {
        format!("{:?}", self.controller.state()).to_uppercase()
    }

    pub fn frame_count(&self) -> usize {
        self.controller.frame_count()
    }

    pub fn frame_delay_ms(&self) -> f64 {
        self.controller.settings().frame_delay_ms as f64
    }

    pub fn is_frame_scheduled(&self) -> bool {
        self.controller.is_frame_scheduled()
    }

    /// Stops the loop at the next frame boundary.
    pub fn request_stop(&self) {
        self.controller.stop_handle().request_stop();
    }

    /// Runs the scheduled frame without a callback. Returns whether a frame ran.
    pub fn tick(&mut self) -> Result<bool, JsValue> {
        let outcome = self.controller.tick(|_| {}).map_err(to_js)?;
        Ok(matches!(outcome, FrameOutcome::Rendered(_)))
    }

    /// Runs the scheduled frame and hands its snapshot to `callback` before
    /// the next frame can be scheduled.
    pub fn tick_with(&mut self, callback: &js_sys::Function) -> Result<bool, JsValue> {
        let mut failure = None;
        let outcome = self
            .controller
            .tick(|frame| {
                let result = to_value(frame)
                    .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
                    .and_then(|value| callback.call1(&JsValue::NULL, &value));
                if let Err(err) = result {
                    failure = Some(err);
                }
            })
            .map_err(to_js)?;
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(matches!(outcome, FrameOutcome::Rendered(_)))
    }

    /// Latest state of every member, flattened row-major.
    pub fn coordinates(&self) -> Vec<f64> {
        self.controller.session().content.current_states()
    }

    /// Up to `length` most recent states of one trajectory, flattened.
    pub fn trail(&self, member: usize, length: usize) -> Vec<f64> {
        match &self.controller.session().content {
            SessionContent::Trajectories { trajectories, .. } => trajectories
                .get(member)
                .map(|trajectory| trajectory.tail(length).flatten().copied().collect())
                .unwrap_or_default(),
            SessionContent::Cloud { .. } => Vec::new(),
        }
    }

    /// Bob positions `[x1, y1, x2, y2]` per pendulum.
    pub fn pendulum_bobs(&self) -> Result<Vec<f64>, JsValue> {
        if self.controller.kind() != SystemKind::Flow(VectorField::DoublePendulum) {
            return Err(JsValue::from_str("pendulum_bobs requires the double_pendulum system"));
        }
        let params = PendulumParams::from_set(&self.controller.parameters()).map_err(to_js)?;
        let states = self.coordinates();
        Ok(states
            .chunks_exact(4)
            .flat_map(|state| {
                let [first, second] = pendulum_bobs(state, &params);
                [first[0], first[1], second[0], second[1]]
            })
            .collect())
    }

    pub fn current_frame(&self) -> Result<JsValue, JsValue> {
        to_value(&self.controller.current_frame())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn equilibria(&self) -> Result<JsValue, JsValue> {
        to_value(self.controller.equilibria())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Area behaviour of the current map; `null` for flows.
    pub fn map_character(&self) -> Result<JsValue, JsValue> {
        match self.controller.kind() {
            SystemKind::Map(map) => {
                let character = map.character(&self.controller.parameters()).map_err(to_js)?;
                to_value(&character)
                    .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
            }
            SystemKind::Flow(_) => Ok(JsValue::NULL),
        }
    }

    /// Message of the divergence that froze the session, if any.
    pub fn status(&self) -> Option<String> {
        self.controller.status().map(|err| err.to_string())
    }
}
