//! The `phaseport_core` crate is the simulation engine behind the phase-portrait explorers.
//! It advances low-dimensional dynamical systems, continuous flows and discrete maps,
//! for whole batches of states at once, and drives the animation loop that renders them.
//!
//! Key components:
//! - **Traits**: `Scalar`, `DynamicalSystem` (flows and maps), `Steppable` (solvers).
//! - **Systems**: `VectorField` and `MapFunction` variants with their parameter tables.
//! - **Integrator / map iterator**: fixed-step Runge-Kutta stepping and cloud iteration.
//! - **Equilibrium**: equilibria with stability labels for bifurcation display.
//! - **Controller**: the `AnimationController` state machine and its frame snapshots.
pub mod controller;
pub mod equilibrium;
pub mod error;
pub mod fields;
pub mod integrator;
pub mod map_iterator;
pub mod maps;
pub mod params;
pub mod solvers;
pub mod state;
pub mod system;
pub mod traits;

pub use controller::{AnimationController, AnimationSettings, FrameSnapshot, RunState};
pub use error::{Result, SimulationError};
pub use system::SystemKind;
