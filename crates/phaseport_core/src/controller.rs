//! Cooperative animation loop shared by every explorer.
//!
//! One frame is one `advance` (flows) or one map step (maps) followed by a
//! synchronous render callback. Frames are strictly sequential: the next one
//! is only scheduled once the previous callback has returned, and a stop
//! request takes effect at the following frame boundary.

use crate::equilibrium::{classify, EquilibriumPoint};
use crate::error::{Result, SimulationError};
use crate::integrator::{Integrator, IntegratorSettings};
use crate::map_iterator::iterate_in_place;
use crate::params::{ParameterHandle, ParameterSet};
use crate::state::{InitialConditions, StateCloud, Trajectory};
use crate::system::SystemKind;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// Frames rendered before the loop completes on its own.
    pub iteration_limit: usize,
    /// Pause between two frames, handed to the frame clock.
    pub frame_delay_ms: u64,
    /// Time window covered by one frame of a flow.
    pub dt: f64,
    pub integrator: IntegratorSettings,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            iteration_limit: 1000,
            frame_delay_ms: 20,
            dt: 0.01,
            integrator: IntegratorSettings::default(),
        }
    }
}

impl AnimationSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimulationError::invalid("dt must be positive and finite"));
        }
        self.integrator.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Idle,
    Running,
    Stopped,
}

/// What a session evolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionContent {
    Trajectories {
        trajectories: Vec<Trajectory>,
        time: f64,
    },
    Cloud {
        cloud: StateCloud,
    },
}

impl SessionContent {
    /// Latest state of every member, flattened row-major.
    pub fn current_states(&self) -> Vec<f64> {
        match self {
            SessionContent::Trajectories { trajectories, .. } => trajectories
                .iter()
                .filter_map(Trajectory::last)
                .flatten()
                .copied()
                .collect(),
            SessionContent::Cloud { cloud } => cloud.as_slice().to_vec(),
        }
    }

    pub fn member_count(&self) -> usize {
        match self {
            SessionContent::Trajectories { trajectories, .. } => trajectories.len(),
            SessionContent::Cloud { cloud } => cloud.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationSession {
    pub frame_count: usize,
    pub content: SessionContent,
}

impl AnimationSession {
    fn build(kind: SystemKind, initial: &InitialConditions) -> Result<Self> {
        let dim = kind.dimension();
        let content = match kind {
            SystemKind::Flow(_) => SessionContent::Trajectories {
                trajectories: initial.to_trajectories(dim, 0.0)?,
                time: 0.0,
            },
            SystemKind::Map(_) => SessionContent::Cloud {
                cloud: initial.to_cloud(dim)?,
            },
        };
        Ok(Self {
            frame_count: 0,
            content,
        })
    }
}

/// Borrowed read-only view of the current frame.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FrameSnapshot<'a> {
    pub system: SystemKind,
    pub frame_count: usize,
    pub state: RunState,
    pub content: &'a SessionContent,
    pub equilibria: &'a [EquilibriumPoint],
    pub status: Option<&'a SimulationError>,
}

/// Cloneable stop request, usable from the render callback or another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Source of the inter-frame delay. Never influences numerical results.
pub trait FrameClock {
    fn wait(&mut self, delay: Duration);
}

/// Blocks the calling thread for the delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadClock;

impl FrameClock for ThreadClock {
    fn wait(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame ran; carries the new frame count.
    Rendered(usize),
    /// Nothing was due.
    Skipped,
}

pub struct AnimationController {
    kind: SystemKind,
    settings: AnimationSettings,
    params: ParameterHandle,
    equilibria: Vec<EquilibriumPoint>,
    equilibria_revision: u64,
    initial: AnimationSession,
    session: AnimationSession,
    integrator: Integrator,
    state: RunState,
    scheduled: bool,
    stop: StopHandle,
    status: Option<SimulationError>,
}

impl AnimationController {
    /// Controller with the stock parameters, starting states and cadence of `kind`.
    pub fn new(kind: SystemKind) -> Result<Self> {
        Self::with_settings(kind, kind.default_animation())
    }

    pub fn with_settings(kind: SystemKind, settings: AnimationSettings) -> Result<Self> {
        settings.validate()?;
        let params = kind.default_parameters();
        let initial = AnimationSession::build(kind, &kind.default_initial_conditions())?;
        let equilibria = equilibria_for(kind, &params)?;
        debug!(system = %kind, limit = settings.iteration_limit, "created animation controller");
        Ok(Self {
            kind,
            settings,
            params: ParameterHandle::new(params),
            equilibria,
            equilibria_revision: 0,
            session: initial.clone(),
            initial,
            integrator: Integrator::new(settings.integrator, kind.dimension())?,
            state: RunState::Idle,
            scheduled: false,
            stop: StopHandle::default(),
            status: None,
        })
    }

    pub fn kind(&self) -> SystemKind {
        self.kind
    }

    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn frame_count(&self) -> usize {
        self.session.frame_count
    }

    pub fn session(&self) -> &AnimationSession {
        &self.session
    }

    pub fn status(&self) -> Option<&SimulationError> {
        self.status.as_ref()
    }

    pub fn equilibria(&self) -> &[EquilibriumPoint] {
        &self.equilibria
    }

    pub fn parameters(&self) -> ParameterSet {
        self.params.snapshot().0
    }

    /// Shared handle for writers outside the controller.
    pub fn parameter_handle(&self) -> ParameterHandle {
        self.params.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_frame_scheduled(&self) -> bool {
        self.state == RunState::Running && self.scheduled
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.settings.frame_delay_ms)
    }

    /// Validates and installs a full parameter set. Rejected sets leave everything unchanged.
    ///
    /// A set is rejected when a value is out of range or when the equilibria
    /// cannot be classified under it.
    pub fn set_parameters(&mut self, params: ParameterSet) -> Result<()> {
        let kind = self.kind;
        match self.params.replace_checked(params, |next| equilibria_for(kind, next)) {
            Ok(accepted) => {
                self.install_equilibria(accepted);
                Ok(())
            }
            Err(err) => {
                warn!(system = %self.kind, error = %err, "rejected parameter set");
                Err(err)
            }
        }
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        let kind = self.kind;
        match self.params.set_checked(name, value, |next| equilibria_for(kind, next)) {
            Ok(accepted) => {
                self.install_equilibria(accepted);
                Ok(())
            }
            Err(err) => {
                warn!(system = %self.kind, error = %err, "rejected parameter");
                Err(err)
            }
        }
    }

    fn install_equilibria(&mut self, (equilibria, revision): (Vec<EquilibriumPoint>, u64)) {
        self.equilibria = equilibria;
        self.equilibria_revision = revision;
    }

    /// Replaces the session with one built from `initial`. Nothing changes on error.
    pub fn generate(&mut self, initial: &InitialConditions) -> Result<()> {
        let session = AnimationSession::build(self.kind, initial)?;
        debug!(
            system = %self.kind,
            members = session.content.member_count(),
            "generated session"
        );
        self.initial = session.clone();
        self.session = session;
        self.status = None;
        self.scheduled = false;
        self.stop.clear();
        self.transition(RunState::Idle);
        Ok(())
    }

    /// Begins or resumes the loop. No-op while already running.
    pub fn start(&mut self) {
        if self.state == RunState::Running {
            return;
        }
        self.stop.clear();
        self.scheduled = true;
        self.transition(RunState::Running);
    }

    /// Cancels the next frame.
    pub fn stop(&mut self) {
        if self.state != RunState::Running {
            return;
        }
        self.scheduled = false;
        self.transition(RunState::Stopped);
    }

    /// Back to the initial states with a zero frame count, from any state.
    pub fn reset(&mut self) {
        self.session = self.initial.clone();
        self.status = None;
        self.scheduled = false;
        self.stop.clear();
        self.transition(RunState::Idle);
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            debug!(
                system = %self.kind,
                from = ?self.state,
                to = ?next,
                frame = self.session.frame_count,
                "state change"
            );
            self.state = next;
        }
    }

    pub fn current_frame(&self) -> FrameSnapshot<'_> {
        FrameSnapshot {
            system: self.kind,
            frame_count: self.session.frame_count,
            state: self.state,
            content: &self.session.content,
            equilibria: &self.equilibria,
            status: self.status.as_ref(),
        }
    }

    /// Runs the scheduled frame, if any, and invokes `render` on its result.
    ///
    /// A divergent step, or equilibria that cannot be classified under the
    /// frame's parameters, freezes the session in `Stopped` with the last
    /// valid frame kept and returns the error.
    pub fn tick<F>(&mut self, mut render: F) -> Result<FrameOutcome>
    where
        F: FnMut(&FrameSnapshot<'_>),
    {
        if !self.is_frame_scheduled() {
            return Ok(FrameOutcome::Skipped);
        }
        self.scheduled = false;

        if self.stop.take() {
            self.transition(RunState::Stopped);
            return Ok(FrameOutcome::Skipped);
        }
        if self.session.frame_count >= self.settings.iteration_limit {
            self.transition(RunState::Idle);
            return Ok(FrameOutcome::Skipped);
        }

        let (params, revision) = self.params.snapshot();
        if revision != self.equilibria_revision {
            match equilibria_for(self.kind, &params) {
                Ok(equilibria) => self.install_equilibria((equilibria, revision)),
                Err(err) => return Err(self.halt(err)),
            }
        }

        if let Err(err) = self.step(&params) {
            return Err(self.halt(err));
        }
        self.session.frame_count += 1;
        let frame = self.session.frame_count;
        trace!(system = %self.kind, frame, "rendering frame");
        render(&self.current_frame());

        if self.stop.take() {
            self.transition(RunState::Stopped);
        } else if frame >= self.settings.iteration_limit {
            self.transition(RunState::Idle);
        } else {
            self.scheduled = true;
        }
        Ok(FrameOutcome::Rendered(frame))
    }

    /// Freezes the session on a failed frame, keeping the last valid one.
    fn halt(&mut self, err: SimulationError) -> SimulationError {
        warn!(
            system = %self.kind,
            frame = self.session.frame_count,
            error = %err,
            "frame failed"
        );
        self.status = Some(err.clone());
        self.transition(RunState::Stopped);
        err
    }

    /// Starts the loop and drives it to completion or stop, waiting on
    /// `clock` between frames. Returns the number of frames rendered.
    pub fn run<C, F>(&mut self, clock: &mut C, mut render: F) -> Result<usize>
    where
        C: FrameClock,
        F: FnMut(&FrameSnapshot<'_>),
    {
        self.start();
        let mut rendered = 0;
        while self.is_frame_scheduled() {
            if let FrameOutcome::Rendered(_) = self.tick(&mut render)? {
                rendered += 1;
            }
            if self.is_frame_scheduled() {
                clock.wait(self.frame_delay());
            }
        }
        Ok(rendered)
    }

    fn step(&mut self, params: &ParameterSet) -> Result<()> {
        match (self.kind, &mut self.session.content) {
            (SystemKind::Flow(field), SessionContent::Trajectories { trajectories, time }) => {
                let system = field.bind(params)?;
                let dt = self.settings.dt;
                // All members advance or none do.
                let mut next = Vec::with_capacity(trajectories.len());
                for trajectory in trajectories.iter() {
                    let state = trajectory
                        .last()
                        .ok_or_else(|| SimulationError::invalid("trajectory has no states"))?;
                    next.push(self.integrator.advance(&system, state, *time, dt)?);
                }
                *time += dt;
                for (trajectory, state) in trajectories.iter_mut().zip(&next) {
                    trajectory.push(*time, state)?;
                }
                Ok(())
            }
            (SystemKind::Map(map), SessionContent::Cloud { cloud }) => {
                iterate_in_place(map, cloud, params, 1)
            }
            _ => Err(SimulationError::invalid("session content does not match the system")),
        }
    }
}

fn equilibria_for(kind: SystemKind, params: &ParameterSet) -> Result<Vec<EquilibriumPoint>> {
    match kind {
        SystemKind::Flow(field) => classify(field, params),
        SystemKind::Map(_) => Ok(Vec::new()),
    }
}
