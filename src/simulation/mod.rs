//! Live simulation control.
//!
//! One controller drives one remote simulation at a time: control requests
//! (start/pause/stop/export) plus two independent poll loops (status, events)
//! that run exactly while the simulation is believed to be running.

mod controller;
pub mod export;
mod poller;
mod view;

pub use controller::{ControlAction, ControlOutcome, ControlRequest, SimulationController};
pub use poller::{PollKind, SimUpdate};
pub use view::{Alert, DashboardView};

/// Client-side lifecycle of the selected simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimState {
    /// No instance selected.
    #[default]
    Idle,
    /// Instance selected, nothing started from this session.
    Ready,
    Running,
    /// Observation stopped; a fresh start is required to run again.
    Paused,
    Stopped,
}

impl SimState {
    pub fn label(self) -> &'static str {
        match self {
            SimState::Idle => "Idle",
            SimState::Ready => "Ready",
            SimState::Running => "Running",
            SimState::Paused => "Paused",
            SimState::Stopped => "Stopped",
        }
    }
}
