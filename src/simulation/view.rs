//! In-memory view model of the live simulation dashboard.
//!
//! The TUI and the text reporter both project from this; nothing here touches the terminal.

use super::SimState;
use crate::metrics;
use crate::model::{Instance, SimStatus, SimulationEvent, SimulationMetrics};
use std::path::PathBuf;

pub const EVENT_LOG_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    pub iteration: u64,
    pub feature_id: String,
    pub allowed: bool,
    pub reason: String,
}

impl From<&SimulationEvent> for EventEntry {
    fn from(ev: &SimulationEvent) -> Self {
        let reason = if ev.reason.is_empty() {
            ev.details.clone()
        } else {
            ev.reason.clone()
        };
        Self {
            iteration: ev.iteration,
            feature_id: ev.feature_id.clone(),
            allowed: ev.allowed,
            reason,
        }
    }
}

/// Most recent events, newest first. Rebuilt from scratch on every events poll.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<EventEntry>,
}

impl EventLog {
    pub fn replace_from(&mut self, events: &[SimulationEvent]) {
        let start = events.len().saturating_sub(EVENT_LOG_CAPACITY);
        self.entries = events[start..].iter().rev().map(EventEntry::from).collect();
    }

    pub fn entries(&self) -> &[EventEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Success(String),
    Error(String),
}

impl Alert {
    pub fn message(&self) -> &str {
        match self {
            Alert::Success(m) | Alert::Error(m) => m,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub instances: Vec<Instance>,
    pub cursor: usize,
    pub instances_loaded: bool,
    pub selected: Option<String>,
    pub state: SimState,
    pub status: Option<SimStatus>,
    pub metrics: SimulationMetrics,
    pub events: EventLog,
    pub alert: Option<Alert>,
    pub last_export: Option<PathBuf>,
}

impl DashboardView {
    pub fn progress_percent(&self) -> f64 {
        metrics::progress_percent(
            self.metrics.completed_iterations,
            self.metrics.total_iterations,
        )
    }

    pub fn success_rate_text(&self) -> String {
        metrics::format_success_rate(self.metrics.success_count, self.metrics.failure_count)
    }

    pub fn elapsed_text(&self) -> String {
        metrics::format_seconds(self.metrics.elapsed_seconds)
    }

    pub fn remaining_text(&self) -> String {
        metrics::format_seconds(self.metrics.estimated_remaining_seconds)
    }

    /// Drop everything observed for the previous instance.
    pub(crate) fn reset_observation(&mut self) {
        self.status = None;
        self.metrics = SimulationMetrics::default();
        self.events.clear();
        self.last_export = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(iteration: u64) -> SimulationEvent {
        SimulationEvent {
            iteration,
            feature_id: format!("feature-{}", iteration % 3),
            allowed: iteration % 2 == 0,
            reason: "ok".into(),
            ..Default::default()
        }
    }

    #[test]
    fn event_log_keeps_latest_twenty_newest_first() {
        let events: Vec<_> = (1..=100).map(event).collect();
        let mut log = EventLog::default();
        log.replace_from(&events);

        let entries = log.entries();
        assert_eq!(entries.len(), EVENT_LOG_CAPACITY);
        assert_eq!(entries[0].iteration, 100);
        assert_eq!(entries[19].iteration, 81);
        assert!(entries.windows(2).all(|w| w[0].iteration > w[1].iteration));
    }

    #[test]
    fn event_log_is_replaced_not_appended() {
        let mut log = EventLog::default();
        log.replace_from(&(1..=30).map(event).collect::<Vec<_>>());
        log.replace_from(&(1..=3).map(event).collect::<Vec<_>>());
        let iterations: Vec<_> = log.entries().iter().map(|e| e.iteration).collect();
        assert_eq!(iterations, vec![3, 2, 1]);
    }

    #[test]
    fn lifecycle_events_fall_back_to_details() {
        let ev = SimulationEvent {
            details: "Paused at iteration 4".into(),
            ..Default::default()
        };
        assert_eq!(EventEntry::from(&ev).reason, "Paused at iteration 4");
    }

    #[test]
    fn progress_and_rate_project_from_metrics() {
        let mut view = DashboardView::default();
        assert_eq!(view.success_rate_text(), "0%");
        view.metrics.total_iterations = 50;
        view.metrics.completed_iterations = 25;
        view.metrics.success_count = 3;
        view.metrics.failure_count = 1;
        assert_eq!(view.progress_percent(), 50.0);
        assert_eq!(view.success_rate_text(), "75.0%");
    }
}
