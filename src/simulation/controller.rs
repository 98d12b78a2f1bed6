use super::export::write_snapshot;
use super::poller::{events_loop, status_loop, PollKind, PollTarget, Pollers, SimUpdate, UpdatePayload};
use super::view::{Alert, DashboardView};
use super::SimState;
use crate::api::{ApiError, SimulationApi};
use crate::model::{ControlAck, Instance, SimulationSettings};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Poll generations are unique process-wide so updates from a torn-down
/// controller can never match a newer session.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Pause,
    Stop,
    Export,
}

impl ControlAction {
    pub fn label(self) -> &'static str {
        match self {
            ControlAction::Start => "Start",
            ControlAction::Pause => "Pause",
            ControlAction::Stop => "Stop",
            ControlAction::Export => "Export",
        }
    }
}

#[derive(Debug)]
pub enum ControlReply {
    Started(ControlAck),
    Paused(ControlAck),
    Stopped(ControlAck),
    Exported(serde_json::Value),
}

/// Response to a control request, applied back onto the controller that issued it.
#[derive(Debug)]
pub struct ControlOutcome {
    pub instance_id: String,
    pub action: ControlAction,
    pub result: Result<ControlReply, ApiError>,
}

/// A control request detached from the controller, so callers can await it
/// without holding the controller borrowed.
pub type ControlRequest = BoxFuture<'static, ControlOutcome>;

struct SimulationSession {
    instance_id: String,
    /// Set exactly while the poll loops run.
    generation: Option<u64>,
    pollers: Pollers,
}

pub struct SimulationController<A: SimulationApi> {
    api: Arc<A>,
    settings: SimulationSettings,
    updates_tx: UnboundedSender<SimUpdate>,
    session: Option<SimulationSession>,
    view: DashboardView,
}

impl<A: SimulationApi> SimulationController<A> {
    pub fn new(
        api: Arc<A>,
        settings: SimulationSettings,
        updates_tx: UnboundedSender<SimUpdate>,
    ) -> Self {
        Self {
            api,
            settings,
            updates_tx,
            session: None,
            view: DashboardView::default(),
        }
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn state(&self) -> SimState {
        self.view.state
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.instance_id.as_str())
    }

    pub fn is_polling(&self, kind: PollKind) -> bool {
        self.session
            .as_ref()
            .map(|s| s.pollers.is_active(kind))
            .unwrap_or(false)
    }

    pub fn active_pollers(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.pollers.active_count())
            .unwrap_or(0)
    }

    pub fn clear_alert(&mut self) {
        self.view.alert = None;
    }

    pub fn instances_request(&self) -> BoxFuture<'static, Result<Vec<Instance>, ApiError>> {
        let api = self.api.clone();
        async move { api.list_instances().await }.boxed()
    }

    pub fn apply_instances(&mut self, result: Result<Vec<Instance>, ApiError>) {
        match result {
            Ok(instances) => {
                tracing::debug!(count = instances.len(), "instances loaded");
                self.view.instances = instances;
                self.view.instances_loaded = true;
                let selected = self.view.selected.as_deref();
                self.view.cursor = self
                    .view
                    .instances
                    .iter()
                    .position(|i| Some(i.instance_id.as_str()) == selected)
                    .unwrap_or_else(|| {
                        self.view
                            .cursor
                            .min(self.view.instances.len().saturating_sub(1))
                    });
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load instances");
                self.view.alert = Some(Alert::Error(format!("Failed to load instances: {e}")));
            }
        }
    }

    pub async fn load_instances(&mut self) {
        let result = self.instances_request().await;
        self.apply_instances(result);
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.view.instances.len();
        if len == 0 {
            return;
        }
        let next = self.view.cursor as isize + delta;
        self.view.cursor = next.clamp(0, len as isize - 1) as usize;
    }

    pub fn select_at_cursor(&mut self) {
        if let Some(id) = self
            .view
            .instances
            .get(self.view.cursor)
            .map(|i| i.instance_id.clone())
        {
            self.select_instance(&id);
        }
    }

    /// Make `instance_id` the controlled instance. Polling for a previously
    /// selected instance is cancelled.
    pub fn select_instance(&mut self, instance_id: &str) {
        if self.instance_id() == Some(instance_id) {
            return;
        }
        if let Some(previous) = self.session.take() {
            tracing::info!(instance = %previous.instance_id, "releasing previous instance");
        }
        tracing::info!(instance = %instance_id, "instance selected");
        self.session = Some(SimulationSession {
            instance_id: instance_id.to_string(),
            generation: None,
            pollers: Pollers::default(),
        });
        self.view.selected = Some(instance_id.to_string());
        self.view.state = SimState::Ready;
        self.view.alert = None;
        self.view.reset_observation();
    }

    /// Build the request for `action`, or report that no instance is selected.
    pub fn control_request(&mut self, action: ControlAction) -> Option<ControlRequest> {
        let Some(instance_id) = self.instance_id().map(str::to_string) else {
            self.view.alert = Some(Alert::Error("Select an instance first".into()));
            return None;
        };
        tracing::info!(instance = %instance_id, action = action.label(), "control request");

        let api = self.api.clone();
        let start = self.settings.start_request(&instance_id);
        Some(
            async move {
                let result = match action {
                    ControlAction::Start => api.start(&start).await.map(ControlReply::Started),
                    ControlAction::Pause => {
                        api.pause(&instance_id).await.map(ControlReply::Paused)
                    }
                    ControlAction::Stop => api.stop(&instance_id).await.map(ControlReply::Stopped),
                    ControlAction::Export => {
                        api.export(&instance_id).await.map(ControlReply::Exported)
                    }
                };
                ControlOutcome {
                    instance_id,
                    action,
                    result,
                }
            }
            .boxed(),
        )
    }

    /// Apply a control response. Failures are reported on the view and leave the
    /// lifecycle state as it was.
    pub fn apply_outcome(&mut self, outcome: ControlOutcome) {
        if self.instance_id() != Some(outcome.instance_id.as_str()) {
            tracing::debug!(
                instance = %outcome.instance_id,
                action = outcome.action.label(),
                "dropping outcome for an instance no longer selected"
            );
            return;
        }

        let reply = match outcome.result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    instance = %outcome.instance_id,
                    action = outcome.action.label(),
                    error = %e,
                    "control request failed"
                );
                self.view.alert = Some(Alert::Error(format!(
                    "{} failed: {e}",
                    outcome.action.label()
                )));
                return;
            }
        };

        match reply {
            ControlReply::Started(ack) => {
                self.view.state = SimState::Running;
                self.view.reset_observation();
                self.start_updates();
                self.view.alert = Some(Alert::Success(
                    ack.message
                        .unwrap_or_else(|| "Simulation started".to_string()),
                ));
            }
            ControlReply::Paused(ack) => {
                self.stop_updates();
                self.view.state = SimState::Paused;
                tracing::debug!(status = ?ack.status, "paused");
                self.view.alert = Some(Alert::Success(
                    "Simulation paused. Start again to run a new simulation.".to_string(),
                ));
            }
            ControlReply::Stopped(ack) => {
                self.stop_updates();
                self.view.state = SimState::Stopped;
                tracing::debug!(status = ?ack.status, "stopped");
                self.view.alert = Some(Alert::Success(
                    ack.message
                        .unwrap_or_else(|| "Simulation stopped".to_string()),
                ));
            }
            ControlReply::Exported(snapshot) => {
                match write_snapshot(&self.settings.export_dir, &outcome.instance_id, &snapshot) {
                    Ok(path) => {
                        tracing::info!(path = %path.display(), "snapshot exported");
                        self.view.alert =
                            Some(Alert::Success(format!("Exported: {}", path.display())));
                        self.view.last_export = Some(path);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "snapshot export failed");
                        self.view.alert = Some(Alert::Error(format!("Export failed: {e:#}")));
                    }
                }
            }
        }
    }

    /// (Re)start both poll loops for the selected instance. Any loops already
    /// running are cancelled first.
    pub fn start_updates(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.pollers.cancel_all();

        let generation = next_generation();
        session.generation = Some(generation);
        let target = PollTarget {
            api: self.api.clone(),
            instance_id: session.instance_id.clone(),
            generation,
            tx: self.updates_tx.clone(),
        };
        session.pollers.spawn(
            PollKind::Status,
            status_loop(target.clone(), self.settings.status_interval),
        );
        session.pollers.spawn(
            PollKind::Events,
            events_loop(target, self.settings.events_interval),
        );
        tracing::debug!(instance = %session.instance_id, generation, "polling started");
    }

    /// Cancel both poll loops. Safe to call when nothing is polling.
    pub fn stop_updates(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.generation.take().is_some() {
                tracing::debug!(instance = %session.instance_id, "polling stopped");
            }
            session.pollers.cancel_all();
        }
    }

    /// Fold one poll result into the view. Returns false for stale updates.
    pub fn apply_update(&mut self, update: SimUpdate) -> bool {
        let current = self.session.as_ref().and_then(|s| s.generation);
        if current != Some(update.generation) {
            tracing::trace!(generation = update.generation, "dropping stale poll update");
            return false;
        }
        match update.payload {
            UpdatePayload::Status(snapshot) => {
                self.view.status = Some(snapshot.status);
                self.view.metrics = snapshot.metrics;
            }
            UpdatePayload::Events(events) => self.view.events.replace_from(&events),
        }
        true
    }

    /// Leave the dashboard: nothing keeps polling once this returns.
    pub fn teardown(&mut self) {
        self.stop_updates();
        if let Some(session) = self.session.as_ref() {
            tracing::debug!(instance = %session.instance_id, "dashboard torn down");
        }
    }

    async fn run_control(&mut self, action: ControlAction) {
        if let Some(request) = self.control_request(action) {
            let outcome = request.await;
            self.apply_outcome(outcome);
        }
    }

    pub async fn start_simulation(&mut self) {
        self.run_control(ControlAction::Start).await
    }

    pub async fn pause_simulation(&mut self) {
        self.run_control(ControlAction::Pause).await
    }

    pub async fn stop_simulation(&mut self) {
        self.run_control(ControlAction::Stop).await
    }

    pub async fn export_snapshot(&mut self) {
        self.run_control(ControlAction::Export).await
    }
}
