use crate::api::{ApiError, TutorialApi};
use crate::lessons::{
    LimitsController, LimitsOutcome, LimitsRequest, SetupController, SetupOutcome, SetupRequest,
};
use crate::model::{Instance, RegistrationSettings, SimulationSettings};
use crate::router::{Page, PageRenderer};
use crate::simulation::{ControlAction, ControlOutcome, SimUpdate, SimulationController};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Responses of requests spawned off the UI loop, tagged with the page visit
/// that issued them.
#[derive(Debug)]
pub enum UiMessage {
    Instances {
        visit: u64,
        result: Result<Vec<Instance>, ApiError>,
    },
    Control {
        visit: u64,
        outcome: ControlOutcome,
    },
    Setup {
        visit: u64,
        outcome: SetupOutcome,
    },
    Limits {
        visit: u64,
        outcome: LimitsOutcome,
    },
}

impl UiMessage {
    fn visit(&self) -> u64 {
        match self {
            UiMessage::Instances { visit, .. }
            | UiMessage::Control { visit, .. }
            | UiMessage::Setup { visit, .. }
            | UiMessage::Limits { visit, .. } => *visit,
        }
    }
}

/// Per-visit state of the step on screen.
pub enum PageState<A: TutorialApi> {
    Lesson,
    Setup(SetupController<A>),
    Limits(LimitsController<A>),
    Runtime(SimulationController<A>),
}

/// Renders steps for the router. Entering a step builds its state afresh;
/// leaving it drops that state and tears down any runtime polling.
pub struct Pages<A: TutorialApi> {
    api: Arc<A>,
    settings: SimulationSettings,
    registration: RegistrationSettings,
    preselect: Option<String>,
    updates_tx: UnboundedSender<SimUpdate>,
    msg_tx: UnboundedSender<UiMessage>,
    active: Option<Page>,
    state: PageState<A>,
    visit: u64,
}

impl<A: TutorialApi> Pages<A> {
    pub fn new(
        api: Arc<A>,
        settings: SimulationSettings,
        preselect: Option<String>,
        updates_tx: UnboundedSender<SimUpdate>,
        msg_tx: UnboundedSender<UiMessage>,
    ) -> Self {
        Self {
            api,
            settings,
            registration: RegistrationSettings::default(),
            preselect,
            updates_tx,
            msg_tx,
            active: None,
            state: PageState::Lesson,
            visit: 0,
        }
    }

    pub fn with_registration(mut self, registration: RegistrationSettings) -> Self {
        self.registration = registration;
        self
    }

    pub fn state(&self) -> &PageState<A> {
        &self.state
    }

    pub fn runtime(&self) -> Option<&SimulationController<A>> {
        match &self.state {
            PageState::Runtime(ctrl) => Some(ctrl),
            _ => None,
        }
    }

    pub fn runtime_mut(&mut self) -> Option<&mut SimulationController<A>> {
        match &mut self.state {
            PageState::Runtime(ctrl) => Some(ctrl),
            _ => None,
        }
    }

    pub fn setup_mut(&mut self) -> Option<&mut SetupController<A>> {
        match &mut self.state {
            PageState::Setup(ctrl) => Some(ctrl),
            _ => None,
        }
    }

    pub fn limits_mut(&mut self) -> Option<&mut LimitsController<A>> {
        match &mut self.state {
            PageState::Limits(ctrl) => Some(ctrl),
            _ => None,
        }
    }

    /// Dismiss whatever alert the current step shows.
    pub fn clear_alert(&mut self) {
        match &mut self.state {
            PageState::Lesson => {}
            PageState::Setup(ctrl) => ctrl.clear_alert(),
            PageState::Limits(ctrl) => ctrl.clear_alert(),
            PageState::Runtime(ctrl) => ctrl.clear_alert(),
        }
    }

    fn spawn_message<F>(&self, fut: F)
    where
        F: Future<Output = UiMessage> + Send + 'static,
    {
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
    }

    fn spawn_setup(&self, request: SetupRequest) {
        let visit = self.visit;
        self.spawn_message(async move {
            UiMessage::Setup {
                visit,
                outcome: request.await,
            }
        });
    }

    fn spawn_limits(&self, request: LimitsRequest) {
        let visit = self.visit;
        self.spawn_message(async move {
            UiMessage::Limits {
                visit,
                outcome: request.await,
            }
        });
    }

    /// Reload the lists shown by the current step.
    pub fn reload(&mut self) {
        let visit = self.visit;
        match &self.state {
            PageState::Lesson => {}
            PageState::Setup(ctrl) => {
                for request in ctrl.load_requests() {
                    self.spawn_setup(request);
                }
            }
            PageState::Limits(ctrl) => {
                let request = ctrl.types_request();
                self.spawn_limits(request);
            }
            PageState::Runtime(ctrl) => {
                let request = ctrl.instances_request();
                self.spawn_message(async move {
                    UiMessage::Instances {
                        visit,
                        result: request.await,
                    }
                });
            }
        }
    }

    /// Run a setup action; any request it builds is sent without waiting.
    pub fn setup_action<F>(&mut self, action: F)
    where
        F: FnOnce(&mut SetupController<A>) -> Option<SetupRequest>,
    {
        if let Some(request) = self.setup_mut().and_then(action) {
            self.spawn_setup(request);
        }
    }

    pub fn limits_action<F>(&mut self, action: F)
    where
        F: FnOnce(&mut LimitsController<A>) -> Option<LimitsRequest>,
    {
        if let Some(request) = self.limits_mut().and_then(action) {
            self.spawn_limits(request);
        }
    }

    /// Issue a control request without waiting for it.
    pub fn control(&mut self, action: ControlAction) {
        let visit = self.visit;
        if let Some(request) = self.runtime_mut().and_then(|c| c.control_request(action)) {
            self.spawn_message(async move {
                UiMessage::Control {
                    visit,
                    outcome: request.await,
                }
            });
        }
    }

    /// Route a spawned response back to the step that asked for it.
    pub fn apply_message(&mut self, msg: UiMessage) {
        let visit = msg.visit();
        if visit != self.visit {
            tracing::debug!(visit, current = self.visit, "dropping response from an earlier visit");
            return;
        }
        let follow_up = match (&mut self.state, msg) {
            (PageState::Runtime(ctrl), UiMessage::Instances { result, .. }) => {
                ctrl.apply_instances(result);
                None
            }
            (PageState::Runtime(ctrl), UiMessage::Control { outcome, .. }) => {
                ctrl.apply_outcome(outcome);
                None
            }
            (PageState::Setup(ctrl), UiMessage::Setup { outcome, .. }) => {
                ctrl.apply(outcome);
                None
            }
            (PageState::Limits(ctrl), UiMessage::Limits { outcome, .. }) => ctrl.apply(outcome),
            (_, msg) => {
                tracing::debug!(?msg, "dropping response for another step");
                None
            }
        };
        if let Some(request) = follow_up {
            self.spawn_limits(request);
        }
    }

    pub fn apply_update(&mut self, update: SimUpdate) {
        if let Some(ctrl) = self.runtime_mut() {
            ctrl.apply_update(update);
        }
    }

    fn enter(&mut self, page: Page) {
        self.visit += 1;
        self.state = match page {
            Page::Welcome | Page::Tiers => PageState::Lesson,
            Page::Setup => PageState::Setup(SetupController::new(
                self.api.clone(),
                self.registration.clone(),
            )),
            Page::Limits => PageState::Limits(LimitsController::new(self.api.clone())),
            Page::Runtime => {
                let mut controller = SimulationController::new(
                    self.api.clone(),
                    self.settings.clone(),
                    self.updates_tx.clone(),
                );
                if let Some(id) = self.preselect.as_deref() {
                    controller.select_instance(id);
                }
                PageState::Runtime(controller)
            }
        };
        tracing::info!(visit = self.visit, page = page.fragment(), "step opened");
        self.reload();
    }

    fn leave(&mut self) {
        if let PageState::Runtime(mut ctrl) = std::mem::replace(&mut self.state, PageState::Lesson)
        {
            ctrl.teardown();
            tracing::info!(visit = self.visit, "runtime dashboard closed");
        }
    }

    pub fn shutdown(&mut self) {
        self.leave();
        self.active = None;
    }
}

#[async_trait]
impl<A: TutorialApi> PageRenderer for Pages<A> {
    async fn render(&mut self, page: Page) -> anyhow::Result<()> {
        if self.active == Some(page) {
            return Ok(());
        }
        self.leave();
        self.enter(page);
        self.active = Some(page);
        Ok(())
    }
}
