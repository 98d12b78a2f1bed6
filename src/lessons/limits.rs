use crate::api::{ApiError, LessonApi};
use crate::model::{LimitExample, LimitSimulation, LimitSimulationRequest, LimitType};
use crate::simulation::Alert;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;

pub const DEFAULT_ITERATIONS: u32 = 10;
/// The server clamps simulations to this many iterations.
pub const MAX_ITERATIONS: u32 = 100;

#[derive(Debug, Clone)]
pub struct LimitsView {
    pub types: Vec<LimitType>,
    pub types_loaded: bool,
    pub current: usize,
    pub example: Option<LimitExample>,
    pub iterations: u32,
    pub simulation: Option<LimitSimulation>,
    pub simulating: bool,
    pub alert: Option<Alert>,
}

impl Default for LimitsView {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            types_loaded: false,
            current: 0,
            example: None,
            iterations: DEFAULT_ITERATIONS,
            simulation: None,
            simulating: false,
            alert: None,
        }
    }
}

impl LimitsView {
    pub fn current_type(&self) -> Option<&LimitType> {
        self.types.get(self.current)
    }
}

#[derive(Debug)]
pub enum LimitsOutcome {
    Types(Result<Vec<LimitType>, ApiError>),
    Example {
        kind: String,
        result: Result<LimitExample, ApiError>,
    },
    Simulated {
        kind: String,
        result: Result<LimitSimulation, ApiError>,
    },
}

pub type LimitsRequest = BoxFuture<'static, LimitsOutcome>;

/// State of the limits step. Example and simulation responses for a type
/// other than the one shown are dropped.
pub struct LimitsController<A: LessonApi> {
    api: Arc<A>,
    view: LimitsView,
}

impl<A: LessonApi> LimitsController<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            view: LimitsView::default(),
        }
    }

    pub fn view(&self) -> &LimitsView {
        &self.view
    }

    pub fn clear_alert(&mut self) {
        self.view.alert = None;
    }

    fn current_kind(&self) -> Option<String> {
        self.view.current_type().map(|t| t.kind.clone())
    }

    pub fn types_request(&self) -> LimitsRequest {
        let api = self.api.clone();
        async move { LimitsOutcome::Types(api.limit_types().await) }.boxed()
    }

    fn example_request(&self) -> Option<LimitsRequest> {
        let kind = self.current_kind()?;
        let api = self.api.clone();
        Some(
            async move {
                let result = api.limit_example(&kind).await;
                LimitsOutcome::Example { kind, result }
            }
            .boxed(),
        )
    }

    /// Show the previous or next limit type. Returns the request for its example.
    pub fn select(&mut self, delta: isize) -> Option<LimitsRequest> {
        let len = self.view.types.len();
        if len == 0 {
            return None;
        }
        let next = (self.view.current as isize + delta).rem_euclid(len as isize) as usize;
        if next == self.view.current {
            return None;
        }
        self.view.current = next;
        self.view.example = None;
        self.view.simulation = None;
        self.view.simulating = false;
        self.example_request()
    }

    pub fn adjust_iterations(&mut self, delta: i64) {
        let next = i64::from(self.view.iterations) + delta;
        self.view.iterations = next.clamp(1, i64::from(MAX_ITERATIONS)) as u32;
    }

    pub fn simulate_request(&mut self) -> Option<LimitsRequest> {
        let Some(kind) = self.current_kind() else {
            self.view.alert = Some(Alert::Error("Limit types are not loaded yet".into()));
            return None;
        };
        let req = LimitSimulationRequest::for_kind(&kind, self.view.iterations);
        tracing::info!(kind = %kind, iterations = req.iterations, "limit simulation");
        self.view.simulating = true;
        let api = self.api.clone();
        Some(
            async move {
                let result = api.simulate_limit(&kind, &req).await;
                LimitsOutcome::Simulated { kind, result }
            }
            .boxed(),
        )
    }

    /// Apply a response. Returns a follow-up request when one is due.
    pub fn apply(&mut self, outcome: LimitsOutcome) -> Option<LimitsRequest> {
        match outcome {
            LimitsOutcome::Types(Ok(types)) => {
                tracing::debug!(count = types.len(), "limit types loaded");
                self.view.types = types;
                self.view.types_loaded = true;
                self.view.current = self.view.current.min(self.view.types.len().saturating_sub(1));
                self.view.example = None;
                return self.example_request();
            }
            LimitsOutcome::Types(Err(e)) => {
                tracing::warn!(error = %e, "failed to load limit types");
                self.view.types_loaded = true;
                self.view.alert = Some(Alert::Error(format!("Failed to load limit types: {e}")));
            }
            LimitsOutcome::Example { kind, .. } | LimitsOutcome::Simulated { kind, .. }
                if self.current_kind().as_deref() != Some(kind.as_str()) =>
            {
                tracing::debug!(kind = %kind, "dropping response for a limit type no longer shown");
            }
            LimitsOutcome::Example { result, .. } => match result {
                Ok(example) => self.view.example = Some(example),
                Err(e) => {
                    self.view.alert = Some(Alert::Error(format!("Failed to load example: {e}")));
                }
            },
            LimitsOutcome::Simulated { result, .. } => {
                self.view.simulating = false;
                match result {
                    Ok(sim) => {
                        self.view.alert = Some(Alert::Success(sim.summary.clone()));
                        self.view.simulation = Some(sim);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "limit simulation failed");
                        self.view.alert = Some(Alert::Error(format!("Simulation failed: {e}")));
                    }
                }
            }
        }
        None
    }
}
