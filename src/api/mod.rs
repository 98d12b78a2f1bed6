//! Backend contract for the tutorial server.
//!
//! The server owns all licensing logic and the simulation itself; this side only
//! issues control requests and reads progress.

mod error;
#[cfg(test)]
pub(crate) mod fake;
mod http;

pub use error::ApiError;
pub use http::HttpApi;

use crate::model::{
    ClearRequest, ControlAck, FeatureCheck, FeatureTestRequest, Instance, LimitExample,
    LimitSimulation, LimitSimulationRequest, LimitType, Product, RegisterRequest,
    SimulationEvent, StartRequest, StatusSnapshot,
};
use async_trait::async_trait;

/// Server-side cap on the events window requested by each poll.
pub const EVENT_FETCH_LIMIT: usize = 100;

#[async_trait]
pub trait SimulationApi: Send + Sync + 'static {
    async fn list_instances(&self) -> Result<Vec<Instance>, ApiError>;

    async fn start(&self, req: &StartRequest) -> Result<ControlAck, ApiError>;

    async fn pause(&self, instance_id: &str) -> Result<ControlAck, ApiError>;

    async fn stop(&self, instance_id: &str) -> Result<ControlAck, ApiError>;

    async fn status(&self, instance_id: &str) -> Result<StatusSnapshot, ApiError>;

    /// Most recent events, oldest first, at most `limit` of them.
    async fn events(
        &self,
        instance_id: &str,
        limit: usize,
    ) -> Result<Vec<SimulationEvent>, ApiError>;

    /// Point-in-time snapshot, returned verbatim.
    async fn export(&self, instance_id: &str) -> Result<serde_json::Value, ApiError>;
}

/// Endpoints behind the lesson steps: instance registration on the setup step
/// and the limit walkthrough.
#[async_trait]
pub trait LessonApi: Send + Sync + 'static {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError>;

    async fn register_instance(&self, req: &RegisterRequest) -> Result<Instance, ApiError>;

    async fn test_instance(&self, req: &FeatureTestRequest) -> Result<FeatureCheck, ApiError>;

    async fn clear_instance(&self, req: &ClearRequest) -> Result<ControlAck, ApiError>;

    async fn limit_types(&self) -> Result<Vec<LimitType>, ApiError>;

    async fn limit_example(&self, kind: &str) -> Result<LimitExample, ApiError>;

    async fn simulate_limit(
        &self,
        kind: &str,
        req: &LimitSimulationRequest,
    ) -> Result<LimitSimulation, ApiError>;
}

/// The whole tutorial backend.
pub trait TutorialApi: SimulationApi + LessonApi {}

impl<T: SimulationApi + LessonApi> TutorialApi for T {}
