//! Scripted in-memory backend for controller tests.

use super::{ApiError, LessonApi, SimulationApi};
use crate::model::{
    ClearRequest, ControlAck, FeatureCheck, FeatureTestRequest, Instance, LimitCallResult,
    LimitExample, LimitSimulation, LimitSimulationRequest, LimitType, Product, RegisterRequest,
    SimStatus, SimulationEvent, SimulationMetrics, StartRequest, StatusSnapshot,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct FakeApi {
    pub instances: Mutex<Vec<Instance>>,
    pub snapshot: Mutex<StatusSnapshot>,
    pub events: Mutex<Vec<SimulationEvent>>,
    pub fail_control: AtomicBool,
    pub fail_polls: AtomicBool,
    pub start_requests: Mutex<Vec<StartRequest>>,
    pub status_calls: AtomicUsize,
    pub events_calls: AtomicUsize,
    pub pause_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub products: Mutex<Vec<Product>>,
    pub fail_lessons: AtomicBool,
    pub register_requests: Mutex<Vec<RegisterRequest>>,
    pub test_requests: Mutex<Vec<FeatureTestRequest>>,
    pub clear_requests: Mutex<Vec<ClearRequest>>,
    pub example_requests: Mutex<Vec<String>>,
    pub simulate_requests: Mutex<Vec<(String, LimitSimulationRequest)>>,
    /// Features the fake license enables; every other feature is denied.
    pub enabled_features: Mutex<Vec<String>>,
    next_instance: AtomicUsize,
}

impl FakeApi {
    pub fn with_instances(ids: &[&str]) -> Self {
        let fake = Self::default();
        *fake.instances.lock().unwrap() = ids
            .iter()
            .map(|id| Instance {
                instance_id: id.to_string(),
                product_id: "demo-app".into(),
                version: "1.0.0".into(),
                registered_at: None,
            })
            .collect();
        fake
    }

    pub fn with_products(ids: &[&str]) -> Self {
        let fake = Self::default();
        *fake.products.lock().unwrap() = ids
            .iter()
            .map(|id| Product {
                id: id.to_string(),
                name: None,
            })
            .collect();
        *fake.enabled_features.lock().unwrap() = vec!["basic_reports".into()];
        fake
    }

    fn lesson_failure(&self) -> Result<(), ApiError> {
        if self.fail_lessons.load(Ordering::SeqCst) {
            return Err(ApiError::from_status(502, r#"{"error":"lcc_url not configured"}"#));
        }
        Ok(())
    }

    pub fn set_progress(&self, completed: u64, total: u64, success: u64, failure: u64) {
        *self.snapshot.lock().unwrap() = StatusSnapshot {
            status: SimStatus::Running,
            metrics: SimulationMetrics {
                total_iterations: total,
                completed_iterations: completed,
                success_count: success,
                failure_count: failure,
                ..Default::default()
            },
        };
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn events_calls(&self) -> usize {
        self.events_calls.load(Ordering::SeqCst)
    }

    fn control_result(&self, status: &str) -> Result<ControlAck, ApiError> {
        if self.fail_control.load(Ordering::SeqCst) {
            return Err(ApiError::Rejected("simulation not found".into()));
        }
        Ok(ControlAck {
            status: Some(status.into()),
            message: None,
        })
    }
}

#[async_trait]
impl SimulationApi for FakeApi {
    async fn list_instances(&self) -> Result<Vec<Instance>, ApiError> {
        Ok(self.instances.lock().unwrap().clone())
    }

    async fn start(&self, req: &StartRequest) -> Result<ControlAck, ApiError> {
        self.start_requests.lock().unwrap().push(req.clone());
        self.control_result("running")
    }

    async fn pause(&self, _instance_id: &str) -> Result<ControlAck, ApiError> {
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.control_result("paused")
    }

    async fn stop(&self, _instance_id: &str) -> Result<ControlAck, ApiError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.control_result("stopped")
    }

    async fn status(&self, _instance_id: &str) -> Result<StatusSnapshot, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_polls.load(Ordering::SeqCst) {
            return Err(ApiError::from_status(503, ""));
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn events(
        &self,
        _instance_id: &str,
        limit: usize,
    ) -> Result<Vec<SimulationEvent>, ApiError> {
        self.events_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_polls.load(Ordering::SeqCst) {
            return Err(ApiError::from_status(503, ""));
        }
        let events = self.events.lock().unwrap();
        let start = events.len().saturating_sub(limit);
        Ok(events[start..].to_vec())
    }

    async fn export(&self, instance_id: &str) -> Result<serde_json::Value, ApiError> {
        if self.fail_control.load(Ordering::SeqCst) {
            return Err(ApiError::Rejected("simulation not found".into()));
        }
        Ok(serde_json::json!({
            "success": true,
            "summary": { "instance_id": instance_id, "completed": 25 },
            "events": [],
        }))
    }
}

#[async_trait]
impl LessonApi for FakeApi {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.lesson_failure()?;
        Ok(self.products.lock().unwrap().clone())
    }

    async fn register_instance(&self, req: &RegisterRequest) -> Result<Instance, ApiError> {
        self.register_requests.lock().unwrap().push(req.clone());
        self.lesson_failure()?;
        let n = self.next_instance.fetch_add(1, Ordering::SeqCst) + 1;
        let instance = Instance {
            instance_id: format!("{}-{n}", req.product_id),
            product_id: req.product_id.clone(),
            version: req.version.clone(),
            registered_at: Some("2025-01-01T00:00:00Z".into()),
        };
        self.instances.lock().unwrap().push(instance.clone());
        Ok(instance)
    }

    async fn test_instance(&self, req: &FeatureTestRequest) -> Result<FeatureCheck, ApiError> {
        self.test_requests.lock().unwrap().push(req.clone());
        self.lesson_failure()?;
        let enabled = self
            .enabled_features
            .lock()
            .unwrap()
            .contains(&req.feature_id);
        Ok(FeatureCheck {
            instance_id: req.instance_id.clone(),
            feature_id: req.feature_id.clone(),
            enabled,
            reason: if enabled { "ok" } else { "tier_required" }.into(),
        })
    }

    async fn clear_instance(&self, req: &ClearRequest) -> Result<ControlAck, ApiError> {
        self.clear_requests.lock().unwrap().push(req.clone());
        self.lesson_failure()?;
        self.instances.lock().unwrap().retain(|i| match &req.instance_id {
            Some(id) => &i.instance_id != id,
            None => i.product_id != req.product_id,
        });
        Ok(ControlAck {
            status: None,
            message: Some("Instance cleared successfully".into()),
        })
    }

    async fn limit_types(&self) -> Result<Vec<LimitType>, ApiError> {
        self.lesson_failure()?;
        Ok(["quota", "tps", "capacity", "concurrency"]
            .iter()
            .map(|kind| LimitType {
                kind: kind.to_string(),
                name: kind.to_uppercase(),
                description: format!("{kind} limit"),
                ..Default::default()
            })
            .collect())
    }

    async fn limit_example(&self, kind: &str) -> Result<LimitExample, ApiError> {
        self.example_requests.lock().unwrap().push(kind.to_string());
        self.lesson_failure()?;
        Ok(LimitExample {
            code_example: format!("// {kind} example"),
            key_points: vec![format!("{kind} key point")],
            ..Default::default()
        })
    }

    async fn simulate_limit(
        &self,
        kind: &str,
        req: &LimitSimulationRequest,
    ) -> Result<LimitSimulation, ApiError> {
        self.simulate_requests
            .lock()
            .unwrap()
            .push((kind.to_string(), req.clone()));
        self.lesson_failure()?;
        let results = (1..=req.iterations)
            .map(|iteration| LimitCallResult {
                iteration,
                allowed: iteration % 2 == 1,
                remaining: format!("{}", req.iterations - iteration),
                reason: if iteration % 2 == 1 { "ok" } else { "exceeded" }.into(),
                details: None,
            })
            .collect();
        Ok(LimitSimulation {
            kind: kind.to_string(),
            results,
            summary: format!("Completed {} iterations", req.iterations),
        })
    }
}
