use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Parameters for one simulation run plus the client-side polling cadence.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub iterations: u32,
    pub interval_ms: u64,
    pub features_to_call: Vec<String>,
    pub call_pattern: BTreeMap<String, u32>,
    pub status_interval: Duration,
    pub events_interval: Duration,
    pub export_dir: PathBuf,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            iterations: 100,
            interval_ms: 500,
            features_to_call: Vec::new(),
            call_pattern: BTreeMap::new(),
            status_interval: Duration::from_millis(500),
            events_interval: Duration::from_millis(1000),
            export_dir: PathBuf::from("."),
        }
    }
}

impl SimulationSettings {
    pub fn start_request(&self, instance_id: &str) -> StartRequest {
        StartRequest {
            instance_id: instance_id.to_string(),
            iterations: self.iterations,
            interval_ms: self.interval_ms,
            features_to_call: self.features_to_call.clone(),
            call_pattern: self.call_pattern.clone(),
        }
    }
}

/// A registered SDK instance as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub registered_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstancesResponse {
    #[serde(default)]
    pub instances: Option<Vec<Instance>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    pub instance_id: String,
    pub iterations: u32,
    pub interval_ms: u64,
    pub features_to_call: Vec<String>,
    pub call_pattern: BTreeMap<String, u32>,
}

/// Response body shared by start, pause and stop.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Accepted control request, as reported back by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlAck {
    pub status: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl SimStatus {
    pub fn label(self) -> &'static str {
        match self {
            SimStatus::Idle => "idle",
            SimStatus::Running => "running",
            SimStatus::Paused => "paused",
            SimStatus::Stopped => "stopped",
            SimStatus::Completed => "completed",
            SimStatus::Error => "error",
            SimStatus::Unknown => "unknown",
        }
    }

    /// The server will not make further progress on its own.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            SimStatus::Stopped | SimStatus::Completed | SimStatus::Error
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    #[serde(default)]
    pub total_iterations: u64,
    #[serde(default)]
    pub completed_iterations: u64,
    #[serde(default)]
    pub elapsed_seconds: f64,
    #[serde(default)]
    pub estimated_remaining_seconds: f64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    // The backend encodes empty maps as null.
    #[serde(default)]
    pub current_tps: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub quota_remaining: Option<BTreeMap<String, i64>>,
    #[serde(default)]
    pub feature_calls: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub status: SimStatus,
    #[serde(default)]
    pub metrics: SimulationMetrics,
    #[serde(default)]
    pub error: Option<String>,
}

/// One status poll result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub status: SimStatus,
    pub metrics: SimulationMetrics,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SimulationStart,
    SimulationStop,
    SimulationPause,
    SimulationResume,
    SimulationComplete,
    IterationStart,
    #[default]
    FeatureCall,
    Error,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    #[serde(default)]
    pub iteration: u64,
    #[serde(default)]
    pub feature_id: String,
    #[serde(default)]
    pub allowed: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub events: Option<Vec<SimulationEvent>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// How the setup step registers new instances.
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    pub version: String,
    /// Overrides the server's configured LCC address for this registration.
    pub lcc_url: Option<String>,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            version: "1.0.0".into(),
            lcc_url: None,
        }
    }
}

/// A product known to the license server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Product {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterRequest {
    pub product_id: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lcc_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub registered_at: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTestRequest {
    pub product_id: String,
    pub instance_id: String,
    pub feature_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureTestResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub feature_id: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of checking one feature against an instance's license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureCheck {
    pub instance_id: String,
    pub feature_id: String,
    pub enabled: bool,
    pub reason: String,
}

/// Clearing without an instance id removes every instance of the product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearRequest {
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// One of the limit kinds a license can carry, as described by the server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LimitType {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sdk_api: String,
    #[serde(default)]
    pub tracking: String,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default)]
    pub time_dimension: String,
    #[serde(default)]
    pub who_tracks: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BehaviorRow {
    #[serde(default)]
    pub call: String,
    #[serde(default)]
    pub allowed: String,
    #[serde(default)]
    pub remaining: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LimitExample {
    #[serde(default)]
    pub license_config: String,
    #[serde(default)]
    pub code_example: String,
    #[serde(default)]
    pub behavior_table: Vec<BehaviorRow>,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitSimulationRequest {
    pub feature_id: String,
    pub iterations: u32,
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl LimitSimulationRequest {
    /// The demo license each limit kind is simulated against.
    pub fn for_kind(kind: &str, iterations: u32) -> Self {
        let params = match kind {
            "quota" => serde_json::json!({ "max": 10000, "amount": 1 }),
            "tps" => serde_json::json!({ "max_tps": 10.0 }),
            "capacity" => serde_json::json!({ "max_capacity": 50 }),
            "concurrency" => serde_json::json!({ "max_concurrency": 10 }),
            _ => serde_json::json!({}),
        };
        Self {
            feature_id: format!("{kind}_feature"),
            iterations,
            params: match params {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LimitCallResult {
    #[serde(default)]
    pub iteration: u32,
    #[serde(default)]
    pub allowed: bool,
    #[serde(default)]
    pub remaining: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitSimulationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub results: Option<Vec<LimitCallResult>>,
    #[serde(default)]
    pub summary: String,
}

/// A finished limit simulation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LimitSimulation {
    pub kind: String,
    pub results: Vec<LimitCallResult>,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_tolerates_null_maps_and_unknown_status() {
        let body = r#"{
            "success": true,
            "status": "warming_up",
            "metrics": {
                "total_iterations": 50,
                "completed_iterations": 25,
                "success_count": 20,
                "failure_count": 5,
                "elapsed_seconds": 5.5,
                "estimated_remaining_seconds": 5.5,
                "current_tps": null,
                "quota_remaining": {"export": 7},
                "feature_calls": null
            }
        }"#;
        let parsed: StatusResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.status, SimStatus::Unknown);
        assert_eq!(parsed.metrics.completed_iterations, 25);
        assert_eq!(parsed.metrics.current_tps, None);
        assert_eq!(
            parsed.metrics.quota_remaining.unwrap().get("export"),
            Some(&7)
        );
    }

    #[test]
    fn events_response_reads_type_field() {
        let body = r#"{
            "success": true,
            "events": [
                {"type": "feature_call", "iteration": 3, "feature_id": "report", "allowed": false, "reason": "quota exceeded"},
                {"type": "simulation_pause", "allowed": false, "reason": "", "details": "Paused at iteration 3"}
            ],
            "count": 2
        }"#;
        let parsed: EventsResponse = serde_json::from_str(body).unwrap();
        let events = parsed.events.unwrap();
        assert_eq!(events[0].kind, EventKind::FeatureCall);
        assert_eq!(events[0].reason, "quota exceeded");
        assert_eq!(events[1].kind, EventKind::SimulationPause);
        assert_eq!(events[1].iteration, 0);
    }

    #[test]
    fn start_request_carries_settings() {
        let settings = SimulationSettings {
            iterations: 50,
            interval_ms: 200,
            features_to_call: vec!["report".into()],
            ..Default::default()
        };
        let req = settings.start_request("abc123");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["instance_id"], "abc123");
        assert_eq!(json["iterations"], 50);
        assert_eq!(json["interval_ms"], 200);
        assert_eq!(json["features_to_call"][0], "report");
    }

    #[test]
    fn register_request_omits_unset_lcc_url() {
        let req = RegisterRequest {
            product_id: "demo-app".into(),
            version: "1.0.0".into(),
            lcc_url: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"product_id": "demo-app", "version": "1.0.0"}));
    }

    #[test]
    fn product_name_falls_back_to_id() {
        let products: Vec<Product> =
            serde_json::from_str(r#"[{"id":"demo-app","name":"Demo App"},{"id":"bare"},{"id":"blank","name":" "}]"#)
                .unwrap();
        let names: Vec<&str> = products.iter().map(Product::display_name).collect();
        assert_eq!(names, vec!["Demo App", "bare", "blank"]);
    }

    #[test]
    fn limit_simulation_uses_demo_license_per_kind() {
        let req = LimitSimulationRequest::for_kind("quota", 10);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["feature_id"], "quota_feature");
        assert_eq!(json["iterations"], 10);
        assert_eq!(json["params"]["max"], 10000);
        assert_eq!(json["params"]["amount"], 1);

        let req = LimitSimulationRequest::for_kind("concurrency", 5);
        assert_eq!(req.params["max_concurrency"], 10);
        assert!(LimitSimulationRequest::for_kind("unknown", 5).params.is_empty());
    }

    #[test]
    fn limit_types_read_type_field() {
        let body = r#"[{"type":"tps","name":"TPS (Rate Limit)","sdk_api":"CheckTPS(featureID, currentTPS)","use_cases":["API rate limiting"]}]"#;
        let types: Vec<LimitType> = serde_json::from_str(body).unwrap();
        assert_eq!(types[0].kind, "tps");
        assert_eq!(types[0].use_cases.len(), 1);
        assert_eq!(types[0].description, "");
    }
}
