use super::{ApiError, LessonApi, SimulationApi};
use crate::model::{
    ClearRequest, ControlAck, ControlResponse, EventsResponse, FeatureCheck, FeatureTestRequest,
    FeatureTestResponse, Instance, InstancesResponse, LimitExample, LimitSimulation,
    LimitSimulationRequest, LimitSimulationResponse, LimitType, Product, RegisterRequest,
    RegisterResponse, SimulationEvent, StartRequest, StatusResponse, StatusSnapshot,
};
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// reqwest-backed client for the tutorial server's JSON API.
#[derive(Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, ApiError> {
        // `Url::join` drops the last path segment unless the base ends with '/'.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str, instance_id: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))?;
        if let Some(id) = instance_id {
            url.query_pairs_mut().append_pair("instance_id", id);
        }
        Ok(url)
    }

    fn events_url(&self, instance_id: &str, limit: usize) -> Result<Url, ApiError> {
        let mut url = self.endpoint("api/simulation/events", Some(instance_id))?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        Ok(url)
    }

    /// `api/limits/{kind}/{action}` with `kind` as a single escaped segment.
    fn limit_url(&self, kind: &str, action: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint("api/limits/", None)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(kind)
            .push(action);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn control(&self, action: &str, instance_id: &str) -> Result<ControlAck, ApiError> {
        let url = self.endpoint(&format!("api/simulation/{action}"), Some(instance_id))?;
        tracing::debug!(%url, "control request");
        let resp: ControlResponse = self.send(self.http.request(Method::POST, url)).await?;
        into_ack(resp, action)
    }
}

fn into_snapshot(resp: StatusResponse) -> Result<StatusSnapshot, ApiError> {
    if !resp.success {
        return Err(ApiError::rejected(resp.error, "status unavailable"));
    }
    Ok(StatusSnapshot {
        status: resp.status,
        metrics: resp.metrics,
    })
}

fn into_events(resp: EventsResponse) -> Result<Vec<SimulationEvent>, ApiError> {
    if !resp.success {
        return Err(ApiError::rejected(resp.error, "events unavailable"));
    }
    Ok(resp.events.unwrap_or_default())
}

/// The snapshot is passed through untouched unless it reports `success: false`.
fn check_export(snapshot: serde_json::Value) -> Result<serde_json::Value, ApiError> {
    if snapshot.get("success").and_then(|v| v.as_bool()) == Some(false) {
        let error = snapshot
            .get("error")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        return Err(ApiError::rejected(error, "export rejected by server"));
    }
    Ok(snapshot)
}

fn into_instance(resp: RegisterResponse) -> Result<Instance, ApiError> {
    if !resp.success {
        return Err(ApiError::rejected(resp.error, "registration rejected by server"));
    }
    if resp.instance_id.trim().is_empty() {
        return Err(ApiError::Rejected("server returned no instance id".into()));
    }
    Ok(Instance {
        instance_id: resp.instance_id,
        product_id: resp.product_id,
        version: resp.version,
        registered_at: resp.registered_at,
    })
}

fn into_check(
    resp: FeatureTestResponse,
    req: &FeatureTestRequest,
) -> Result<FeatureCheck, ApiError> {
    if !resp.success {
        return Err(ApiError::rejected(resp.error, "feature check rejected by server"));
    }
    Ok(FeatureCheck {
        instance_id: req.instance_id.clone(),
        feature_id: if resp.feature_id.is_empty() {
            req.feature_id.clone()
        } else {
            resp.feature_id
        },
        enabled: resp.enabled,
        reason: resp.reason,
    })
}

fn into_limit_simulation(resp: LimitSimulationResponse) -> Result<LimitSimulation, ApiError> {
    if !resp.success {
        // The summary carries the failure reason, e.g. "Unknown limit type".
        return Err(ApiError::rejected(Some(resp.summary), "simulation failed"));
    }
    Ok(LimitSimulation {
        kind: resp.kind,
        results: resp.results.unwrap_or_default(),
        summary: resp.summary,
    })
}

fn into_ack(resp: ControlResponse, action: &str) -> Result<ControlAck, ApiError> {
    if !resp.success {
        return Err(ApiError::rejected(resp.error, &format!("{action} rejected by server")));
    }
    Ok(ControlAck {
        status: resp.status,
        message: resp.message,
    })
}

#[async_trait]
impl SimulationApi for HttpApi {
    async fn list_instances(&self) -> Result<Vec<Instance>, ApiError> {
        let url = self.endpoint("api/instances", None)?;
        let resp: InstancesResponse = self.send(self.http.get(url)).await?;
        Ok(resp.instances.unwrap_or_default())
    }

    async fn start(&self, req: &StartRequest) -> Result<ControlAck, ApiError> {
        let url = self.endpoint("api/simulation/start", None)?;
        tracing::debug!(%url, instance = %req.instance_id, iterations = req.iterations, "start request");
        let resp: ControlResponse = self.send(self.http.post(url).json(req)).await?;
        into_ack(resp, "start")
    }

    async fn pause(&self, instance_id: &str) -> Result<ControlAck, ApiError> {
        self.control("pause", instance_id).await
    }

    async fn stop(&self, instance_id: &str) -> Result<ControlAck, ApiError> {
        self.control("stop", instance_id).await
    }

    async fn status(&self, instance_id: &str) -> Result<StatusSnapshot, ApiError> {
        let url = self.endpoint("api/simulation/status", Some(instance_id))?;
        into_snapshot(self.send(self.http.get(url)).await?)
    }

    async fn events(
        &self,
        instance_id: &str,
        limit: usize,
    ) -> Result<Vec<SimulationEvent>, ApiError> {
        let url = self.events_url(instance_id, limit)?;
        into_events(self.send(self.http.get(url)).await?)
    }

    async fn export(&self, instance_id: &str) -> Result<serde_json::Value, ApiError> {
        let url = self.endpoint("api/simulation/export", Some(instance_id))?;
        check_export(self.send(self.http.post(url)).await?)
    }
}

#[async_trait]
impl LessonApi for HttpApi {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let url = self.endpoint("api/products", None)?;
        self.send(self.http.get(url)).await
    }

    async fn register_instance(&self, req: &RegisterRequest) -> Result<Instance, ApiError> {
        let url = self.endpoint("api/instance/register", None)?;
        tracing::debug!(%url, product = %req.product_id, version = %req.version, "register request");
        into_instance(self.send(self.http.post(url).json(req)).await?)
    }

    async fn test_instance(&self, req: &FeatureTestRequest) -> Result<FeatureCheck, ApiError> {
        let url = self.endpoint("api/instance/test", None)?;
        into_check(self.send(self.http.post(url).json(req)).await?, req)
    }

    async fn clear_instance(&self, req: &ClearRequest) -> Result<ControlAck, ApiError> {
        let url = self.endpoint("api/instance/clear", None)?;
        tracing::debug!(%url, product = %req.product_id, instance = ?req.instance_id, "clear request");
        into_ack(self.send(self.http.post(url).json(req)).await?, "clear")
    }

    async fn limit_types(&self) -> Result<Vec<LimitType>, ApiError> {
        let url = self.endpoint("api/limits/types", None)?;
        self.send(self.http.get(url)).await
    }

    async fn limit_example(&self, kind: &str) -> Result<LimitExample, ApiError> {
        let url = self.limit_url(kind, "example")?;
        self.send(self.http.get(url)).await
    }

    async fn simulate_limit(
        &self,
        kind: &str,
        req: &LimitSimulationRequest,
    ) -> Result<LimitSimulation, ApiError> {
        let url = self.limit_url(kind, "simulate")?;
        tracing::debug!(%url, iterations = req.iterations, "limit simulation request");
        into_limit_simulation(self.send(self.http.post(url).json(req)).await?)
    }
}
