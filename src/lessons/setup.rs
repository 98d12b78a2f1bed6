use crate::api::{ApiError, TutorialApi};
use crate::model::{
    ClearRequest, ControlAck, FeatureCheck, FeatureTestRequest, Instance, Product,
    RegisterRequest, RegistrationSettings,
};
use crate::simulation::Alert;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;

/// Features of the demo product line, in tier order.
pub const TEST_FEATURES: [&str; 6] = [
    "basic_reports",
    "ml_analytics",
    "pdf_export",
    "api_access",
    "excel_export",
    "custom_dashboard",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetupFocus {
    #[default]
    Products,
    Instances,
}

#[derive(Debug, Clone, Default)]
pub struct SetupView {
    pub products: Vec<Product>,
    pub products_loaded: bool,
    pub product_cursor: usize,
    pub instances: Vec<Instance>,
    pub instances_loaded: bool,
    pub instance_cursor: usize,
    pub focus: SetupFocus,
    /// Index into `TEST_FEATURES`.
    pub feature: usize,
    pub last_check: Option<FeatureCheck>,
    pub alert: Option<Alert>,
}

impl SetupView {
    pub fn selected_product(&self) -> Option<&Product> {
        self.products.get(self.product_cursor)
    }

    pub fn selected_instance(&self) -> Option<&Instance> {
        self.instances.get(self.instance_cursor)
    }

    pub fn feature_id(&self) -> &'static str {
        TEST_FEATURES[self.feature % TEST_FEATURES.len()]
    }
}

#[derive(Debug)]
pub enum SetupOutcome {
    Products(Result<Vec<Product>, ApiError>),
    Instances(Result<Vec<Instance>, ApiError>),
    Registered {
        product_id: String,
        result: Result<Instance, ApiError>,
    },
    Tested(Result<FeatureCheck, ApiError>),
    Cleared {
        instance_id: String,
        result: Result<ControlAck, ApiError>,
    },
}

pub type SetupRequest = BoxFuture<'static, SetupOutcome>;

fn clamp_cursor(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

fn step(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (cursor as isize + delta).clamp(0, len as isize - 1) as usize
}

/// State of the setup step: pick a product, register instances of it, then
/// check features against or delete a registered instance.
pub struct SetupController<A: TutorialApi> {
    api: Arc<A>,
    registration: RegistrationSettings,
    view: SetupView,
}

impl<A: TutorialApi> SetupController<A> {
    pub fn new(api: Arc<A>, registration: RegistrationSettings) -> Self {
        Self {
            api,
            registration,
            view: SetupView::default(),
        }
    }

    pub fn view(&self) -> &SetupView {
        &self.view
    }

    pub fn clear_alert(&mut self) {
        self.view.alert = None;
    }

    /// Products and instances load independently; either may fail alone.
    pub fn load_requests(&self) -> [SetupRequest; 2] {
        let products = self.api.clone();
        let instances = self.api.clone();
        [
            async move { SetupOutcome::Products(products.list_products().await) }.boxed(),
            async move { SetupOutcome::Instances(instances.list_instances().await) }.boxed(),
        ]
    }

    pub fn toggle_focus(&mut self) {
        self.view.focus = match self.view.focus {
            SetupFocus::Products => SetupFocus::Instances,
            SetupFocus::Instances => SetupFocus::Products,
        };
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let v = &mut self.view;
        match v.focus {
            SetupFocus::Products => v.product_cursor = step(v.product_cursor, delta, v.products.len()),
            SetupFocus::Instances => {
                v.instance_cursor = step(v.instance_cursor, delta, v.instances.len())
            }
        }
    }

    pub fn cycle_feature(&mut self) {
        self.view.feature = (self.view.feature + 1) % TEST_FEATURES.len();
    }

    pub fn register_request(&mut self) -> Option<SetupRequest> {
        let Some(product) = self.view.selected_product() else {
            self.view.alert = Some(Alert::Error("Select a product first".into()));
            return None;
        };
        let req = RegisterRequest {
            product_id: product.id.clone(),
            version: self.registration.version.clone(),
            lcc_url: self.registration.lcc_url.clone(),
        };
        tracing::info!(product = %req.product_id, version = %req.version, "registering instance");
        let api = self.api.clone();
        Some(
            async move {
                let result = api.register_instance(&req).await;
                SetupOutcome::Registered {
                    product_id: req.product_id,
                    result,
                }
            }
            .boxed(),
        )
    }

    pub fn test_request(&mut self) -> Option<SetupRequest> {
        let Some(instance) = self.view.selected_instance() else {
            self.view.alert = Some(Alert::Error("Select an instance first".into()));
            return None;
        };
        let req = FeatureTestRequest {
            product_id: instance.product_id.clone(),
            instance_id: instance.instance_id.clone(),
            feature_id: self.view.feature_id().to_string(),
        };
        tracing::debug!(instance = %req.instance_id, feature = %req.feature_id, "feature check");
        let api = self.api.clone();
        Some(async move { SetupOutcome::Tested(api.test_instance(&req).await) }.boxed())
    }

    pub fn clear_request(&mut self) -> Option<SetupRequest> {
        let Some(instance) = self.view.selected_instance() else {
            self.view.alert = Some(Alert::Error("Select an instance first".into()));
            return None;
        };
        let instance_id = instance.instance_id.clone();
        let req = ClearRequest {
            product_id: instance.product_id.clone(),
            instance_id: Some(instance_id.clone()),
        };
        tracing::info!(instance = %instance_id, "deleting instance");
        let api = self.api.clone();
        Some(
            async move {
                let result = api.clear_instance(&req).await;
                SetupOutcome::Cleared {
                    instance_id,
                    result,
                }
            }
            .boxed(),
        )
    }

    pub fn apply(&mut self, outcome: SetupOutcome) {
        let v = &mut self.view;
        match outcome {
            SetupOutcome::Products(Ok(products)) => {
                tracing::debug!(count = products.len(), "products loaded");
                v.product_cursor = clamp_cursor(v.product_cursor, products.len());
                v.products = products;
                v.products_loaded = true;
            }
            SetupOutcome::Products(Err(e)) => {
                tracing::warn!(error = %e, "failed to load products");
                v.products_loaded = true;
                v.alert = Some(Alert::Error(format!(
                    "Failed to load products: {e}. Configure the LCC URL on the server first."
                )));
            }
            SetupOutcome::Instances(Ok(instances)) => {
                v.instance_cursor = clamp_cursor(v.instance_cursor, instances.len());
                v.instances = instances;
                v.instances_loaded = true;
            }
            SetupOutcome::Instances(Err(e)) => {
                tracing::warn!(error = %e, "failed to load instances");
                v.instances_loaded = true;
                v.alert = Some(Alert::Error(format!("Failed to load instances: {e}")));
            }
            SetupOutcome::Registered {
                product_id,
                result: Ok(instance),
            } => {
                tracing::info!(instance = %instance.instance_id, product = %product_id, "instance registered");
                v.alert = Some(Alert::Success(format!(
                    "Registered {} for {product_id}",
                    instance.instance_id
                )));
                v.instance_cursor = match v
                    .instances
                    .iter()
                    .position(|i| i.instance_id == instance.instance_id)
                {
                    Some(idx) => idx,
                    None => {
                        v.instances.push(instance);
                        v.instances.len() - 1
                    }
                };
                v.instances_loaded = true;
            }
            SetupOutcome::Registered {
                product_id,
                result: Err(e),
            } => {
                tracing::warn!(product = %product_id, error = %e, "registration failed");
                v.alert = Some(Alert::Error(format!("Registration of {product_id} failed: {e}")));
            }
            SetupOutcome::Tested(Ok(check)) => {
                if !v.instances.iter().any(|i| i.instance_id == check.instance_id) {
                    tracing::debug!(instance = %check.instance_id, "dropping check for a deleted instance");
                    return;
                }
                let verdict = if check.enabled { "allowed" } else { "denied" };
                v.alert = Some(Alert::Success(format!(
                    "{}: {verdict} ({})",
                    check.feature_id, check.reason
                )));
                v.last_check = Some(check);
            }
            SetupOutcome::Tested(Err(e)) => {
                v.alert = Some(Alert::Error(format!("Test failed: {e}")));
            }
            SetupOutcome::Cleared {
                instance_id,
                result: Ok(_),
            } => {
                tracing::info!(instance = %instance_id, "instance deleted");
                v.instances.retain(|i| i.instance_id != instance_id);
                v.instance_cursor = clamp_cursor(v.instance_cursor, v.instances.len());
                if v.last_check.as_ref().map(|c| c.instance_id.as_str()) == Some(instance_id.as_str()) {
                    v.last_check = None;
                }
                v.alert = Some(Alert::Success(format!("Deleted {instance_id}")));
            }
            SetupOutcome::Cleared {
                instance_id,
                result: Err(e),
            } => {
                tracing::warn!(instance = %instance_id, error = %e, "delete failed");
                v.alert = Some(Alert::Error(format!("Delete failed: {e}")));
            }
        }
    }
}
