use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;
use common_auth::{AllowAll, AuthState, AuthorizationHook, Claims, JwtVerifier, RequireClaim};
use common_http_errors::ApiError;
use common_observability::AuthMetrics;
use common_pipeline::Endpoint;

use crate::config::GatewayConfig;
use crate::endpoints::build_endpoints;

#[derive(Clone)]
pub struct AppState {
    pub endpoints: Arc<HashMap<String, Endpoint>>,
    pub auth: AuthState,
    pub metrics: Arc<AuthMetrics>,
}

impl AppState {
    pub fn new(config: &GatewayConfig, verifier: Arc<JwtVerifier>, metrics: Arc<AuthMetrics>) -> Self {
        let policy: Arc<dyn AuthorizationHook> = match &config.required_claim {
            Some(claim) => Arc::new(RequireClaim::new(claim.clone())),
            None => Arc::new(AllowAll),
        };
        let hook: Arc<dyn AuthorizationHook> = Arc::new(MeteredHook {
            inner: policy,
            metrics: Arc::clone(&metrics),
        });
        let endpoints = build_endpoints(
            Arc::clone(&verifier),
            Arc::clone(&hook),
            config.endpoint_timeouts.clone(),
        );

        Self {
            endpoints: Arc::new(endpoints),
            auth: AuthState::new(verifier, hook),
            metrics,
        }
    }

    pub fn endpoint(&self, method: &str) -> Option<Endpoint> {
        self.endpoints.get(method).cloned()
    }
}

/// Counts hook decisions before handing the verdict back unchanged.
struct MeteredHook {
    inner: Arc<dyn AuthorizationHook>,
    metrics: Arc<AuthMetrics>,
}

#[async_trait]
impl AuthorizationHook for MeteredHook {
    async fn authorize(&self, parts: &Parts, claims: &Claims) -> Result<(), ApiError> {
        let verdict = self.inner.authorize(parts, claims).await;
        let outcome = if verdict.is_ok() { "allowed" } else { "denied" };
        self.metrics.auth_outcome(outcome);
        verdict
    }
}
