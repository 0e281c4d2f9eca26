use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common_auth::{AuthorizationHook, JwtVerifier};
use common_http_errors::ApiError;
use common_pipeline::{
    handler_fn, AfterHandler, BeforeHandler, Endpoint, EndpointConfig, MaskInternalErrors,
    RequestContext, RequireAuthenticated,
};
use serde_json::{json, Value};

pub const ECHO: &str = "echo";
pub const PROFILE: &str = "profile";

/// Endpoints served under `/rpc/:method`, keyed by method name.
pub fn build_endpoints(
    verifier: Arc<JwtVerifier>,
    hook: Arc<dyn AuthorizationHook>,
    timeouts: HashMap<String, Duration>,
) -> HashMap<String, Endpoint> {
    let after: Vec<Arc<dyn AfterHandler>> = vec![Arc::new(MaskInternalErrors)];
    let base = || {
        EndpointConfig::builder()
            .timeout_map(timeouts.clone())
            .authorization_hook(Arc::clone(&hook))
            .after_handlers(after.clone())
    };

    let echo_config = base().build();
    let profile_config = base()
        .before_handlers(vec![Arc::new(RequireAuthenticated) as Arc<dyn BeforeHandler>])
        .build();

    let echo = Endpoint::new(
        ECHO,
        Arc::new(echo_config),
        Arc::clone(&verifier),
        Arc::new(handler_fn(echo_handler)),
    );
    let profile = Endpoint::new(
        PROFILE,
        Arc::new(profile_config),
        verifier,
        Arc::new(handler_fn(profile_handler)),
    );

    [echo, profile]
        .into_iter()
        .map(|endpoint| (endpoint.name().to_string(), endpoint))
        .collect()
}

async fn echo_handler(ctx: RequestContext, req: Value) -> Result<Value, ApiError> {
    Ok(json!({
        "echo": req,
        "subject": ctx.claims().and_then(|claims| claims.subject.clone()),
    }))
}

async fn profile_handler(ctx: RequestContext, _req: Value) -> Result<Value, ApiError> {
    let claims = ctx.claims().ok_or_else(|| {
        ApiError::unauthorized("AUTH_REQUIRED", "authorization required")
    })?;
    Ok(json!({
        "subject": claims.subject,
        "issuer": claims.issuer,
        "expires_at": claims.expires_at,
        "custom_data": claims.custom_data,
    }))
}
