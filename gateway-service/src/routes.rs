use axum::body::{to_bytes, Body};
use axum::extract::{Path, Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use common_auth::{AuthContext, Claims};
use common_http_errors::ApiError;
use common_pipeline::request_id;
use serde_json::Value;
use tracing::{debug, warn};

use crate::app_state::AppState;

const MAX_RPC_BODY_BYTES: usize = 1024 * 1024;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|err| ApiError::internal(err, None))?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, state.metrics.content_type())
        .body(Body::from(body))
        .map_err(|err| ApiError::internal(err, None))
}

/// Identity bound by the auth middleware.
pub async fn whoami(ctx: AuthContext) -> Json<Claims> {
    Json(ctx.into_claims())
}

/// `POST /rpc/:method`: runs the named endpoint's pipeline on the JSON body.
pub async fn rpc(
    State(state): State<AppState>,
    Path(method): Path<String>,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    let (parts, body) = req.into_parts();
    let trace_id = request_id(&parts.headers);

    let result = dispatch(&state, &method, &parts, body).await;
    result.map(Json).map_err(|err| {
        state.metrics.pipeline_error(&method, err.code());
        match trace_id {
            Some(id) => err.with_trace_id(id),
            None => err,
        }
    })
}

async fn dispatch(
    state: &AppState,
    method: &str,
    parts: &Parts,
    body: Body,
) -> Result<Value, ApiError> {
    let endpoint = state.endpoint(method).ok_or(ApiError::NotFound {
        code: "unknown_method",
        trace_id: None,
    })?;

    let bytes = to_bytes(body, MAX_RPC_BODY_BYTES)
        .await
        .map_err(|_| ApiError::bad_request("body_too_large", None))?;
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).map_err(|err| ApiError::BadRequest {
            code: "invalid_json",
            trace_id: None,
            message: Some(err.to_string()),
        })?
    };

    match endpoint.timeout() {
        Some(limit) => tokio::time::timeout(limit, endpoint.dispatch(parts, payload))
            .await
            .unwrap_or_else(|_| {
                warn!(method, timeout_ms = limit.as_millis() as u64, "endpoint timed out");
                Err(ApiError::Timeout { trace_id: None })
            }),
        None => {
            debug!(method, "dispatching without timeout");
            endpoint.dispatch(parts, payload).await
        }
    }
}
