use common_http_errors::ApiError;
use axum::response::IntoResponse;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use uuid::Uuid;

#[test]
fn unauthorized_variant() {
    let err = ApiError::unauthorized("AUTH_TOKEN", "token expired");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "AUTH_TOKEN");
}

#[test]
fn payment_required_variant() {
    let err = ApiError::PaymentRequired { code: "AUTH_HEADER", trace_id: None, message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "AUTH_HEADER");
}

#[test]
fn forbidden_missing_claim_variant() {
    let err = ApiError::ForbiddenMissingClaim { claim: "tenant".into(), trace_id: None };
    assert_eq!(err.body().missing_claim.as_deref(), Some("tenant"));
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "missing_claim");
}

#[test]
fn forbidden_variant() {
    let err = ApiError::Forbidden { trace_id: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "forbidden");
}

#[test]
fn bad_request_variant() {
    let err = ApiError::BadRequest { code: "invalid_something", trace_id: None, message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_something");
}

#[test]
fn timeout_variant() {
    let err = ApiError::Timeout { trace_id: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "timeout");
}

#[tokio::test]
async fn internal_variant_renders_body() {
    let trace = Uuid::new_v4();
    let err = ApiError::Internal { trace_id: Some(trace), message: Some("boom".into()) };
    assert_eq!(err.to_string(), "internal_error (500): boom");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], "internal_error");
    assert_eq!(json["message"], "boom");
    assert_eq!(json["trace_id"], trace.to_string());
    assert!(json.get("missing_claim").is_none());
}

#[test]
fn with_trace_id_keeps_existing_value() {
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    let err = ApiError::Forbidden { trace_id: None }.with_trace_id(first);
    assert_eq!(err.trace_id(), Some(first));

    let err = err.with_trace_id(second);
    assert_eq!(err.trace_id(), Some(first));
}
