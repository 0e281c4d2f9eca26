use std::fmt;

use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use uuid::Uuid;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub missing_claim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub trace_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")] pub message: Option<String>,
}

/// Classified API failure. Each variant maps to exactly one HTTP status; the
/// machine-readable `code` travels in the body and the `X-Error-Code` header.
#[derive(Debug, Clone)]
pub enum ApiError {
    Unauthorized { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    PaymentRequired { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    ForbiddenMissingClaim { claim: String, trace_id: Option<Uuid> },
    Forbidden { trace_id: Option<Uuid> },
    BadRequest { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    NotFound { code: &'static str, trace_id: Option<Uuid> },
    Timeout { trace_id: Option<Uuid> },
    Internal { trace_id: Option<Uuid>, message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E, trace_id: Option<Uuid>) -> Self { Self::Internal { trace_id, message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str, trace_id: Option<Uuid>) -> Self { Self::BadRequest { code, trace_id, message: None } }
    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self { Self::Unauthorized { code, trace_id: None, message: Some(message.into()) } }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            ApiError::ForbiddenMissingClaim { .. } | ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized { code, .. }
            | ApiError::PaymentRequired { code, .. }
            | ApiError::BadRequest { code, .. }
            | ApiError::NotFound { code, .. } => code,
            ApiError::ForbiddenMissingClaim { .. } => "missing_claim",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::Timeout { .. } => "timeout",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    pub fn trace_id(&self) -> Option<Uuid> {
        match self {
            ApiError::Unauthorized { trace_id, .. }
            | ApiError::PaymentRequired { trace_id, .. }
            | ApiError::ForbiddenMissingClaim { trace_id, .. }
            | ApiError::Forbidden { trace_id }
            | ApiError::BadRequest { trace_id, .. }
            | ApiError::NotFound { trace_id, .. }
            | ApiError::Timeout { trace_id }
            | ApiError::Internal { trace_id, .. } => *trace_id,
        }
    }

    /// Stamps `trace_id` unless the error already carries one.
    pub fn with_trace_id(mut self, id: Uuid) -> Self {
        match &mut self {
            ApiError::Unauthorized { trace_id, .. }
            | ApiError::PaymentRequired { trace_id, .. }
            | ApiError::ForbiddenMissingClaim { trace_id, .. }
            | ApiError::Forbidden { trace_id }
            | ApiError::BadRequest { trace_id, .. }
            | ApiError::NotFound { trace_id, .. }
            | ApiError::Timeout { trace_id }
            | ApiError::Internal { trace_id, .. } => {
                trace_id.get_or_insert(id);
            }
        }
        self
    }

    pub fn body(&self) -> ErrorBody {
        let (missing_claim, message) = match self {
            ApiError::Unauthorized { message, .. }
            | ApiError::PaymentRequired { message, .. }
            | ApiError::BadRequest { message, .. }
            | ApiError::Internal { message, .. } => (None, message.clone()),
            ApiError::ForbiddenMissingClaim { claim, .. } => (Some(claim.clone()), None),
            ApiError::Forbidden { .. } | ApiError::NotFound { .. } | ApiError::Timeout { .. } => (None, None),
        };
        ErrorBody { code: self.code().into(), missing_claim, trace_id: self.trace_id(), message }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.body();
        match body.message {
            Some(message) => write!(f, "{} ({}): {}", body.code, self.status().as_u16(), message),
            None => write!(f, "{} ({})", body.code, self.status().as_u16()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.code();
        let mut resp = (status, Json(self.body())).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
