use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("failed to parse verification key: {0}")]
    KeyParse(String),
    #[error("token verification failed: {0}")]
    Authentication(#[source] jsonwebtoken::errors::Error),
    #[error("the Authorization header is incorrectly formatted")]
    MalformedHeader,
    #[error("authorization required")]
    MissingCredentials,
    #[error("malformed claim payload: {0}")]
    ClaimsShape(String),
    #[error("authorization hook rejected request: {0}")]
    Hook(ApiError),
}

impl AuthError {
    /// True when the token was well formed and correctly signed but outside
    /// its exp/nbf window.
    pub fn is_time_validity(&self) -> bool {
        matches!(
            self,
            AuthError::Authentication(err)
                if matches!(err.kind(), ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature)
        )
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Hook(inner) => inner,
            AuthError::MalformedHeader => ApiError::PaymentRequired {
                code: "AUTH_HEADER",
                trace_id: None,
                message: Some(value.to_string()),
            },
            AuthError::Authentication(_) => ApiError::unauthorized("AUTH_TOKEN", value.to_string()),
            AuthError::ClaimsShape(_) => ApiError::unauthorized("AUTH_CLAIMS", value.to_string()),
            AuthError::MissingCredentials => {
                ApiError::unauthorized("AUTH_REQUIRED", value.to_string())
            }
            AuthError::Signing(_) | AuthError::KeyParse(_) => ApiError::internal(value, None),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
