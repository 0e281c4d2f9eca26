use async_trait::async_trait;
use axum::http::request::Parts;
use common_http_errors::ApiError;

use crate::claims::Claims;

/// Caller-supplied authorization step, invoked after the token's signature and
/// time window have been verified and before the claims are bound to the
/// request. May perform I/O. Whatever `ApiError` it returns reaches the
/// client with its own status and code.
#[async_trait]
pub trait AuthorizationHook: Send + Sync {
    async fn authorize(&self, parts: &Parts, claims: &Claims) -> Result<(), ApiError>;
}

/// Accepts every verified token.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AuthorizationHook for AllowAll {
    async fn authorize(&self, _parts: &Parts, _claims: &Claims) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Rejects tokens whose `custom_data` lacks the given key.
#[derive(Debug, Clone)]
pub struct RequireClaim {
    claim: String,
}

impl RequireClaim {
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
        }
    }
}

#[async_trait]
impl AuthorizationHook for RequireClaim {
    async fn authorize(&self, _parts: &Parts, claims: &Claims) -> Result<(), ApiError> {
        if claims.custom_data.contains_key(&self.claim) {
            Ok(())
        } else {
            Err(ApiError::ForbiddenMissingClaim {
                claim: self.claim.clone(),
                trace_id: None,
            })
        }
    }
}
