use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, HeaderValue};
use tracing::warn;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::hook::AuthorizationHook;
use crate::signer::BEARER_PREFIX;
use crate::verifier::JwtVerifier;

const BEARER_SCHEME: &str = "bearer";

/// Raw compact token of an authenticated request, bound in request extensions
/// next to the verified [`Claims`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

/// Verified claims plus the token they came from.
///
/// As an extractor it reads what the auth middleware bound into the request
/// and rejects with [`AuthError::MissingCredentials`] when nothing was bound.
/// Use `Option<AuthContext>` on routes that also serve anonymous callers.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
    pub token: String,
}

impl AuthContext {
    pub fn subject(&self) -> Option<&str> {
        self.claims.subject.as_deref()
    }

    pub fn into_claims(self) -> Claims {
        self.claims
    }

    /// Publishes claims and token under their own extension keys.
    pub fn bind(self, extensions: &mut Extensions) {
        extensions.insert(self.claims);
        extensions.insert(BearerToken(self.token));
    }

    pub fn from_extensions(extensions: &Extensions) -> Option<Self> {
        let claims = extensions.get::<Claims>()?.clone();
        let BearerToken(token) = extensions.get::<BearerToken>()?.clone();
        Some(Self { claims, token })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        AuthContext::from_extensions(&parts.extensions).ok_or(AuthError::MissingCredentials)
    }
}

/// Authenticates a request from its head.
///
/// - no (or empty) `Authorization` header: `Ok(None)`, the request is anonymous
/// - header not shaped `Bearer <token>`: [`AuthError::MalformedHeader`]
/// - token rejected by the verifier: that error, unchanged
/// - hook rejection: [`AuthError::Hook`] carrying the hook's own error
pub async fn authorize_request(
    parts: &Parts,
    verifier: &JwtVerifier,
    hook: &dyn AuthorizationHook,
) -> AuthResult<Option<AuthContext>> {
    let Some(token) = bearer_token(&parts.headers)? else {
        return Ok(None);
    };

    let claims = verifier.verify(&token).map_err(|err| {
        warn!(error = %err, "bearer token rejected");
        err
    })?;

    hook.authorize(parts, &claims).await.map_err(|err| {
        warn!(error = %err, "authorization hook rejected request");
        AuthError::Hook(err)
    })?;

    Ok(Some(AuthContext { claims, token }))
}

/// Reads the bearer token out of `headers`. `Ok(None)` when no credential
/// was supplied.
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<Option<String>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    if raw.is_empty() {
        return Ok(None);
    }
    parse_bearer(raw).map(Some)
}

fn parse_bearer(raw: &str) -> AuthResult<String> {
    let mut parts = raw.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.is_empty() =>
        {
            Ok(token.to_owned())
        }
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Sets the `Authorization` header for an outbound request, adding the
/// `Bearer ` prefix when `token` is bare.
pub fn insert_bearer(headers: &mut HeaderMap, token: &str) -> AuthResult<()> {
    let value = if token.starts_with(BEARER_PREFIX) {
        token.to_owned()
    } else {
        format!("{BEARER_PREFIX}{token}")
    };
    let value = HeaderValue::from_str(&value).map_err(|_| AuthError::MalformedHeader)?;
    headers.insert(AUTHORIZATION, value);
    Ok(())
}
