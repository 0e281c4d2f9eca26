use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::extractors::authorize_request;
use crate::hook::{AllowAll, AuthorizationHook};
use crate::verifier::JwtVerifier;

/// Shared state for the bearer-token middleware.
#[derive(Clone)]
pub struct AuthState {
    verifier: Arc<JwtVerifier>,
    hook: Arc<dyn AuthorizationHook>,
}

impl AuthState {
    pub fn new(verifier: Arc<JwtVerifier>, hook: Arc<dyn AuthorizationHook>) -> Self {
        Self { verifier, hook }
    }

    pub fn allow_all(verifier: Arc<JwtVerifier>) -> Self {
        Self::new(verifier, Arc::new(AllowAll))
    }

    pub fn verifier(&self) -> &Arc<JwtVerifier> {
        &self.verifier
    }
}

/// Authenticates the request and binds an [`AuthContext`](crate::AuthContext)
/// into its extensions. Anonymous requests pass through untouched; any
/// failure short-circuits with the classified error response.
pub async fn authenticate(state: &AuthState, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();
    match authorize_request(&parts, &state.verifier, state.hook.as_ref()).await {
        Ok(Some(ctx)) => ctx.bind(&mut parts.extensions),
        Ok(None) => {}
        Err(err) => return err.into_response(),
    }
    next.run(Request::from_parts(parts, body)).await
}

/// [`authenticate`] shaped for `axum::middleware::from_fn_with_state`.
pub async fn auth_middleware(State(state): State<AuthState>, req: Request, next: Next) -> Response {
    authenticate(&state, req, next).await
}
