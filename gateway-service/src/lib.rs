pub mod app_state;
pub mod config;
pub mod endpoints;
pub mod routes;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use common_auth::auth_middleware;
use common_pipeline::{MiddlewareRegistry, RequestId, RequestLogging};

pub use crate::app_state::AppState;
pub use crate::config::{parse_timeouts, GatewayConfig};

/// Full service router. Every route runs inside the `RequestId` and
/// `RequestLogging` chain; `/whoami` additionally requires the bearer-token
/// middleware, while `/rpc/:method` authenticates inside each endpoint.
pub fn build_router(state: AppState) -> Router {
    let protected: Router<AppState> = Router::new()
        .route("/whoami", get(routes::whoami))
        .route_layer(from_fn_with_state(state.auth.clone(), auth_middleware));

    let app = Router::new()
        .route("/healthz", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .route("/rpc/:method", post(routes::rpc))
        .merge(protected)
        .with_state(state);

    let mut registry = MiddlewareRegistry::new();
    registry.register(RequestId).register(RequestLogging);
    registry.freeze().apply(app)
}
