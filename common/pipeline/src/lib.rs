pub mod chain;
pub mod context;
pub mod endpoint;
pub mod handlers;
pub mod layers;

pub use chain::{Chain, HttpMiddleware, MiddlewareRegistry};
pub use context::RequestContext;
pub use endpoint::{Endpoint, EndpointConfig, EndpointConfigBuilder, EndpointOption};
pub use handlers::{
    handler_fn, run_after, run_pipeline, AfterHandler, BeforeHandler, EndpointHandler,
    FaultResponse, HandlerFn, MaskInternalErrors, RequireAuthenticated,
};
pub use layers::{request_id, Authenticate, RequestId, RequestLogging, REQUEST_ID_HEADER};
