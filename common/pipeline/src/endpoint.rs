use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::request::Parts;
use common_auth::{authorize_request, AllowAll, AuthorizationHook, JwtVerifier};
use common_http_errors::ApiError;
use serde_json::Value;
use tracing::warn;

use crate::context::RequestContext;
use crate::handlers::{run_after, run_pipeline, AfterHandler, BeforeHandler, EndpointHandler};
use crate::layers::request_id;

/// One configuration option. Applied in order by [`EndpointConfigBuilder`].
pub enum EndpointOption {
    /// Replaces the whole per-method timeout table.
    TimeoutMap(HashMap<String, Duration>),
    /// Replaces the hook; the last one applied wins.
    AuthorizationHook(Arc<dyn AuthorizationHook>),
    /// Appended after any handlers already configured.
    BeforeHandlers(Vec<Arc<dyn BeforeHandler>>),
    /// Appended after any handlers already configured.
    AfterHandlers(Vec<Arc<dyn AfterHandler>>),
}

impl fmt::Debug for EndpointOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointOption::TimeoutMap(map) => f.debug_tuple("TimeoutMap").field(map).finish(),
            EndpointOption::AuthorizationHook(_) => f.write_str("AuthorizationHook(..)"),
            EndpointOption::BeforeHandlers(list) => write!(f, "BeforeHandlers({})", list.len()),
            EndpointOption::AfterHandlers(list) => write!(f, "AfterHandlers({})", list.len()),
        }
    }
}

/// Frozen endpoint configuration, shared between requests behind an `Arc`.
#[derive(Clone)]
pub struct EndpointConfig {
    timeouts: HashMap<String, Duration>,
    hook: Arc<dyn AuthorizationHook>,
    before: Vec<Arc<dyn BeforeHandler>>,
    after: Vec<Arc<dyn AfterHandler>>,
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("timeouts", &self.timeouts)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish_non_exhaustive()
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            timeouts: HashMap::new(),
            hook: Arc::new(AllowAll),
            before: Vec::new(),
            after: Vec::new(),
        }
    }
}

impl EndpointConfig {
    pub fn builder() -> EndpointConfigBuilder {
        EndpointConfigBuilder::default()
    }

    pub fn timeouts(&self) -> &HashMap<String, Duration> {
        &self.timeouts
    }

    /// Timeout configured for `method`. Enforcing it is up to the caller.
    pub fn timeout_for(&self, method: &str) -> Option<Duration> {
        self.timeouts.get(method).copied()
    }

    pub fn authorization_hook(&self) -> &Arc<dyn AuthorizationHook> {
        &self.hook
    }

    pub fn before_handlers(&self) -> &[Arc<dyn BeforeHandler>] {
        &self.before
    }

    pub fn after_handlers(&self) -> &[Arc<dyn AfterHandler>] {
        &self.after
    }
}

#[derive(Default)]
pub struct EndpointConfigBuilder {
    config: EndpointConfig,
}

impl EndpointConfigBuilder {
    pub fn option(mut self, option: EndpointOption) -> Self {
        match option {
            EndpointOption::TimeoutMap(map) => self.config.timeouts = map,
            EndpointOption::AuthorizationHook(hook) => self.config.hook = hook,
            EndpointOption::BeforeHandlers(list) => self.config.before.extend(list),
            EndpointOption::AfterHandlers(list) => self.config.after.extend(list),
        }
        self
    }

    pub fn options(self, options: impl IntoIterator<Item = EndpointOption>) -> Self {
        options.into_iter().fold(self, Self::option)
    }

    pub fn timeout_map(self, map: HashMap<String, Duration>) -> Self {
        self.option(EndpointOption::TimeoutMap(map))
    }

    pub fn authorization_hook(self, hook: Arc<dyn AuthorizationHook>) -> Self {
        self.option(EndpointOption::AuthorizationHook(hook))
    }

    pub fn before_handlers(self, list: Vec<Arc<dyn BeforeHandler>>) -> Self {
        self.option(EndpointOption::BeforeHandlers(list))
    }

    pub fn after_handlers(self, list: Vec<Arc<dyn AfterHandler>>) -> Self {
        self.option(EndpointOption::AfterHandlers(list))
    }

    pub fn build(self) -> EndpointConfig {
        self.config
    }
}

/// Named endpoint: authorization, Before handlers, the business handler and
/// After handlers, in that order.
#[derive(Clone)]
pub struct Endpoint {
    name: String,
    config: Arc<EndpointConfig>,
    verifier: Arc<JwtVerifier>,
    handler: Arc<dyn EndpointHandler>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    pub fn new(
        name: impl Into<String>,
        config: Arc<EndpointConfig>,
        verifier: Arc<JwtVerifier>,
        handler: Arc<dyn EndpointHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            verifier,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.config.timeout_for(&self.name)
    }

    /// Serves one request. An authorization failure skips the Before
    /// handlers and the business handler but still flows through every After
    /// handler.
    pub async fn dispatch(&self, parts: &Parts, req: Value) -> Result<Value, ApiError> {
        let mut ctx =
            RequestContext::new(self.name.clone()).with_trace_id(request_id(&parts.headers));

        match authorize_request(parts, &self.verifier, self.config.hook.as_ref()).await {
            Ok(auth) => ctx.auth = auth,
            Err(err) => {
                warn!(endpoint = %self.name, error = %err, "request not authorized");
                let mut err = ApiError::from(err);
                if let Some(trace_id) = ctx.trace_id {
                    err = err.with_trace_id(trace_id);
                }
                return run_after(&self.config.after, &ctx, Err(err)).await;
            }
        }

        run_pipeline(
            &self.config.before,
            &self.config.after,
            &mut ctx,
            req,
            self.handler.as_ref(),
        )
        .await
    }
}
