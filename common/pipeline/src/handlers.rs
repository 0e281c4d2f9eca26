use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use common_http_errors::ApiError;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::context::RequestContext;

/// Runs before the endpoint handler. May enrich `ctx` and rewrite the
/// request; an `Err` stops the remaining Before handlers and the endpoint.
#[async_trait]
pub trait BeforeHandler: Send + Sync {
    async fn before(&self, ctx: &mut RequestContext, req: Value) -> Result<Value, ApiError>;
}

/// Runs after the endpoint (or after whatever stopped the request), always.
/// Receives the current outcome and returns the one the next handler sees.
#[async_trait]
pub trait AfterHandler: Send + Sync {
    async fn after(
        &self,
        ctx: &RequestContext,
        outcome: Result<Value, ApiError>,
    ) -> Result<Value, ApiError>;
}

/// Business operation served by an endpoint.
#[async_trait]
pub trait EndpointHandler: Send + Sync {
    async fn call(&self, ctx: &RequestContext, req: Value) -> Result<Value, ApiError>;
}

/// Adapts an async closure into an [`EndpointHandler`].
#[derive(Clone)]
pub struct HandlerFn<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(RequestContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> EndpointHandler for HandlerFn<F>
where
    F: Fn(RequestContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
{
    async fn call(&self, ctx: &RequestContext, req: Value) -> Result<Value, ApiError> {
        (self.0)(ctx.clone(), req).await
    }
}

/// Before handlers in order, then the endpoint, then every After handler.
pub async fn run_pipeline(
    before: &[Arc<dyn BeforeHandler>],
    after: &[Arc<dyn AfterHandler>],
    ctx: &mut RequestContext,
    mut req: Value,
    handler: &dyn EndpointHandler,
) -> Result<Value, ApiError> {
    for (index, step) in before.iter().enumerate() {
        req = match step.before(ctx, req).await {
            Ok(next) => next,
            Err(err) => {
                debug!(endpoint = %ctx.endpoint, index, error = %err, "before handler stopped request");
                return run_after(after, ctx, Err(err)).await;
            }
        };
    }
    let outcome = handler.call(ctx, req).await;
    run_after(after, ctx, outcome).await
}

pub async fn run_after(
    after: &[Arc<dyn AfterHandler>],
    ctx: &RequestContext,
    mut outcome: Result<Value, ApiError>,
) -> Result<Value, ApiError> {
    for step in after {
        outcome = step.after(ctx, outcome).await;
    }
    outcome
}

/// Stops anonymous requests with `401 AUTH_REQUIRED`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAuthenticated;

#[async_trait]
impl BeforeHandler for RequireAuthenticated {
    async fn before(&self, ctx: &mut RequestContext, req: Value) -> Result<Value, ApiError> {
        if ctx.is_authenticated() {
            Ok(req)
        } else {
            Err(ApiError::Unauthorized {
                code: "AUTH_REQUIRED",
                trace_id: ctx.trace_id,
                message: Some("authorization required".into()),
            })
        }
    }
}

/// Turns an error outcome into a successful `{"fault": {..}}` value.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultResponse;

#[async_trait]
impl AfterHandler for FaultResponse {
    async fn after(
        &self,
        _ctx: &RequestContext,
        outcome: Result<Value, ApiError>,
    ) -> Result<Value, ApiError> {
        match outcome {
            Ok(value) => Ok(value),
            Err(err) => {
                let body = err.body();
                Ok(json!({
                    "fault": {
                        "code": body.code,
                        "message": body.message,
                        "status": err.status().as_u16(),
                    }
                }))
            }
        }
    }
}

/// Drops the message of internal errors so it never reaches the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskInternalErrors;

#[async_trait]
impl AfterHandler for MaskInternalErrors {
    async fn after(
        &self,
        ctx: &RequestContext,
        outcome: Result<Value, ApiError>,
    ) -> Result<Value, ApiError> {
        match outcome {
            Err(ApiError::Internal { trace_id, message }) => {
                if let Some(message) = &message {
                    error!(endpoint = %ctx.endpoint, error = %message, "internal error");
                }
                Err(ApiError::Internal {
                    trace_id,
                    message: None,
                })
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Step {
        label: &'static str,
        fail: bool,
        log: Log,
    }

    #[async_trait]
    impl BeforeHandler for Step {
        async fn before(&self, _ctx: &mut RequestContext, req: Value) -> Result<Value, ApiError> {
            self.log.lock().unwrap().push(self.label.into());
            if self.fail {
                Err(ApiError::bad_request("rejected", None))
            } else {
                Ok(req)
            }
        }
    }

    struct Observe {
        label: &'static str,
        log: Log,
    }

    #[async_trait]
    impl AfterHandler for Observe {
        async fn after(
            &self,
            _ctx: &RequestContext,
            outcome: Result<Value, ApiError>,
        ) -> Result<Value, ApiError> {
            let seen = match &outcome {
                Ok(_) => "ok".to_string(),
                Err(err) => err.code().to_string(),
            };
            self.log.lock().unwrap().push(format!("{}:{seen}", self.label));
            outcome
        }
    }

    fn before(label: &'static str, fail: bool, log: &Log) -> Arc<dyn BeforeHandler> {
        Arc::new(Step {
            label,
            fail,
            log: Arc::clone(log),
        })
    }

    fn after(label: &'static str, log: &Log) -> Arc<dyn AfterHandler> {
        Arc::new(Observe {
            label,
            log: Arc::clone(log),
        })
    }

    fn terminal(log: &Log) -> impl EndpointHandler {
        let log = Arc::clone(log);
        handler_fn(move |_ctx, req| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("H".into());
                Ok(json!({ "echo": req }))
            }
        })
    }

    #[tokio::test]
    async fn handlers_run_in_order_around_the_endpoint() {
        let log: Log = Arc::default();
        let mut ctx = RequestContext::new("test");
        let result = run_pipeline(
            &[before("B1", false, &log), before("B2", false, &log)],
            &[after("A1", &log), after("A2", &log)],
            &mut ctx,
            json!(1),
            &terminal(&log),
        )
        .await
        .unwrap();

        assert_eq!(result, json!({ "echo": 1 }));
        assert_eq!(*log.lock().unwrap(), vec!["B1", "B2", "H", "A1:ok", "A2:ok"]);
    }

    #[tokio::test]
    async fn before_failure_skips_rest_but_runs_after_handlers() {
        let log: Log = Arc::default();
        let mut ctx = RequestContext::new("test");
        let err = run_pipeline(
            &[before("B1", true, &log), before("B2", false, &log)],
            &[after("A1", &log), after("A2", &log)],
            &mut ctx,
            json!(1),
            &terminal(&log),
        )
        .await
        .expect_err("B1 rejects");

        assert_eq!(err.code(), "rejected");
        assert_eq!(*log.lock().unwrap(), vec!["B1", "A1:rejected", "A2:rejected"]);
    }

    #[tokio::test]
    async fn fault_response_turns_errors_into_values() {
        let ctx = RequestContext::new("test");
        let after: Vec<Arc<dyn AfterHandler>> = vec![Arc::new(FaultResponse)];

        let value = run_after(&after, &ctx, Err(ApiError::Timeout { trace_id: None }))
            .await
            .unwrap();
        assert_eq!(value["fault"]["code"], "timeout");
        assert_eq!(value["fault"]["status"], 408);

        let passthrough = run_after(&after, &ctx, Ok(json!("fine"))).await.unwrap();
        assert_eq!(passthrough, json!("fine"));
    }

    #[tokio::test]
    async fn internal_messages_are_masked() {
        let ctx = RequestContext::new("test");
        let after: Vec<Arc<dyn AfterHandler>> = vec![Arc::new(MaskInternalErrors)];

        let err = run_after(&after, &ctx, Err(ApiError::internal("db down", None)))
            .await
            .expect_err("still an error");
        assert_eq!(err.code(), "internal_error");
        assert!(err.body().message.is_none());
    }

    #[tokio::test]
    async fn require_authenticated_rejects_anonymous() {
        let mut ctx = RequestContext::new("test");
        let err = RequireAuthenticated
            .before(&mut ctx, json!({}))
            .await
            .expect_err("anonymous");
        assert_eq!(err.code(), "AUTH_REQUIRED");
    }
}
