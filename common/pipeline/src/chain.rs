use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::{from_fn, Next};
use axum::response::Response;
use axum::Router;

/// Wraps the rest of the stack: do work, call `next.run(req)`, do more work.
#[async_trait]
pub trait HttpMiddleware: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn handle(&self, req: Request, next: Next) -> Response;
}

/// Ordered middleware list. For `[m1, m2, .., mn]` a request runs
/// m1-pre .. mn-pre, the handler, then mn-post .. m1-post.
#[derive(Clone, Default)]
pub struct Chain {
    middlewares: Vec<Arc<dyn HttpMiddleware>>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Chain {
    pub fn new(middlewares: Vec<Arc<dyn HttpMiddleware>>) -> Self {
        Self { middlewares }
    }

    pub fn push(mut self, middleware: impl HttpMiddleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// `self` runs outside `other`.
    pub fn then(mut self, other: Chain) -> Self {
        self.middlewares.extend(other.middlewares);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Wraps `router`. Each `Router::layer` call becomes the new outermost
    /// layer, so the list is applied back to front.
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.middlewares.iter().rev().fold(router, |router, middleware| {
            let middleware = Arc::clone(middleware);
            router.layer(from_fn(move |req: Request, next: Next| {
                let middleware = Arc::clone(&middleware);
                async move { middleware.handle(req, next).await }
            }))
        })
    }
}

/// Startup-time collection point for middlewares. Consumed by
/// [`MiddlewareRegistry::freeze`], after which the chain can no longer grow.
#[derive(Default)]
pub struct MiddlewareRegistry {
    middlewares: Vec<Arc<dyn HttpMiddleware>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, middleware: impl HttpMiddleware) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn freeze(self) -> Chain {
        Chain::new(self.middlewares)
    }
}
