use common_auth::{AuthContext, Claims};
use uuid::Uuid;

/// Request-scoped state threaded through an endpoint's handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub endpoint: String,
    pub auth: Option<AuthContext>,
    pub trace_id: Option<Uuid>,
}

impl RequestContext {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth: None,
            trace_id: None,
        }
    }

    pub fn with_trace_id(mut self, trace_id: Option<Uuid>) -> Self {
        self.trace_id = trace_id;
        self
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.auth.as_ref().map(|auth| &auth.claims)
    }

    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().map(|auth| auth.token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }
}
