use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Counters for authentication outcomes and pipeline errors.
#[derive(Clone)]
pub struct AuthMetrics {
    registry: Registry,
    auth_requests: IntCounterVec,
    pipeline_errors: IntCounterVec,
}

impl AuthMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let auth_requests = IntCounterVec::new(
            Opts::new(
                "auth_requests_total",
                "Count of bearer-token authentications grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(auth_requests.clone()))?;

        let pipeline_errors = IntCounterVec::new(
            Opts::new(
                "pipeline_errors_total",
                "Count of endpoint pipeline errors by endpoint and error code",
            ),
            &["endpoint", "code"],
        )?;
        registry.register(Box::new(pipeline_errors.clone()))?;

        Ok(Self {
            registry,
            auth_requests,
            pipeline_errors,
        })
    }

    pub fn auth_outcome(&self, outcome: &str) {
        self.auth_requests.with_label_values(&[outcome]).inc();
    }

    pub fn pipeline_error(&self, endpoint: &str, code: &str) {
        self.pipeline_errors
            .with_label_values(&[endpoint, code])
            .inc();
    }

    pub fn auth_count(&self, outcome: &str) -> u64 {
        self.auth_requests.with_label_values(&[outcome]).get()
    }

    pub fn pipeline_error_count(&self, endpoint: &str, code: &str) -> u64 {
        self.pipeline_errors
            .with_label_values(&[endpoint, code])
            .get()
    }

    /// Text exposition format, ready for a `/metrics` response body.
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}
