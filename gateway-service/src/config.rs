use std::collections::HashMap;
use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use common_auth::{JwtConfig, DEFAULT_LEEWAY_SECONDS};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub jwt_public_key_pem: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub jwt_leeway_seconds: u64,
    pub endpoint_timeouts: HashMap<String, Duration>,
    pub required_claim: Option<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`GatewayConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_public_key_pem = lookup("JWT_PUBLIC_KEY_PEM")
            .map(|pem| pem.replace("\\n", "\n"))
            .context("JWT_PUBLIC_KEY_PEM must be set")?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port: {raw}"))?,
            None => 8090,
        };
        let jwt_leeway_seconds = match lookup("JWT_LEEWAY_SECONDS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("JWT_LEEWAY_SECONDS is not a number: {raw}"))?,
            None => DEFAULT_LEEWAY_SECONDS,
        };
        let endpoint_timeouts = match lookup("ENDPOINT_TIMEOUTS") {
            Some(raw) => parse_timeouts(&raw).context("invalid ENDPOINT_TIMEOUTS")?,
            None => HashMap::new(),
        };

        Ok(Self {
            host,
            port,
            jwt_public_key_pem,
            jwt_issuer: lookup("JWT_ISSUER").filter(|v| !v.is_empty()),
            jwt_audience: lookup("JWT_AUDIENCE").filter(|v| !v.is_empty()),
            jwt_leeway_seconds,
            endpoint_timeouts,
            required_claim: lookup("AUTH_REQUIRED_CLAIM").filter(|v| !v.is_empty()),
        })
    }

    pub fn jwt_config(&self) -> JwtConfig {
        let mut config = JwtConfig::new().with_leeway(self.jwt_leeway_seconds);
        if let Some(issuer) = &self.jwt_issuer {
            config = config.with_issuer(issuer.clone());
        }
        if let Some(audience) = &self.jwt_audience {
            config = config.with_audience(audience.clone());
        }
        config
    }
}

/// Parses `method=millis,method=millis`. Blank entries are skipped.
pub fn parse_timeouts(raw: &str) -> Result<HashMap<String, Duration>> {
    let mut timeouts = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((method, millis)) = entry.split_once('=') else {
            bail!("expected method=millis, got `{entry}`");
        };
        let method = method.trim();
        if method.is_empty() {
            bail!("missing method name in `{entry}`");
        }
        let millis = millis
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid milliseconds for `{method}`"))?;
        timeouts.insert(method.to_string(), Duration::from_millis(millis));
    }
    Ok(timeouts)
}
