//! Mints a development token: `issue-token <subject> [key=value ...]`.
//! Extra `key=value` pairs land in `custom_data`; values that parse as JSON
//! are stored as JSON, anything else as a string.

use std::env;

use anyhow::{bail, Context};
use chrono::{DateTime, TimeDelta, Utc};
use common_auth::{Claims, TokenSigner};
use serde_json::Value;

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let subject = args
        .next()
        .context("usage: issue-token <subject> [key=value ...]")?;

    let pem = env::var("JWT_PRIVATE_KEY_PEM")
        .context("JWT_PRIVATE_KEY_PEM must be set")?
        .replace("\\n", "\n");
    let expires_at = expiry(env::var("TOKEN_TTL_SECONDS").ok().as_deref())?;

    let mut claims = Claims::new()
        .with_subject(subject)
        .issued_now()
        .expires_at(expires_at);
    if let Ok(issuer) = env::var("JWT_ISSUER") {
        claims = claims.with_issuer(issuer);
    }
    if let Ok(audience) = env::var("JWT_AUDIENCE") {
        claims = claims.with_audience(audience);
    }
    for pair in args {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("expected key=value, got `{pair}`");
        };
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        claims = claims.with_custom(key, value);
    }

    let signer = TokenSigner::from_rsa_pem(pem.as_bytes())?;
    println!("{}", signer.issue(&claims)?);
    Ok(())
}

const DEFAULT_TTL_SECONDS: i64 = 900;

/// Expiry instant for a raw `TOKEN_TTL_SECONDS` value; 15 minutes when unset.
fn expiry(raw: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    let ttl_seconds = match raw {
        Some(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("TOKEN_TTL_SECONDS is not a number: {raw}"))?,
        None => DEFAULT_TTL_SECONDS,
    };
    TimeDelta::try_seconds(ttl_seconds)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .with_context(|| format!("TOKEN_TTL_SECONDS out of range: {ttl_seconds}"))
}
