use std::fmt;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde_json::Value;
use tracing::debug;

use crate::claims::Claims;
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

/// Verifies compact tokens against a single verification key.
///
/// Verification is local: signature, algorithm, exp/nbf (with leeway) and the
/// optional issuer/audience pins from [`JwtConfig`]. There is no revocation
/// state; a token is valid as long as its content and the clock say so.
#[derive(Clone)]
pub struct JwtVerifier {
    config: JwtConfig,
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // key material stays out of logs
        f.debug_struct("JwtVerifier")
            .field("config", &self.config)
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(config: JwtConfig, key: DecodingKey) -> Self {
        let validation = config.validation();
        Self {
            config,
            key,
            validation,
        }
    }

    /// Verifier for RSA-signed tokens from a PKCS#1 or SPKI public key PEM.
    pub fn from_rsa_pem(config: JwtConfig, pem: &[u8]) -> AuthResult<Self> {
        let key =
            DecodingKey::from_rsa_pem(pem).map_err(|err| AuthError::KeyParse(err.to_string()))?;
        Ok(Self::new(config, key))
    }

    pub fn from_secret(config: JwtConfig, secret: &[u8]) -> Self {
        Self::new(config, DecodingKey::from_secret(secret))
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Verifies the raw compact token (no scheme prefix).
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let token_data = decode::<Value>(token, &self.key, &self.validation).map_err(|err| {
            debug!(error = %err, "JWT rejected");
            AuthError::Authentication(err)
        })?;
        let claims = Claims::try_from(token_data.claims)?;
        self.check_time_window(&claims)?;
        debug!(
            subject = claims.subject.as_deref().unwrap_or("-"),
            "verified JWT successfully"
        );
        Ok(claims)
    }

    /// exp and nbf as parsed into [`Claims`]. jsonwebtoken skips its own check
    /// for timestamps it cannot read as unsigned, such as negative ones.
    fn check_time_window(&self, claims: &Claims) -> AuthResult<()> {
        let now = Utc::now().timestamp();
        let leeway = i64::try_from(self.config.leeway_seconds).unwrap_or(i64::MAX);

        if let Some(expires_at) = claims.expires_at {
            if expires_at.timestamp().saturating_add(leeway) < now {
                debug!(exp = expires_at.timestamp(), "JWT rejected: expired");
                return Err(AuthError::Authentication(ErrorKind::ExpiredSignature.into()));
            }
        }
        if let Some(not_before) = claims.not_before {
            if not_before.timestamp().saturating_sub(leeway) > now {
                debug!(nbf = not_before.timestamp(), "JWT rejected: not yet valid");
                return Err(AuthError::Authentication(ErrorKind::ImmatureSignature.into()));
            }
        }
        Ok(())
    }
}
