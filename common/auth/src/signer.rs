use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tracing::error;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};

/// Scheme prefix carried by issued tokens and the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Issues signed tokens. Holds the private half of the key pair, so only the
/// issuing authority should construct one.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    algorithm: Algorithm,
    key_id: Option<String>,
}

impl TokenSigner {
    pub fn new(encoding_key: EncodingKey, algorithm: Algorithm) -> Self {
        Self {
            encoding_key,
            algorithm,
            key_id: None,
        }
    }

    /// RS256 signer from a PKCS#1 or PKCS#8 RSA private key.
    pub fn from_rsa_pem(pem: &[u8]) -> AuthResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(pem).map_err(|err| {
            error!(error = %err, "failed to parse RSA signing key");
            AuthError::Signing(err.to_string())
        })?;
        Ok(Self::new(encoding_key, Algorithm::RS256))
    }

    /// HS256 signer for deployments that share a secret with verifiers.
    pub fn from_secret(secret: &[u8]) -> Self {
        Self::new(EncodingKey::from_secret(secret), Algorithm::HS256)
    }

    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        self.key_id = Some(kid.into());
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Signs `claims` and returns the bare compact token.
    pub fn sign_raw(&self, claims: &Claims) -> AuthResult<String> {
        let mut header = Header::new(self.algorithm);
        header.kid = self.key_id.clone();

        encode(&header, claims, &self.encoding_key).map_err(|err| {
            error!(error = %err, "failed to sign JWT");
            AuthError::Signing(err.to_string())
        })
    }

    /// Signs `claims` and returns `Bearer <token>`, ready for the
    /// `Authorization` header.
    pub fn issue(&self, claims: &Claims) -> AuthResult<String> {
        Ok(format!("{BEARER_PREFIX}{}", self.sign_raw(claims)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_prefixes_bearer_scheme() {
        let signer = TokenSigner::from_secret(b"secret");
        let token = signer.issue(&Claims::new().with_subject("user-1")).unwrap();

        let raw = token.strip_prefix(BEARER_PREFIX).expect("bearer prefix");
        assert_eq!(raw.split('.').count(), 3);
    }

    #[test]
    fn from_rsa_pem_rejects_garbage() {
        let err = TokenSigner::from_rsa_pem(b"not a pem").err().expect("invalid key");
        assert!(matches!(err, AuthError::Signing(_)));
    }

    #[test]
    fn key_id_lands_in_header() {
        let signer = TokenSigner::from_secret(b"secret").with_key_id("primary");
        let token = signer.sign_raw(&Claims::new()).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("primary"));
        assert_eq!(header.alg, Algorithm::HS256);
        assert_eq!(signer.algorithm(), header.alg);
    }
}
