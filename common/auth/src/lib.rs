pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod hook;
pub mod middleware;
pub mod signer;
pub mod verifier;

pub use claims::Claims;
pub use config::{JwtConfig, DEFAULT_LEEWAY_SECONDS};
pub use error::{AuthError, AuthResult};
pub use extractors::{authorize_request, bearer_token, insert_bearer, AuthContext, BearerToken};
pub use hook::{AllowAll, AuthorizationHook, RequireClaim};
pub use middleware::{auth_middleware, authenticate, AuthState};
pub use signer::{TokenSigner, BEARER_PREFIX};
pub use verifier::JwtVerifier;
pub use jsonwebtoken::Algorithm;
