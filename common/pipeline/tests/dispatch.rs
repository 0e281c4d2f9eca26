use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use axum::http::request::Parts;
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use chrono::Duration;
use common_auth::{AuthorizationHook, Claims, JwtConfig, JwtVerifier, TokenSigner};
use common_http_errors::ApiError;
use common_pipeline::{
    handler_fn, AfterHandler, Endpoint, EndpointConfig, FaultResponse, RequestContext,
    RequireAuthenticated, REQUEST_ID_HEADER,
};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use uuid::Uuid;

struct Keys {
    private_pem: String,
    public_pem: String,
}

fn keys() -> &'static Keys {
    static KEYS: OnceLock<Keys> = OnceLock::new();
    KEYS.get_or_init(|| {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).expect("key generation");
        let public_pem = private_key
            .to_public_key()
            .to_pkcs1_pem(LineEnding::LF)
            .expect("public pem");
        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("private pem")
            .to_string();
        Keys {
            private_pem,
            public_pem,
        }
    })
}

fn verifier() -> Arc<JwtVerifier> {
    Arc::new(
        JwtVerifier::from_rsa_pem(JwtConfig::new(), keys().public_pem.as_bytes())
            .expect("verifier"),
    )
}

fn bearer(claims: &Claims) -> String {
    TokenSigner::from_rsa_pem(keys().private_pem.as_bytes())
        .expect("signer")
        .issue(claims)
        .expect("issue")
}

fn parts(authorization: Option<&str>) -> Parts {
    let mut builder = Request::builder().method("POST").uri("/rpc/profile");
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    builder.body(()).unwrap().into_parts().0
}

fn profile_endpoint(config: EndpointConfig) -> Endpoint {
    let handler = handler_fn(|ctx: RequestContext, _req: Value| async move {
        Ok(json!({
            "subject": ctx.claims().and_then(|c| c.subject.clone()),
            "authenticated": ctx.is_authenticated(),
            "token": ctx.token(),
        }))
    });
    Endpoint::new("profile", Arc::new(config), verifier(), Arc::new(handler))
}

#[derive(Default)]
struct Seen(Mutex<Vec<String>>);

#[async_trait]
impl AfterHandler for Seen {
    async fn after(
        &self,
        _ctx: &RequestContext,
        outcome: Result<Value, ApiError>,
    ) -> Result<Value, ApiError> {
        let label = match &outcome {
            Ok(_) => "ok".to_string(),
            Err(err) => err.code().to_string(),
        };
        self.0.lock().unwrap().push(label);
        outcome
    }
}

struct DenyAll;

#[async_trait]
impl AuthorizationHook for DenyAll {
    async fn authorize(&self, _parts: &Parts, _claims: &Claims) -> Result<(), ApiError> {
        Err(ApiError::Forbidden { trace_id: None })
    }
}

#[tokio::test]
async fn anonymous_request_reaches_handler() {
    let endpoint = profile_endpoint(EndpointConfig::default());

    let value = endpoint.dispatch(&parts(None), json!({})).await.unwrap();

    assert_eq!(value["authenticated"], false);
    assert_eq!(value["subject"], Value::Null);
    assert_eq!(value["token"], Value::Null);
}

#[tokio::test]
async fn valid_token_binds_identity() {
    let endpoint = profile_endpoint(
        EndpointConfig::builder()
            .before_handlers(vec![Arc::new(RequireAuthenticated)])
            .build(),
    );
    let token = bearer(
        &Claims::new()
            .with_subject("user-42")
            .expires_in(Duration::minutes(5)),
    );

    let value = endpoint
        .dispatch(&parts(Some(&token)), json!({}))
        .await
        .unwrap();

    assert_eq!(value["authenticated"], true);
    assert_eq!(value["subject"], "user-42");
    assert_eq!(value["token"], token.trim_start_matches("Bearer "));
}

#[tokio::test]
async fn require_authenticated_stops_anonymous_callers() {
    let seen = Arc::new(Seen::default());
    let endpoint = profile_endpoint(
        EndpointConfig::builder()
            .before_handlers(vec![Arc::new(RequireAuthenticated)])
            .after_handlers(vec![seen.clone() as Arc<dyn AfterHandler>])
            .build(),
    );

    let err = endpoint
        .dispatch(&parts(None), json!({}))
        .await
        .expect_err("anonymous");

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(*seen.0.lock().unwrap(), vec!["AUTH_REQUIRED"]);
}

#[tokio::test]
async fn hook_rejection_surfaces_hook_error() {
    let endpoint = profile_endpoint(
        EndpointConfig::builder()
            .authorization_hook(Arc::new(DenyAll))
            .build(),
    );
    let token = bearer(&Claims::new().with_subject("user-42"));

    let err = endpoint
        .dispatch(&parts(Some(&token)), json!({}))
        .await
        .expect_err("hook denies");

    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert_eq!(err.code(), "forbidden");
}

#[tokio::test]
async fn malformed_header_flows_through_after_handlers() {
    let seen = Arc::new(Seen::default());
    let endpoint = profile_endpoint(
        EndpointConfig::builder()
            .after_handlers(vec![seen.clone() as Arc<dyn AfterHandler>, Arc::new(FaultResponse)])
            .build(),
    );
    let request_id = Uuid::new_v4();
    let mut head = parts(Some("Token abc"));
    head.headers
        .insert(REQUEST_ID_HEADER, request_id.to_string().parse().unwrap());

    let value = endpoint.dispatch(&head, json!({})).await.unwrap();

    assert_eq!(*seen.0.lock().unwrap(), vec!["AUTH_HEADER"]);
    assert_eq!(value["fault"]["code"], "AUTH_HEADER");
    assert_eq!(value["fault"]["status"], 402);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let endpoint = profile_endpoint(EndpointConfig::default());
    let token = bearer(&Claims::new().expires_at(chrono::Utc::now() - Duration::minutes(1)));

    let err = endpoint
        .dispatch(&parts(Some(&token)), json!({}))
        .await
        .expect_err("expired");

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.code(), "AUTH_TOKEN");
}

#[tokio::test]
async fn request_id_becomes_error_trace_id() {
    let endpoint = profile_endpoint(EndpointConfig::default());
    let request_id = Uuid::new_v4();
    let mut head = parts(Some("Bearer not-a-token"));
    head.headers
        .insert(REQUEST_ID_HEADER, request_id.to_string().parse().unwrap());

    let err = endpoint
        .dispatch(&head, json!({}))
        .await
        .expect_err("garbage token");

    assert_eq!(err.trace_id(), Some(request_id));
}

#[test]
fn endpoint_timeout_comes_from_its_own_entry() {
    let config = EndpointConfig::builder()
        .timeout_map(
            [("profile".to_string(), std::time::Duration::from_millis(250))]
                .into_iter()
                .collect(),
        )
        .build();
    let endpoint = profile_endpoint(config);

    assert_eq!(endpoint.name(), "profile");
    assert_eq!(
        endpoint.timeout(),
        Some(std::time::Duration::from_millis(250))
    );
}
