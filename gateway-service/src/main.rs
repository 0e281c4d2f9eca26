use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use common_auth::JwtVerifier;
use common_observability::{init_tracing, AuthMetrics};
use gateway_service::{build_router, AppState, GatewayConfig};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = GatewayConfig::from_env()?;
    let verifier = JwtVerifier::from_rsa_pem(config.jwt_config(), config.jwt_public_key_pem.as_bytes())
        .context("JWT_PUBLIC_KEY_PEM is not a usable RSA public key")?;
    let metrics = AuthMetrics::new().context("failed to register metrics")?;
    let state = AppState::new(&config, Arc::new(verifier), Arc::new(metrics));
    info!(
        endpoints = ?state.endpoints.keys().collect::<Vec<_>>(),
        required_claim = config.required_claim.as_deref().unwrap_or("-"),
        "endpoints configured"
    );
    let app = build_router(state);

    let ip: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("HOST is not an IP address: {}", config.host))?;
    let addr = SocketAddr::from((ip, config.port));
    info!(%addr, "starting gateway-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
