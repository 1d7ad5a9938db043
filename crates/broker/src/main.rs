use std::sync::Arc;

use makerlink_broker::{config::Config, gateway::GatewayState, routes};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "makerlink_broker=info".into()),
        )
        .init();

    let config = Config::from_env();
    let gateway = Arc::new(GatewayState::new());

    let app = routes::build_router(gateway);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");

    tracing::info!("MakerLink broker running on {}", addr);

    axum::serve(listener, app).await.expect("Server error");
}
