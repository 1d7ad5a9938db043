use std::sync::Arc;

use axum::http::{HeaderName, Method};
use makerlink_api::{config::Config, db, routes, AppState};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "makerlink_api=info".into()),
        )
        .init();

    let config = Config::from_env();

    let pool = db::init_pool(&config.database_path)
        .await
        .expect("Failed to initialize database");

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(pool, config));

    let app = routes::build_router(state).layer(
        CorsLayer::new()
            .allow_origin(tower_http::cors::AllowOrigin::mirror_request())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                HeaderName::from_static("content-type"),
                HeaderName::from_static("authorization"),
            ])
            .allow_credentials(true),
    );

    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");

    tracing::info!("MakerLink API running on {}", addr);

    axum::serve(listener, app).await.expect("Server error");
}
