use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use reluxe_gateway::config::AppConfig;
use reluxe_gateway::routes::{health, proxy};
use reluxe_gateway::AppState;
use reluxe_shared::clients::redis::RedisClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reluxe_shared::middleware::init_tracing("reluxe-gateway");

    let config = AppConfig::load()?;
    let port = config.port;

    let redis = match RedisClient::connect(&config.redis_url).await {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unreachable, rate limiting disabled");
            None
        }
    };

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let state = Arc::new(AppState {
        config,
        http_client,
        redis,
    });

    let app = Router::new()
        .route("/health", get(health::health_check))
        .fallback(proxy::proxy_handler)
        .layer(
            CorsLayer::new()
                .allow_origin([
                    "http://localhost:3000".parse().unwrap(),
                    "http://127.0.0.1:3000".parse().unwrap(),
                ])
                .allow_methods(AllowMethods::list([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ]))
                .allow_headers(AllowHeaders::list([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    header::COOKIE,
                ]))
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "reluxe-gateway starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
