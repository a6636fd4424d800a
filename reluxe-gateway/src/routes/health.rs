use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use reluxe_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// Health check probing the marketplace backend and Redis.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let mut checks = Vec::with_capacity(2);

    let backend_health = format!(
        "{}/health",
        state.config.backend_url.trim_end_matches('/')
    );
    let backend_check = match state
        .http_client
        .get(&backend_health)
        .timeout(std::time::Duration::from_secs(3))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => HealthCheck {
            name: "backend".into(),
            status: HealthStatus::Healthy,
            message: None,
        },
        Ok(resp) => HealthCheck {
            name: "backend".into(),
            status: HealthStatus::Degraded,
            message: Some(format!("status {}", resp.status())),
        },
        Err(e) => HealthCheck {
            name: "backend".into(),
            status: HealthStatus::Unhealthy,
            message: Some(format!("{e}")),
        },
    };
    checks.push(backend_check);

    let redis_check = match &state.redis {
        Some(redis) => match redis.ping().await {
            Ok(()) => HealthCheck {
                name: "redis".into(),
                status: HealthStatus::Healthy,
                message: None,
            },
            Err(e) => HealthCheck {
                name: "redis".into(),
                status: HealthStatus::Unhealthy,
                message: Some(format!("{e}")),
            },
        },
        None => HealthCheck {
            name: "redis".into(),
            status: HealthStatus::Degraded,
            message: Some("not configured; rate limiting disabled".into()),
        },
    };
    checks.push(redis_check);

    let response =
        HealthResponse::healthy("reluxe-gateway", env!("CARGO_PKG_VERSION")).with_checks(checks);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}
