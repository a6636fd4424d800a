use axum::http::StatusCode;
use chrono::Utc;

use reluxe_shared::clients::redis::RedisClient;

use crate::config::AppConfig;

/// Check per-minute and per-hour fixed windows for one session token.
///
/// Keys:
/// - Per-minute: `rl:{subject}:min:{YYYYMMDDHHMM}`
/// - Per-hour:   `rl:{subject}:hr:{YYYYMMDDHH}`
///
/// Returns `Err(StatusCode::TOO_MANY_REQUESTS)` once either window fills.
pub async fn check_rate_limit(
    redis: &RedisClient,
    subject: &str,
    config: &AppConfig,
) -> Result<(), StatusCode> {
    let now = Utc::now();
    let minute_key = format!("rl:{}:min:{}", subject, now.format("%Y%m%d%H%M"));
    let hour_key = format!("rl:{}:hr:{}", subject, now.format("%Y%m%d%H"));

    let under_minute = redis
        .rate_limit_check(&minute_key, config.requests_per_minute, 60)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "redis rate-limit check failed (minute window)");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if !under_minute {
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let under_hour = redis
        .rate_limit_check(&hour_key, config.requests_per_hour, 3600)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "redis rate-limit check failed (hour window)");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if !under_hour {
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(())
}
