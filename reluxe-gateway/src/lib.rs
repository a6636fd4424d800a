pub mod config;
pub mod routes;

use reluxe_shared::clients::redis::RedisClient;

pub struct AppState {
    pub config: config::AppConfig,
    pub http_client: reqwest::Client,
    /// Absent when Redis is unreachable; rate limiting is then skipped.
    pub redis: Option<RedisClient>,
}
