use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    // Rate limits (fixed windows)
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u64,
    #[serde(default = "default_rph")]
    pub requests_per_hour: u64,
}

fn default_port() -> u16 { 8080 }
fn default_backend_url() -> String { "http://localhost:9000".into() }
fn default_redis_url() -> String { "redis://localhost:6379".into() }
fn default_session_cookie() -> String { "reluxe_session".into() }
fn default_rpm() -> u64 { 120 }
fn default_rph() -> u64 { 2000 }

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("RELUXE_GATEWAY").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_else(|_| Self {
            port: default_port(),
            backend_url: default_backend_url(),
            redis_url: default_redis_url(),
            session_cookie: default_session_cookie(),
            requests_per_minute: default_rpm(),
            requests_per_hour: default_rph(),
        }))
    }
}
