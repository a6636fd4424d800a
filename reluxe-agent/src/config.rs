use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_chat_socket_url")]
    pub chat_socket_url: String,
    #[serde(default = "default_notification_server_url")]
    pub notification_server_url: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_session_token")]
    pub session_token: String,
}

fn default_gateway_url() -> String { "http://localhost:8080".into() }
fn default_chat_socket_url() -> String { "ws://localhost:9001/socket".into() }
fn default_notification_server_url() -> String { "http://localhost:9002".into() }
fn default_user() -> String { "demo".into() }
fn default_session_token() -> String { "development-session-token".into() }

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("RELUXE_AGENT").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_else(|_| Self {
            gateway_url: default_gateway_url(),
            chat_socket_url: default_chat_socket_url(),
            notification_server_url: default_notification_server_url(),
            user: default_user(),
            session_token: default_session_token(),
        }))
    }

    /// Cookie header value the notification server authenticates with.
    pub fn session_cookie(&self) -> String {
        format!("reluxe_session={}", self.session_token)
    }
}
