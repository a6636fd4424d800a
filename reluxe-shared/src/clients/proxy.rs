//! REST client for the marketplace backend, routed through the gateway's
//! `/api/proxy/<uri>` surface.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::types::ApiEnvelope;

#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>, session_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            session_token,
        }
    }

    /// Swap the session token, e.g. after a fresh login.
    pub fn with_session(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    fn url(&self, uri: &str) -> String {
        format!(
            "{}/api/proxy/{}",
            self.base_url.trim_end_matches('/'),
            uri.trim_start_matches('/')
        )
    }

    pub async fn get<T: DeserializeOwned>(&self, uri: &str) -> AppResult<T> {
        self.execute(self.http.get(self.url(uri))).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        uri: &str,
        body: &B,
    ) -> AppResult<T> {
        self.execute(self.http.post(self.url(uri)).json(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        uri: &str,
        body: &B,
    ) -> AppResult<T> {
        self.execute(self.http.put(self.url(uri)).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, uri: &str) -> AppResult<T> {
        self.execute(self.http.delete(self.url(uri))).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        uri: &str,
        form: reqwest::multipart::Form,
    ) -> AppResult<T> {
        self.execute(self.http.post(self.url(uri)).multipart(form))
            .await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let request = match &self.session_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::session_expired());
        }

        if !status.is_success() {
            let message = response
                .json::<ApiEnvelope<serde_json::Value>>()
                .await
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| format!("backend returned {status}"));
            return Err(AppError::new(Self::code_for(status), message));
        }

        let envelope: ApiEnvelope<T> = response.json().await?;
        envelope.into_result()
    }

    fn code_for(status: StatusCode) -> ErrorCode {
        match status {
            StatusCode::NOT_FOUND => ErrorCode::NotFound,
            StatusCode::FORBIDDEN => ErrorCode::Forbidden,
            StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimited,
            StatusCode::PAYLOAD_TOO_LARGE => ErrorCode::PayloadTooLarge,
            s if s.is_server_error() => ErrorCode::ServiceUnavailable,
            _ => ErrorCode::BadRequest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn unwraps_success_envelopes() {
        let router = Router::new().route(
            "/api/proxy/designer",
            get(|| async { Json(ApiEnvelope::success(vec!["margiela".to_string()])) }),
        );
        let base = serve(router).await;

        let client = ProxyClient::new(base, Some("tok".into()));
        let names: Vec<String> = client.get("designer").await.unwrap();
        assert_eq!(names, vec!["margiela"]);
    }

    #[tokio::test]
    async fn forwards_bearer_session() {
        let router = Router::new().route(
            "/api/proxy/me",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Json(ApiEnvelope::success(auth))
            }),
        );
        let base = serve(router).await;

        let client = ProxyClient::new(base, Some("sess-123".into()));
        let echoed: String = client.get("me").await.unwrap();
        assert_eq!(echoed, "Bearer sess-123");
    }

    #[tokio::test]
    async fn normalizes_unauthorized() {
        let router = Router::new().route(
            "/api/proxy/closet",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiEnvelope::<()>::failure("token invalid")),
                )
            }),
        );
        let base = serve(router).await;

        let client = ProxyClient::new(base, None);
        let err = client.get::<serde_json::Value>("closet").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.to_string(), "please log in to continue");
    }

    #[tokio::test]
    async fn multipart_uploads_pass_through() {
        use axum::extract::Multipart;
        use axum::routing::post;

        let router = Router::new().route(
            "/api/proxy/product/photo",
            post(|mut multipart: Multipart| async move {
                let field = multipart.next_field().await.unwrap().unwrap();
                let name = field.name().unwrap_or("").to_string();
                let bytes = field.bytes().await.unwrap();
                Json(ApiEnvelope::success(format!("{name}:{}", bytes.len())))
            }),
        );
        let base = serve(router).await;

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(vec![0u8; 16]).file_name("look.jpg"),
        );
        let client = ProxyClient::new(base, Some("tok".into()));
        let echoed: String = client.post_multipart("product/photo", form).await.unwrap();
        assert_eq!(echoed, "file:16");
    }

    #[tokio::test]
    async fn surfaces_backend_error_messages() {
        let router = Router::new().route(
            "/api/proxy/product/9",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiEnvelope::<()>::failure("listing not found")),
                )
            }),
        );
        let base = serve(router).await;

        let client = ProxyClient::new(base, None);
        let err = client.get::<serde_json::Value>("product/9").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.to_string(), "listing not found");
    }
}
