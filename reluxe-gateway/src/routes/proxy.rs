use axum::body::Body;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use reluxe_shared::ApiEnvelope;

use super::rate_limit::check_rate_limit;
use crate::AppState;

/// Headers that must not be forwarded (hop-by-hop).
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
];

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Strip the proxy prefix from the request path to produce the upstream
/// path: `/api/proxy/chat/rooms` -> `/chat/rooms`.
fn strip_prefix(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/api/proxy")?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Pull the marketplace session token out of the cookie jar. The frontend
/// keeps the token in an http-only cookie; the backend wants a bearer.
fn session_from_cookies(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == cookie_name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// The `/api/proxy/*uri` handler.
///
/// 1. Strip the proxy prefix (404 on anything else)
/// 2. Rate-limit by session token when Redis is available
/// 3. Promote the session cookie to an Authorization bearer
/// 4. Forward method, query, headers, and body (JSON or multipart alike)
/// 5. Return the upstream response with hop-by-hop headers stripped
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    OriginalUri(original_uri): OriginalUri,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let path = original_uri.path();
    let query = original_uri.query();

    let upstream_path = match strip_prefix(path) {
        Some(p) => p,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiEnvelope::<()>::failure("unknown route")),
            )
                .into_response();
        }
    };

    let session = session_from_cookies(&headers, &state.config.session_cookie).or_else(|| {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.to_string())
    });

    if let Some(redis) = &state.redis {
        let subject = session.as_deref().unwrap_or("anonymous");
        if let Err(status) = check_rate_limit(redis, subject, &state.config).await {
            return (
                status,
                Json(ApiEnvelope::<()>::failure("rate limit exceeded")),
            )
                .into_response();
        }
    }

    let upstream_url = {
        let base = state.config.backend_url.trim_end_matches('/');
        match query {
            Some(q) => format!("{base}{upstream_path}?{q}"),
            None => format!("{base}{upstream_path}"),
        }
    };

    let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ApiEnvelope::<()>::failure("request body too large (max 10MB)")),
            )
                .into_response();
        }
    };

    let mut upstream_req = state
        .http_client
        .request(
            reqwest::Method::from_bytes(method.as_str().as_bytes()).unwrap_or(reqwest::Method::GET),
            &upstream_url,
        )
        .body(body_bytes.to_vec());

    for (name, value) in headers.iter() {
        let name_lower = name.as_str().to_lowercase();
        if HOP_BY_HOP_HEADERS.contains(&name_lower.as_str()) {
            continue;
        }
        // The bearer below supersedes any client-sent authorization.
        if name_lower == "authorization" || name_lower == "cookie" {
            continue;
        }
        if let Ok(val) = value.to_str() {
            upstream_req = upstream_req.header(name.as_str(), val);
        }
    }

    if let Some(token) = &session {
        upstream_req = upstream_req.bearer_auth(token);
    }

    let upstream_resp = match upstream_req.send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(error = %e, upstream = %upstream_url, "upstream request failed");
            return (
                StatusCode::BAD_GATEWAY,
                Json(ApiEnvelope::<()>::failure(format!("upstream unavailable: {e}"))),
            )
                .into_response();
        }
    };

    let status = StatusCode::from_u16(upstream_resp.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream_resp.headers().iter() {
        let name_lower = name.as_str().to_lowercase();
        if HOP_BY_HOP_HEADERS.contains(&name_lower.as_str()) {
            continue;
        }
        if let (Ok(hn), Ok(hv)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            response_headers.insert(hn, hv);
        }
    }

    let resp_body = match upstream_resp.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to read upstream response body");
            return (
                StatusCode::BAD_GATEWAY,
                Json(ApiEnvelope::<()>::failure("failed to read upstream response")),
            )
                .into_response();
        }
    };

    (status, response_headers, resp_body).into_response()
}
