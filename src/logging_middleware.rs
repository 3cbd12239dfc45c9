// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode
//!
//! Login secrets travel in query strings, JSON bodies and the `Location`
//! header, so every logged value goes through the redaction helpers first.

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::{header::LOCATION, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::debug;

/// Field and query parameter names whose values never reach the logs
const SECRET_FIELDS: [&str; 7] = [
    "token",
    "code",
    "state",
    "nonce",
    "id_token",
    "access_token",
    "refresh_token",
];

const REDACTED: &str = "[REDACTED]";

fn is_secret(name: &str) -> bool {
    SECRET_FIELDS.contains(&name)
}

/// Replaces secret values in a JSON document, at any depth
pub fn redact_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if is_secret(key) {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact_secrets(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_secrets),
        _ => {}
    }
}

/// Replaces secret query parameter values in a URI or URL
pub fn redact_query(uri: &str) -> String {
    let Some((path, query)) = uri.split_once('?') else {
        return uri.to_string();
    };

    let params: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_secret(key) => format!("{}={}", key, REDACTED),
            _ => pair.to_string(),
        })
        .collect();

    format!("{}?{}", path, params.join("&"))
}

fn render_body(bytes: &[u8]) -> Option<String> {
    let body_str = std::str::from_utf8(bytes).ok()?;

    // Non-JSON bodies are not logged; they could carry anything
    let mut json = serde_json::from_str::<Value>(body_str).ok()?;
    redact_secrets(&mut json);
    Some(serde_json::to_string_pretty(&json).unwrap_or_else(|_| REDACTED.to_string()))
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();

    // Read request body
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let uri = redact_query(&parts.uri.to_string());
    match render_body(&bytes) {
        Some(request_body) => debug!(method = %parts.method, uri = %uri, request_body = %request_body, "📥 Request"),
        None => debug!(method = %parts.method, uri = %uri, "📥 Request"),
    }

    // Reconstruct request
    let request = Request::from_parts(parts, Body::from(bytes));

    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let location = parts
        .headers
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(redact_query);

    match (render_body(&bytes), location) {
        (Some(response_body), _) => {
            debug!(status = %parts.status, response_body = %response_body, "📤 Response")
        }
        (None, Some(location)) => {
            debug!(status = %parts.status, location = %location, "📤 Response")
        }
        (None, None) => debug!(status = %parts.status, "📤 Response"),
    }

    // Reconstruct response
    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::post, Json, Router};
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn test_redact_secrets_nested() {
        let mut body = json!({
            "token": "eyJhbGciOi",
            "user": { "email": "a@b.com", "refresh_token": "1//0g" },
            "items": [{ "code": "abc" }, { "name": "keep" }]
        });

        redact_secrets(&mut body);

        assert_eq!(body["token"], REDACTED);
        assert_eq!(body["user"]["refresh_token"], REDACTED);
        assert_eq!(body["user"]["email"], "a@b.com");
        assert_eq!(body["items"][0]["code"], REDACTED);
        assert_eq!(body["items"][1]["name"], "keep");
    }

    #[test]
    fn test_redact_query() {
        assert_eq!(
            redact_query("/auth/token?code=4%2F0Ab&state=xyz&scope=email"),
            "/auth/token?code=[REDACTED]&state=[REDACTED]&scope=email"
        );
        assert_eq!(redact_query("/auth/me"), "/auth/me");
        assert_eq!(redact_query("/x?flag"), "/x?flag");
    }

    #[test]
    fn test_non_json_body_not_rendered() {
        assert!(render_body(b"code=abc").is_none());
        assert!(render_body(&[0xff, 0xfe]).is_none());
        assert!(render_body(br#"{"code":"abc"}"#)
            .unwrap()
            .contains(REDACTED));
    }

    #[tokio::test]
    async fn test_bodies_pass_through_untouched() {
        let app = Router::new()
            .route("/echo", post(|Json(body): Json<Value>| async move { Json(body) }))
            .layer(middleware::from_fn(log_request_response));

        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"code":"secret"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "secret");
    }
}
