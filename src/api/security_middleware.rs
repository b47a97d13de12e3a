//! Security Middleware
//!
//! Response hardening headers, cache suppression and the CORS allow-list.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{
            AUTHORIZATION, CACHE_CONTROL, CONTENT_SECURITY_POLICY, CONTENT_TYPE, EXPIRES, ORIGIN,
            PRAGMA, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS, X_XSS_PROTECTION,
        },
        HeaderMap, HeaderName, HeaderValue, Method,
    },
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::utils::error::AppError;

/// Security headers that should be applied to all responses
pub struct SecurityHeaders;

impl SecurityHeaders {
    /// Standard hardening headers for a JSON API
    pub fn get_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        );
        headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(
            REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        );
        headers.insert(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
        );
        headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
        headers.insert(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );

        headers
    }

    /// Headers that keep clients and proxies from caching API responses
    pub fn no_cache() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate"),
        );
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(EXPIRES, HeaderValue::from_static("0"));
        headers
    }
}

fn apply(response: &mut Response, extra: HeaderMap) {
    let headers = response.headers_mut();
    for (key, value) in extra.iter() {
        headers.insert(key, value.clone());
    }
}

/// Middleware to add security headers to all responses
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply(&mut response, SecurityHeaders::get_headers());
    response
}

/// Middleware to disable caching of every response
pub async fn no_cache_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply(&mut response, SecurityHeaders::no_cache());
    response
}

/// Origins permitted to make cross-origin requests
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins(Arc<Vec<HeaderValue>>);

impl AllowedOrigins {
    /// Builds the allow-list, skipping entries that are not valid header values
    pub fn new(origins: &[String]) -> Self {
        let values = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    log::warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        Self(Arc::new(values))
    }

    pub fn contains(&self, origin: &HeaderValue) -> bool {
        self.0.iter().any(|allowed| allowed == origin)
    }

    /// CORS layer answering preflights and decorating allowed responses
    pub fn cors_layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.0.iter().cloned()))
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                CONTENT_TYPE,
                AUTHORIZATION,
                HeaderName::from_static("x-requested-with"),
            ])
    }
}

/// Rejects requests whose `Origin` header is not on the allow-list
///
/// Requests without an `Origin` (same-origin, curl, server to server) pass.
pub async fn cors_origin_gate(
    State(allowed): State<AllowedOrigins>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(origin) = request.headers().get(ORIGIN) {
        if !allowed.contains(origin) {
            return Err(AppError::Internal(format!(
                "Origin {} not allowed by CORS",
                String::from_utf8_lossy(origin.as_bytes())
            )));
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{self, StatusCode},
        middleware::{from_fn, from_fn_with_state},
        routing::get,
        Router,
    };
    use tower::util::ServiceExt;

    fn origins() -> AllowedOrigins {
        AllowedOrigins::new(&["http://localhost:5173".to_string()])
    }

    fn gated_router() -> Router {
        let allowed = origins();
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(allowed.cors_layer())
            .layer(from_fn_with_state(allowed, cors_origin_gate))
    }

    fn request_from(origin: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/ping");
        if let Some(origin) = origin {
            builder = builder.header(ORIGIN, origin);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_security_headers() {
        let headers = SecurityHeaders::get_headers();
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert!(headers.contains_key(CONTENT_SECURITY_POLICY));
        assert!(headers.contains_key(STRICT_TRANSPORT_SECURITY));
    }

    #[tokio::test]
    async fn test_header_middlewares_decorate_responses() {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(from_fn(no_cache_middleware))
            .layer(from_fn(security_headers_middleware));

        let response = app.oneshot(request_from(None)).await.unwrap();
        let headers = response.headers();

        assert_eq!(
            headers.get(CACHE_CONTROL).unwrap(),
            "no-store, no-cache, must-revalidate"
        );
        assert_eq!(headers.get(PRAGMA).unwrap(), "no-cache");
        assert_eq!(headers.get(EXPIRES).unwrap(), "0");
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "DENY");
    }

    #[tokio::test]
    async fn test_requests_without_origin_pass() {
        let response = gated_router().oneshot(request_from(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_allowed_origin_gets_cors_headers() {
        let response = gated_router()
            .oneshot(request_from(Some("http://localhost:5173")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            headers.get("access-control-allow-credentials").unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_disallowed_origin_is_rejected() {
        let response = gated_router()
            .oneshot(request_from(Some("https://evil.example")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn test_invalid_origins_are_skipped() {
        let allowed =
            AllowedOrigins::new(&["http://ok.test".to_string(), "bad\norigin".to_string()]);
        assert!(allowed.contains(&HeaderValue::from_static("http://ok.test")));
        assert_eq!(allowed.0.len(), 1);
    }
}
