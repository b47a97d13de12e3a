//! Request Pipeline Middleware
//!
//! The per-route validator, the async boundary that turns handler panics
//! into errors, and the central error responder.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Query, RawPathParams, Request, State},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::RuntimeMode;
use crate::utils::error::{ApiError, AppError, RaisedError};
use crate::utils::validation::{RequestInput, RequestSchema, ValidatedInput};

/// State of the validator layer attached to one route
#[derive(Clone, Debug)]
pub struct RouteValidator {
    schema: Arc<RequestSchema>,
    max_body_size: usize,
}

impl RouteValidator {
    pub fn new(schema: RequestSchema, max_body_size: usize) -> Self {
        Self {
            schema: Arc::new(schema),
            max_body_size,
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn string_map<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Map<String, Value> {
    pairs
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect()
}

/// Validates body, query and path parameters against the route schema
///
/// On success the normalized input is stored in the request extensions for
/// the `Validated*` extractors and the request continues with its body
/// intact. On failure the handler is never reached.
pub async fn validate_request(
    State(validator): State<RouteValidator>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();

    let params = match RawPathParams::from_request_parts(&mut parts, &()).await {
        Ok(raw) => string_map(raw.iter()),
        Err(_) => Map::new(),
    };

    let Query(query) = Query::<BTreeMap<String, String>>::try_from_uri(&parts.uri)
        .map_err(|_| ApiError::bad_request("Malformed query string"))?;
    let query = string_map(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let (body, json) = if is_json(&parts.headers) {
        let bytes = to_bytes(body, validator.max_body_size)
            .await
            .map_err(|_| ApiError::payload_too_large("Request body too large"))?;
        let json = if bytes.is_empty() {
            None
        } else {
            Some(
                serde_json::from_slice::<Value>(&bytes)
                    .map_err(|_| ApiError::bad_request("Malformed JSON body"))?,
            )
        };
        (Body::from(bytes), json)
    } else {
        (body, None)
    };

    let input = RequestInput {
        body: json,
        query,
        params,
    };
    let validated = validator
        .schema
        .validate(&input)
        .map_err(ApiError::from)?;

    parts.extensions.insert(validated);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

fn validated_input(parts: &Parts) -> Result<&ValidatedInput, AppError> {
    parts
        .extensions
        .get::<ValidatedInput>()
        .ok_or_else(|| AppError::Internal("Route has no request validator".to_string()))
}

fn decode<T: DeserializeOwned>(surface: &str, value: &Value) -> Result<T, AppError> {
    serde_json::from_value(value.clone()).map_err(|e| {
        AppError::Internal(format!("Validated {} does not fit handler type: {}", surface, e))
    })
}

/// Validated JSON body
#[derive(Debug, Clone)]
pub struct ValidatedBody<T>(pub T);

/// Validated query string
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

/// Validated path parameters
#[derive(Debug, Clone)]
pub struct ValidatedParams<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let input = validated_input(parts)?;
        decode("body", &input.body).map(ValidatedBody)
    }
}

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let input = validated_input(parts)?;
        decode("query", &input.query).map(ValidatedQuery)
    }
}

impl<T, S> FromRequestParts<S> for ValidatedParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let input = validated_input(parts)?;
        decode("params", &input.params).map(ValidatedParams)
    }
}

/// Awaits `future`, turning a panic into [`AppError::Panicked`]
///
/// `Ok` and `Err` results pass through untouched.
pub async fn catch_failures<F, T>(future: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(AppError::from_panic(payload)),
    }
}

/// Runs the inner handler inside [`catch_failures`]
pub async fn async_boundary(request: Request, next: Next) -> Result<Response, AppError> {
    catch_failures(async move { Ok(next.run(request).await) }).await
}

/// Observes every failure raised by the inner stack
///
/// The client body was already rendered by [`AppError`]'s response
/// conversion; this layer strips the marker and writes the diagnostic.
pub async fn error_responder(
    State(mode): State<RuntimeMode>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let mut response = next.run(request).await;

    if let Some(RaisedError(error)) = response.extensions_mut().remove::<RaisedError>() {
        if mode.emits_diagnostics() {
            log::error!(
                "{} {} failed with {}: {:?}",
                method,
                uri,
                error.status().as_u16(),
                error
            );
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::Schema;
    use axum::{
        http::{self, StatusCode},
        middleware::{from_fn, from_fn_with_state},
        routing::{get, post},
        Json, Router,
    };
    use serde::Deserialize;
    use serde_json::json;
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Once;
    use tower::util::ServiceExt;

    thread_local! {
        static RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
    }

    /// Keeps every record logged on the current thread
    struct CapturingLogger;

    impl log::Log for CapturingLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            RECORDS.with(|records| {
                records
                    .borrow_mut()
                    .push((record.level(), record.args().to_string()))
            });
        }

        fn flush(&self) {}
    }

    static LOGGER: CapturingLogger = CapturingLogger;
    static INSTALL: Once = Once::new();

    fn capture_logs() {
        INSTALL.call_once(|| {
            let _ = log::set_logger(&LOGGER);
            log::set_max_level(log::LevelFilter::Trace);
        });
        RECORDS.with(|records| records.borrow_mut().clear());
    }

    fn captured_errors() -> Vec<String> {
        RECORDS.with(|records| {
            records
                .borrow()
                .iter()
                .filter(|(level, _)| *level == log::Level::Error)
                .map(|(_, message)| message.clone())
                .collect()
        })
    }

    #[derive(Debug, Deserialize)]
    struct Signup {
        email: String,
    }

    #[derive(Debug, Deserialize)]
    struct Page {
        page: i64,
    }

    #[derive(Debug, Deserialize)]
    struct ItemPath {
        id: String,
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn signup_router(calls: Arc<AtomicUsize>) -> Router {
        let schema = RequestSchema::new()
            .body(Schema::object([
                ("email", Schema::email()),
                ("password", Schema::string().min_len(8)),
            ]))
            .query(Schema::empty_object())
            .params(Schema::empty_object());

        Router::new()
            .route(
                "/signup",
                post(move |ValidatedBody(body): ValidatedBody<Signup>| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Json(json!({ "email": body.email }))
                    }
                }),
            )
            .route_layer(from_fn(async_boundary))
            .route_layer(from_fn_with_state(
                RouteValidator::new(schema, 1024),
                validate_request,
            ))
            .layer(from_fn_with_state(RuntimeMode::Test, error_responder))
    }

    #[tokio::test]
    async fn test_invalid_body_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = signup_router(calls.clone());

        let response = app
            .oneshot(json_request(
                "POST",
                "/signup",
                r#"{"email":"x","password":"123"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "Validation error: body.email, body.password"
        );
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
        assert_eq!(body["details"][0]["path"], "body.email");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_request_reaches_handler_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = signup_router(calls.clone());

        let response = app
            .oneshot(json_request(
                "POST",
                "/signup",
                r#"{"email":"ana@example.com","password":"password123"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.extensions().get::<RaisedError>().is_none());
        assert_eq!(body_json(response).await, json!({ "email": "ana@example.com" }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_json_body_is_reported() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = signup_router(calls.clone());

        let request = http::Request::builder()
            .method("POST")
            .uri("/signup")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Validation error: body");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let app = signup_router(Arc::new(AtomicUsize::new(0)));

        let response = app
            .oneshot(json_request("POST", "/signup", "{\"email\":"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Malformed JSON body" })
        );
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let app = signup_router(Arc::new(AtomicUsize::new(0)));
        let padding = "a".repeat(2048);
        let body = format!(r#"{{"email":"ana@example.com","password":"{}"}}"#, padding);

        let response = app
            .oneshot(json_request("POST", "/signup", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_query_and_params_are_validated_together() {
        let schema = RequestSchema::new()
            .query(Schema::object([("page", Schema::integer().min(1).coerce())]))
            .params(Schema::object([("id", Schema::object_id())]));

        let app = Router::new()
            .route(
                "/items/{id}",
                get(
                    |ValidatedQuery(query): ValidatedQuery<Page>,
                     ValidatedParams(path): ValidatedParams<ItemPath>| async move {
                        Json(json!({ "page": query.page, "id": path.id }))
                    },
                ),
            )
            .route_layer(from_fn_with_state(
                RouteValidator::new(schema, 1024),
                validate_request,
            ));

        let ok = http::Request::builder()
            .uri("/items/507f1f77bcf86cd799439011?page=2")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(ok).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "page": 2, "id": "507f1f77bcf86cd799439011" })
        );

        let bad = http::Request::builder()
            .uri("/items/nope?page=0")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(bad).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["message"],
            "Validation error: query.page, params.id"
        );
    }

    #[tokio::test]
    async fn test_boundary_converts_panics() {
        let app = Router::new()
            .route(
                "/boom",
                get(|| async {
                    if true {
                        panic!("oops");
                    }
                    "unreachable"
                }),
            )
            .route_layer(from_fn(async_boundary));

        let request = http::Request::builder().uri("/boom").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let raised = response.extensions().get::<RaisedError>().cloned().unwrap();
        assert!(matches!(raised.0.as_ref(), AppError::Panicked(msg) if msg == "oops"));
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Internal Server Error" })
        );
    }

    #[tokio::test]
    async fn test_boundary_forwards_typed_errors() {
        let app = Router::new()
            .route(
                "/conflict",
                get(|| async {
                    Err::<(), AppError>(ApiError::conflict("Email already exists").into())
                }),
            )
            .route_layer(from_fn(async_boundary))
            .layer(from_fn_with_state(RuntimeMode::Production, error_responder));

        let request = http::Request::builder()
            .uri("/conflict")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(response.extensions().get::<RaisedError>().is_none());
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Email already exists" })
        );
    }

    async fn failing_route_under(mode: RuntimeMode) -> (StatusCode, Value, Vec<String>) {
        let app = Router::new()
            .route(
                "/conflict",
                get(|| async {
                    Err::<(), AppError>(ApiError::conflict("Email already exists").into())
                }),
            )
            .route_layer(from_fn(async_boundary))
            .layer(from_fn_with_state(mode, error_responder));

        capture_logs();
        let request = http::Request::builder()
            .uri("/conflict")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let errors = captured_errors();

        (response.status(), body_json(response).await, errors)
    }

    #[tokio::test]
    async fn test_responder_logs_outside_production_only() {
        let (test_status, test_body, test_errors) = failing_route_under(RuntimeMode::Test).await;
        assert_eq!(test_status, StatusCode::CONFLICT);
        assert_eq!(test_errors.len(), 1);
        assert!(test_errors[0].starts_with("GET /conflict failed with 409"));

        let (prod_status, prod_body, prod_errors) =
            failing_route_under(RuntimeMode::Production).await;
        assert_eq!(prod_status, StatusCode::CONFLICT);
        assert!(prod_errors.is_empty());

        assert_eq!(test_body, prod_body);
        assert_eq!(test_body, json!({ "message": "Email already exists" }));
    }

    #[tokio::test]
    async fn test_catch_failures_passes_results_through() {
        let ok = catch_failures(async { Ok::<_, AppError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = catch_failures(async {
            Err::<(), _>(AppError::Internal("db down".to_string()))
        })
        .await;
        assert!(matches!(err, Err(AppError::Internal(msg)) if msg == "db down"));
    }

    #[tokio::test]
    async fn test_unvalidated_route_fails_extraction() {
        let app = Router::new().route(
            "/raw",
            post(|ValidatedBody(body): ValidatedBody<Signup>| async move { body.email }),
        );

        let response = app
            .oneshot(json_request("POST", "/raw", r#"{"email":"a@b.co"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
