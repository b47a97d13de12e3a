//! API Route Definitions
//!
//! This module defines all HTTP routes and their corresponding handlers using a
//! builder pattern. Each route carries its own request schema; the builder
//! wires the validator and the async boundary around every handler, and
//! [`create_app`] adds the cross-cutting layers.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::*;
use super::middleware::{async_boundary, error_responder, validate_request, RouteValidator};
use super::security_middleware::{
    cors_origin_gate, no_cache_middleware, security_headers_middleware, AllowedOrigins,
};
use crate::config::ServerConfig;
use crate::models::requests::{ListUsersQuery, RegisterRequest, UserPath};
use crate::utils::validation::RequestSchema;

/// Default cap on request bodies read by the validator
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Builder for creating API routes with configurable endpoints
///
/// Routes are disabled by default; use the presets or the individual toggles
/// to choose which ones are mounted.
pub struct RouterBuilder {
    /// GET /health
    health_check: bool,
    /// POST /api/users/register
    register: bool,
    /// GET /api/users/list
    list_users: bool,
    /// GET /api/users/{id}
    get_user: bool,
    max_request_size: usize,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self {
            health_check: false,
            register: false,
            list_users: false,
            get_user: false,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
        }
    }
}

/// Wraps `handler` in the boundary and the route's validator
///
/// The layers only run for the methods the route serves. Any other method
/// reaches the JSON not-found fallback without touching the schema.
fn guarded(
    handler: MethodRouter<AppState>,
    schema: RequestSchema,
    max_request_size: usize,
) -> MethodRouter<AppState> {
    handler
        .route_layer(from_fn(async_boundary))
        .route_layer(from_fn_with_state(
            RouteValidator::new(schema, max_request_size),
            validate_request,
        ))
        .fallback(not_found)
}

impl RouterBuilder {
    /// Creates a new router builder with all routes disabled by default
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router builder with all routes enabled
    pub fn with_all_routes() -> Self {
        Self {
            health_check: true,
            register: true,
            list_users: true,
            get_user: true,
            ..Self::default()
        }
    }

    /// Creates a router with lookup routes only, for read replicas and
    /// directory services
    pub fn with_readonly_routes() -> Self {
        Self {
            health_check: true,
            list_users: true,
            get_user: true,
            ..Self::default()
        }
    }

    /// Creates a router with the health check only
    pub fn with_minimal_routes() -> Self {
        Self {
            health_check: true,
            ..Self::default()
        }
    }

    pub fn health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    pub fn register(mut self, enabled: bool) -> Self {
        self.register = enabled;
        self
    }

    pub fn list_users(mut self, enabled: bool) -> Self {
        self.list_users = enabled;
        self
    }

    pub fn get_user(mut self, enabled: bool) -> Self {
        self.get_user = enabled;
        self
    }

    /// Sets the largest JSON body the validator will buffer
    pub fn max_request_size(mut self, bytes: usize) -> Self {
        self.max_request_size = bytes;
        self
    }

    /// Builds the Axum router with the configured routes
    ///
    /// Unmatched paths and unsupported methods fall through to a JSON 404.
    pub fn build(self) -> Router<AppState> {
        let mut router = Router::new();

        if self.health_check {
            router = router.route("/health", get(health_check).fallback(not_found));
        }

        if self.register {
            router = router.route(
                "/api/users/register",
                guarded(
                    post(register),
                    RegisterRequest::schema(),
                    self.max_request_size,
                ),
            );
        }

        if self.list_users {
            router = router.route(
                "/api/users/list",
                guarded(
                    get(list_users),
                    ListUsersQuery::schema(),
                    self.max_request_size,
                ),
            );
        }

        if self.get_user {
            router = router.route(
                "/api/users/{id}",
                guarded(get(get_user), UserPath::schema(), self.max_request_size),
            );
        }

        router.fallback(not_found)
    }
}

/// Builds the complete application: routes, state and every
/// cross-cutting layer
///
/// Layers from outermost in: request tracing, response headers, the error
/// responder, the CORS origin gate and the CORS layer itself.
pub fn create_app(state: AppState, config: &ServerConfig) -> Router {
    let origins = AllowedOrigins::new(&config.cors_origins);

    RouterBuilder::with_all_routes()
        .max_request_size(config.max_request_size)
        .build()
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(security_headers_middleware))
                .layer(from_fn(no_cache_middleware))
                .layer(from_fn_with_state(config.mode, error_responder))
                .layer(from_fn_with_state(origins.clone(), cors_origin_gate))
                .layer(origins.cors_layer())
                .into_inner(),
        )
}
