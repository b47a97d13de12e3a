//! API Layer
//!
//! HTTP API endpoints and the request pipeline for the registry service.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod security_middleware;

// Re-export commonly used types
pub use handlers::AppState;
pub use middleware::{
    async_boundary, catch_failures, error_responder, validate_request, RouteValidator,
    ValidatedBody, ValidatedParams, ValidatedQuery,
};
pub use routes::{create_app, RouterBuilder};
pub use security_middleware::{cors_origin_gate, AllowedOrigins, SecurityHeaders};
