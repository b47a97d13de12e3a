//! User Registry Library
//!
//! A user registration REST backend built around a uniform request
//! pipeline: every route validates its body, query string and path
//! parameters against a declarative schema before the handler runs, and
//! every failure leaves the service in one JSON shape.
//!
//! # Features
//!
//! - **Schema Validation**: body, query and params checked together, with
//!   every failing field reported at once
//! - **Uniform Errors**: `{"message", "details"}` for typed errors, a masked
//!   500 for everything else
//! - **Panic Safety**: handler panics become ordinary 500 responses
//! - **Password Security**: bcrypt hashing with configurable cost
//! - **Flexible Router**: configurable endpoints via the RouterBuilder pattern
//! - **Database Integration**: MongoDB with a unique email index
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use user_registry::{
//!     api::{create_app, AppState},
//!     config::AppConfig,
//!     database::{Database, MongoUserStore},
//!     service::UserService,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let database = Database::connect(&config.database).await?;
//!
//!     let store = Arc::new(MongoUserStore::new(&database));
//!     let state = AppState::new(UserService::with_bcrypt_cost(store, config.server.bcrypt_cost));
//!     let app = create_app(state, &config.server);
//!
//!     let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
//!     axum::serve(listener, app).await?;
//!
//!     database.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Router Builder Examples
//!
//! ```rust,no_run
//! use user_registry::api::RouterBuilder;
//!
//! // Full service with all endpoints
//! let full_router = RouterBuilder::with_all_routes().build();
//!
//! // User directory (read-only)
//! let directory_router = RouterBuilder::with_readonly_routes().build();
//!
//! // Registration only, with a tighter body cap
//! let registration_router = RouterBuilder::new()
//!     .health_check(true)
//!     .register(true)
//!     .max_request_size(16 * 1024)
//!     .build();
//! ```
//!
//! # Architecture
//!
//! - **API Layer**: handlers, the validator and boundary middleware, the
//!   error responder and the route builder
//! - **Service Layer**: registration and lookup logic
//! - **Models**: stored documents, public views and request schemas
//! - **Database**: connection handle and the `UserStore` port
//! - **Utils**: the schema engine, error types and password hashing

/// HTTP API layer with handlers and configurable routing
pub mod api;

/// Configuration management for all service settings
pub mod config;

/// Database connection management and persistence
pub mod database;

/// Data models and request/response structures
pub mod models;

/// Business logic for user registration and lookup
pub mod service;

/// Shared utilities for validation, error handling and hashing
pub mod utils;

// Re-export commonly used types for convenient access
pub use api::{create_app, AppState, RouterBuilder};
pub use config::{AppConfig, ConfigError, RuntimeMode, ServerConfig};
pub use database::{Database, DatabaseConfig, MongoUserStore, UserStore};
pub use models::{RegisterRequest, RegisterResponse, User};
pub use service::UserService;
pub use utils::error::{ApiError, AppError, AppResult, ErrorResponse};
pub use utils::validation::{RequestSchema, Schema};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
