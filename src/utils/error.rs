//! Error Handling Utilities
//!
//! The typed application error, the crate-wide error enum and the single
//! place where any failure is turned into the client-visible JSON body.

use std::any::Any;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::database::StoreError;

/// Message sent to clients for every unclassified failure
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal Server Error";

/// Typed application error carrying an HTTP status and optional details
///
/// Raised wherever a handler or middleware detects an invalid or conflicting
/// condition. Its status, message and details are exposed to the client
/// unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// 400 Bad Request, invalid input data
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 409 Conflict, a domain invariant such as a unique key was violated
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// 413 Payload Too Large
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }
}

/// Main application error type that can represent errors from any layer
#[derive(Error, Debug)]
pub enum AppError {
    /// Typed errors whose representation is chosen by the raiser
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Persistence failures
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing errors
    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    /// Generic internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),

    /// A handler panicked; carries the panic payload when it was a string
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl AppError {
    /// Builds an error from a caught panic payload, keeping its text verbatim
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "non-string panic payload".to_string(),
            },
        };
        AppError::Panicked(message)
    }

    /// Returns the typed error when this failure is a client-facing one
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            AppError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status the client will receive for this error
    pub fn status(&self) -> StatusCode {
        self.as_api_error()
            .map(|err| err.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Standard error response structure for API endpoints
#[derive(Serialize, Debug, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            details: None,
        }
    }

    pub fn internal() -> Self {
        Self::new(INTERNAL_SERVER_ERROR_MESSAGE)
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Api(api) => Self {
                message: api.message.clone(),
                details: api.details.clone(),
            },
            _ => Self::internal(),
        }
    }
}

/// Marker left on error responses so the responder layer can observe the
/// original failure
#[derive(Clone, Debug)]
pub struct RaisedError(pub Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(ErrorResponse::from(&self))).into_response();
        response
            .extensions_mut()
            .insert(RaisedError(Arc::new(self)));
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// Result type alias for operations that can return AppError
pub type AppResult<T> = Result<T, AppError>;
