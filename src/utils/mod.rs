//! Utilities Module
//!
//! Shared utilities for error handling, password hashing and request
//! validation used throughout the registry service.

pub mod error;
pub mod security;
pub mod validation;

// Re-export commonly used utilities
pub use error::{ApiError, AppError, AppResult, ErrorResponse};
pub use security::{hash_password_with_cost, verify_password, DEFAULT_BCRYPT_COST};
pub use validation::{RequestSchema, Schema, ValidatedInput, ValidationFailure};
