//! Models Module
//!
//! Stored documents, public views and request/response payloads.

pub mod requests;
pub mod user;

// Re-export commonly used types
pub use requests::{HealthResponse, ListUsersQuery, RegisterRequest, RegisterResponse, UserPath};
pub use user::{NewUser, User, UserDocument, UserRole};
