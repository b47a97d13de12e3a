//! Service Layer
//!
//! Business logic for the registry service.

pub mod user;

// Re-export services
pub use user::{UserService, UserServiceError, UserServiceResult};
