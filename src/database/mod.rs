//! Database Module
//!
//! MongoDB connection management and the user persistence port.

pub mod connection;
#[cfg(test)]
pub mod memory;
pub mod users;

// Re-export commonly used types
pub use connection::{Database, DatabaseConfig};
pub use users::{MongoUserStore, SortOrder, StoreError, StoreResult, UserStore};
