//! Security Utilities
//!
//! Password hashing helpers.

use bcrypt::{hash, verify};

/// Default bcrypt cost for password hashing
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Hash a password with custom bcrypt cost
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}
