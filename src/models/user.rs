//! User Model
//!
//! Core user data structures and type definitions.

use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Role assigned to a user account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    SuperAdmin,
    Moderator,
    #[default]
    User,
    Guest,
}

/// User representation for external API responses
///
/// This struct represents a user profile without sensitive information like password hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Hex form of the document ObjectId
    pub id: String,

    /// User's email address (unique, normalized)
    pub email: String,

    pub username: String,

    pub role: UserRole,

    /// Timestamp when the user account was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the user profile was last modified
    pub updated_at: DateTime<Utc>,
}

/// Stored user document, including the password hash
///
/// This struct mirrors the `users` collection layout. It's never exposed in
/// API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub email: String,

    pub username: String,

    /// bcrypt hashed password
    pub password_hash: String,

    pub role: UserRole,

    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,

    #[serde(rename = "updatedAt")]
    pub updated_at: bson::DateTime,
}

/// Fields required to insert a new user
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
}

impl UserDocument {
    /// Builds a document ready for insertion, stamping both timestamps with
    /// the same instant
    pub fn from_new(user: NewUser) -> Self {
        let now = bson::DateTime::now();
        Self {
            id: None,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        }
    }
}

fn to_utc(timestamp: bson::DateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(timestamp.timestamp_millis()).unwrap_or_default()
}

impl From<UserDocument> for User {
    /// Convert the stored document to the public user struct
    ///
    /// This conversion strips the password hash, ensuring it's never
    /// accidentally exposed in API responses.
    fn from(document: UserDocument) -> Self {
        User {
            id: document.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: document.email,
            username: document.username,
            role: document.role,
            created_at: to_utc(document.created_at),
            updated_at: to_utc(document.updated_at),
        }
    }
}
