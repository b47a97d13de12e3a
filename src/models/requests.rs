//! Request and Response Models
//!
//! Data structures for API request and response payloads, each paired with
//! the schema that guards its route.

use serde::{Deserialize, Serialize};

use crate::database::SortOrder;
use crate::models::user::UserDocument;
use crate::utils::validation::{RequestSchema, Schema};

/// Minimum username length in characters
pub const USERNAME_MIN_LENGTH: usize = 2;

/// Minimum password length in characters
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Request payload for registering a new user account
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl RegisterRequest {
    /// The register route takes a body and nothing else
    pub fn schema() -> RequestSchema {
        RequestSchema::new()
            .body(Schema::object([
                ("email", Schema::email()),
                ("username", Schema::string().min_len(USERNAME_MIN_LENGTH)),
                ("password", Schema::string().min_len(PASSWORD_MIN_LENGTH)),
            ]))
            .query(Schema::empty_object())
            .params(Schema::empty_object())
    }
}

/// Response for user registration
#[derive(Debug, Serialize, PartialEq)]
pub struct RegisterResponse {
    pub id: String,
    pub email: String,
    pub username: String,
}

impl From<UserDocument> for RegisterResponse {
    fn from(document: UserDocument) -> Self {
        Self {
            id: document.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: document.email,
            username: document.username,
        }
    }
}

/// Query parameters for listing users
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

impl ListUsersQuery {
    pub fn schema() -> RequestSchema {
        RequestSchema::new().query(Schema::object([(
            "sort",
            Schema::one_of(["asc", "desc"]).optional(),
        )]))
    }
}

/// Path parameters addressing a single user
#[derive(Debug, Clone, Deserialize)]
pub struct UserPath {
    pub id: String,
}

impl UserPath {
    pub fn schema() -> RequestSchema {
        RequestSchema::new().params(Schema::object([("id", Schema::object_id())]))
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}
