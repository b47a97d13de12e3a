//! User Service Implementation
//!
//! Core business logic for user registration and lookup.

use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use thiserror::Error;
use tokio::task::JoinError;

use crate::database::{SortOrder, StoreError, UserStore};
use crate::models::user::{NewUser, User, UserDocument, UserRole};
use crate::utils::{
    error::{ApiError, AppError},
    security::{hash_password_with_cost, DEFAULT_BCRYPT_COST},
    validation::normalize_email,
};

/// Custom error types for the user service
#[derive(Error, Debug)]
pub enum UserServiceError {
    /// User with the specified identifier was not found
    #[error("User not found")]
    UserNotFound,

    /// Attempted to create a user with an email that already exists
    #[error("Email already exists")]
    EmailAlreadyExists,

    /// The identifier is not a valid ObjectId
    #[error("Invalid user id: {0}")]
    InvalidId(String),

    /// Persistence operation failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing operation failed
    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    /// The blocking hashing task was cancelled or panicked
    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::UserNotFound => ApiError::not_found("User not found").into(),
            UserServiceError::EmailAlreadyExists => {
                ApiError::conflict("Email already exists").into()
            }
            UserServiceError::InvalidId(_) => ApiError::bad_request("Invalid ObjectId").into(),
            UserServiceError::Store(e) => AppError::Store(e),
            UserServiceError::Hashing(e) => AppError::Hashing(e),
            UserServiceError::TaskFailed(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Result type for user service operations
pub type UserServiceResult<T> = Result<T, UserServiceError>;

/// Core user service providing registration and lookup
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,

    /// bcrypt cost factor for password hashing (higher = more secure but slower)
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self::with_bcrypt_cost(store, DEFAULT_BCRYPT_COST)
    }

    pub fn with_bcrypt_cost(store: Arc<dyn UserStore>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    /// Registers a new account and returns the stored document
    ///
    /// Input is assumed to have passed the register schema. The email is
    /// normalized before the uniqueness check so lookups are case-insensitive.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> UserServiceResult<UserDocument> {
        let email = normalize_email(email);

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(UserServiceError::EmailAlreadyExists);
        }

        let password = password.to_string();
        let cost = self.bcrypt_cost;
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password_with_cost(&password, cost))
                .await??;

        let new_user = NewUser {
            email,
            username: username.to_string(),
            password_hash,
            role: UserRole::User,
        };

        // A concurrent registration can still win the race to the unique index
        let document = self.store.insert(new_user).await.map_err(|e| match e {
            StoreError::DuplicateKey(_) => UserServiceError::EmailAlreadyExists,
            other => UserServiceError::Store(other),
        })?;

        log::info!("Registered user {}", document.email);
        Ok(document)
    }

    /// Lists every user in the requested order
    pub async fn list_users(&self, order: SortOrder) -> UserServiceResult<Vec<User>> {
        let documents = self.store.list(order).await?;
        Ok(documents.into_iter().map(User::from).collect())
    }

    /// Retrieves a user by the hex form of their id
    pub async fn get_user_by_id(&self, user_id: &str) -> UserServiceResult<User> {
        let id = ObjectId::parse_str(user_id)
            .map_err(|_| UserServiceError::InvalidId(user_id.to_string()))?;

        self.store
            .find_by_id(&id)
            .await?
            .map(User::from)
            .ok_or(UserServiceError::UserNotFound)
    }
}
