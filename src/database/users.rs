//! User Persistence
//!
//! The [`UserStore`] port used by the user service and its MongoDB adapter.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    error::{ErrorKind, WriteFailure},
    Collection,
};
use serde::Deserialize;
use thiserror::Error;

use super::connection::Database;
use crate::models::user::{NewUser, UserDocument};

/// Server error code for unique index violations
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Errors raised by a user store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Driver or server failure
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A unique index rejected the write
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The server acknowledged an insert without returning an ObjectId
    #[error("Inserted document id is not an ObjectId")]
    UnexpectedId,

    /// Neither the configuration nor the URI names a database
    #[error("No database name in configuration or connection string")]
    MissingDatabaseName,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ordering applied when listing users
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Storage order
    #[default]
    Natural,
    /// Oldest first
    Asc,
    /// Newest first
    Desc,
}

/// Persistence operations on the users collection
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserDocument>>;

    async fn find_by_id(&self, id: &ObjectId) -> StoreResult<Option<UserDocument>>;

    /// Inserts the user and returns the stored document with its id
    async fn insert(&self, user: NewUser) -> StoreResult<UserDocument>;

    async fn list(&self, order: SortOrder) -> StoreResult<Vec<UserDocument>>;
}

/// [`UserStore`] backed by a MongoDB collection
#[derive(Clone, Debug)]
pub struct MongoUserStore {
    collection: Collection<UserDocument>,
}

impl MongoUserStore {
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.users(),
        }
    }
}

fn sort_document(order: SortOrder) -> Option<Document> {
    match order {
        SortOrder::Natural => None,
        SortOrder::Asc => Some(doc! { "createdAt": 1 }),
        SortOrder::Desc => Some(doc! { "createdAt": -1 }),
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserDocument>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_id(&self, id: &ObjectId) -> StoreResult<Option<UserDocument>> {
        Ok(self.collection.find_one(doc! { "_id": *id }).await?)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<UserDocument> {
        let mut document = UserDocument::from_new(user);
        let result = self
            .collection
            .insert_one(&document)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::DuplicateKey(document.email.clone())
                } else {
                    StoreError::Mongo(e)
                }
            })?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or(StoreError::UnexpectedId)?;
        document.id = Some(id);
        Ok(document)
    }

    async fn list(&self, order: SortOrder) -> StoreResult<Vec<UserDocument>> {
        let cursor = match sort_document(order) {
            Some(sort) => self.collection.find(doc! {}).sort(sort).await?,
            None => self.collection.find(doc! {}).await?,
        };
        Ok(cursor.try_collect().await?)
    }
}
