//! Database Connection Management
//!
//! An explicitly constructed MongoDB handle. It is created once at startup,
//! cloned into whatever needs it and shut down when the server stops.

use std::time::Duration;

use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions},
    Client, Collection, IndexModel,
};

use super::users::StoreError;
use crate::config::{env, ConfigError};
use crate::models::user::UserDocument;

/// Name of the collection holding user documents
pub const USERS_COLLECTION: &str = "users";

/// Database configuration for connection setup
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub uri: String,
    /// Overrides the database named in the URI
    pub database_name: Option<String>,
    pub max_pool_size: u32,
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017/user_registry".to_string(),
            database_name: None,
            max_pool_size: 10,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl DatabaseConfig {
    /// Create database configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let uri = env::get_required("MONGO_URI")?;
        url::Url::parse(&uri).map_err(|e| ConfigError::InvalidUrl {
            key: "MONGO_URI",
            reason: e.to_string(),
        })?;

        Ok(Self {
            uri,
            database_name: env::get_optional("MONGO_DATABASE"),
            max_pool_size: env::get_parsed("MONGO_MAX_POOL_SIZE", 10)?,
            connect_timeout: Duration::from_secs(env::get_parsed("MONGO_CONNECT_TIMEOUT", 10)?),
        })
    }
}

/// Handle to the application database
#[derive(Clone, Debug)]
pub struct Database {
    client: Client,
    db: mongodb::Database,
}

impl Database {
    /// Connects using `config` and makes sure the collections' indexes exist
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.max_pool_size = Some(config.max_pool_size);
        options.connect_timeout = Some(config.connect_timeout);
        options.app_name = Some("user-registry".to_string());

        let client = Client::with_options(options)?;
        let db = match &config.database_name {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .ok_or(StoreError::MissingDatabaseName)?,
        };

        let database = Self { client, db };
        database.ping().await?;
        database.ensure_indexes().await?;

        log::info!("Connected to MongoDB database '{}'", database.db.name());
        Ok(database)
    }

    /// Round-trips a ping command to the server
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users().create_index(unique_email).await?;
        Ok(())
    }

    pub fn users(&self) -> Collection<UserDocument> {
        self.db.collection(USERS_COLLECTION)
    }

    /// Closes every pooled connection. The handle must not be used afterwards.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        log::info!("MongoDB connection closed");
    }
}
