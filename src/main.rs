//! User Registry Server
//!
//! Loads configuration from the environment, connects to MongoDB and serves
//! the registration API until Ctrl-C.

use std::sync::Arc;

use dotenv::dotenv;

use user_registry::{
    api::{create_app, AppState},
    config::AppConfig,
    database::{Database, MongoUserStore},
    service::UserService,
};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv().ok();

    let config = AppConfig::from_env()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.server.log_level.as_str()),
    )
    .init();

    log::info!(
        "Starting User Registry v{} in {} mode",
        user_registry::VERSION,
        config.server.mode
    );

    let database = Database::connect(&config.database).await?;

    let store = Arc::new(MongoUserStore::new(&database));
    let user_service = UserService::with_bcrypt_cost(store, config.server.bcrypt_cost);
    let app = create_app(AppState::new(user_service), &config.server);

    let bind_addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on {}", bind_addr);
    log::info!("Allowed CORS origins: {}", config.server.cors_origins.join(", "));
    log::info!("Frontend: {}", config.server.frontend_base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.shutdown().await;
    log::info!("Server stopped");
    Ok(())
}
