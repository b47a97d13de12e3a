//! HTTP Request Handlers
//!
//! Axum handlers for processing HTTP requests and responses. Every handler
//! runs behind its route's validator, so inputs arrive already checked.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    api::middleware::{ValidatedBody, ValidatedParams, ValidatedQuery},
    models::{requests::*, user::User},
    service::UserService,
    utils::error::{ApiError, AppError, AppResult},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
}

impl AppState {
    pub fn new(user_service: UserService) -> Self {
        Self {
            user_service: Arc::new(user_service),
        }
    }
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    ValidatedBody(request): ValidatedBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let document = state
        .user_service
        .register(&request.email, &request.username, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(document.into())))
}

/// List users, optionally ordered by creation time
pub async fn list_users(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ListUsersQuery>,
) -> AppResult<Json<Vec<User>>> {
    let users = state
        .user_service
        .list_users(query.sort.unwrap_or_default())
        .await?;
    Ok(Json(users))
}

/// Get a user by id
pub async fn get_user(
    State(state): State<AppState>,
    ValidatedParams(path): ValidatedParams<UserPath>,
) -> AppResult<Json<User>> {
    let user = state.user_service.get_user_by_id(&path.id).await?;
    Ok(Json(user))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Fallback for unmatched paths
pub async fn not_found() -> AppError {
    ApiError::not_found("Not Found").into()
}
