// ============================
// crates/backend-lib/src/handlers/users.rs
// ============================
//! Account, token and webhook endpoints.
use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chirpy_common::{CredentialsRequest, RecordId, TokenResponse, UserResponse, WebhookRequest};

use crate::auth::{api_key, bearer_token};
use crate::error::AppError;
use crate::storage::Storage;
use crate::AppState;

pub async fn create_user<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state
        .sessions
        .register(&request.email, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .sessions
        .update_user(bearer_token(&headers), &request.email, &request.password)
        .await?;
    Ok(Json(user))
}

pub async fn list_users<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.storage().list_users().await?;
    Ok(Json(users.iter().map(|u| u.public()).collect()))
}

pub async fn get_user<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<RecordId>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(state.storage().get_user(user_id).await?.public()))
}

pub async fn login<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .sessions
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(user))
}

pub async fn refresh<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    let token = state.sessions.refresh(bearer_token(&headers)).await?;
    Ok(Json(TokenResponse { token }))
}

pub async fn revoke<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    state.sessions.revoke(bearer_token(&headers)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Payment provider callback, authenticated with `Authorization: ApiKey <key>`
pub async fn polka_webhook<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(request): Json<WebhookRequest>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .upgrade_user(api_key(&headers), &request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
