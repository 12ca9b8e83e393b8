// ============================
// crates/backend-lib/src/handlers/chirps.rs
// ============================
//! Chirp endpoints.
use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chirpy_common::{ChirpRequest, ChirpResponse, RecordId, SortOrder};
use serde::Deserialize;

use crate::auth::bearer_token;
use crate::error::AppError;
use crate::storage::Storage;
use crate::validation::parse_author_id;
use crate::AppState;

/// `GET /api/chirps` query string
#[derive(Debug, Default, Deserialize)]
pub struct ListChirpsQuery {
    pub sort: Option<String>,
    pub author_id: Option<String>,
}

pub async fn create_chirp<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(request): Json<ChirpRequest>,
) -> Result<(StatusCode, Json<ChirpResponse>), AppError> {
    let chirp = state
        .sessions
        .create_chirp(bearer_token(&headers), &request.body)
        .await?;
    Ok((StatusCode::CREATED, Json(chirp.into())))
}

pub async fn list_chirps<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListChirpsQuery>,
) -> Result<Json<Vec<ChirpResponse>>, AppError> {
    let order = SortOrder::from_query(query.sort.as_deref());
    let author_id = parse_author_id(query.author_id.as_deref())?;
    let chirps = state.storage().list_chirps(order, author_id).await?;
    Ok(Json(chirps.into_iter().map(Into::into).collect()))
}

pub async fn get_chirp<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(chirp_id): Path<RecordId>,
) -> Result<Json<ChirpResponse>, AppError> {
    Ok(Json(state.storage().get_chirp(chirp_id).await?.into()))
}

pub async fn delete_chirp<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(chirp_id): Path<RecordId>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .delete_chirp(bearer_token(&headers), chirp_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
