// ============================
// crates/backend-lib/src/middleware/hits.rs
// ============================
use std::sync::Arc;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use crate::AppState;
use crate::storage::Storage;

/// Count every request that reaches the static file server
pub async fn count_hits<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    request: Request,
    next: Next,
) -> Response {
    let hits = state.hits.increment();
    tracing::trace!(hits, path = %request.uri().path(), "fileserver hit");
    next.run(request).await
}
