// ============================
// crates/backend-lib/src/handlers/admin.rs
// ============================
//! Health, hit counter and admin page.
use std::sync::Arc;
use axum::{extract::State, response::Html};

use crate::storage::Storage;
use crate::AppState;

pub async fn healthz() -> &'static str {
    "OK"
}

/// Plain-text hit count
pub async fn hits<S: Storage + 'static>(State(state): State<Arc<AppState<S>>>) -> String {
    format!("Hits: {}", state.hits.get())
}

pub async fn reset_hits<S: Storage + 'static>(State(state): State<Arc<AppState<S>>>) -> String {
    state.hits.reset();
    tracing::info!("hit counter reset");
    "Hits reset to 0".to_string()
}

pub async fn metrics_page<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Html<String> {
    Html(format!(
        "<html>\n  <body>\n    <h1>Welcome, Chirpy Admin</h1>\n    <p>Chirpy has been visited {} times!</p>\n  </body>\n</html>\n",
        state.hits.get()
    ))
}
