// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use std::sync::Arc;
use axum::{
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{admin, chirps, users};
use crate::middleware::count_hits;
use crate::storage::Storage;
use crate::AppState;

/// Create the application router: `/api`, `/admin` and the `/app` file server
pub fn create_router<S: Storage + 'static>(state: Arc<AppState<S>>) -> Router {
    let api = Router::new()
        .route("/healthz", get(admin::healthz))
        .route("/metrics", get(admin::hits::<S>))
        .route("/reset", post(admin::reset_hits::<S>))
        .route(
            "/users",
            post(users::create_user::<S>)
                .put(users::update_user::<S>)
                .get(users::list_users::<S>),
        )
        .route("/users/{user_id}", get(users::get_user::<S>))
        .route("/login", post(users::login::<S>))
        .route("/refresh", post(users::refresh::<S>))
        .route("/revoke", post(users::revoke::<S>))
        .route(
            "/chirps",
            post(chirps::create_chirp::<S>).get(chirps::list_chirps::<S>),
        )
        .route(
            "/chirps/{chirp_id}",
            get(chirps::get_chirp::<S>).delete(chirps::delete_chirp::<S>),
        )
        .route("/polka/webhooks", post(users::polka_webhook::<S>));

    let admin = Router::new().route("/metrics", get(admin::metrics_page::<S>));

    let files = Router::new()
        .nest_service("/app", ServeDir::new(&state.settings.file_root))
        .layer(from_fn_with_state(state.clone(), count_hits::<S>));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .nest("/admin", admin)
        .merge(files)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
