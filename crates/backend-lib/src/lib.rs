// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the Chirpy server.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;
use crate::auth::{SessionManager, TokenService};
use crate::config::Settings;
use crate::metrics::HitCounter;
use crate::storage::Storage;

/// Application state shared across all handlers
pub struct AppState<S> {
    /// Login, token and authorize-then-mutate flows
    pub sessions: SessionManager<S>,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
    /// Requests served from `/app`
    pub hits: HitCounter,
}

impl<S: Storage> AppState<S> {
    /// Create a new application state
    pub fn new(storage: S, settings: Settings) -> Self {
        let tokens = Arc::new(TokenService::new(settings.jwt_secret.as_bytes()));
        let sessions = SessionManager::new(Arc::new(storage), tokens, settings.polka_key.clone());

        Self {
            sessions,
            settings: Arc::new(settings),
            hits: HitCounter::new(),
        }
    }

    /// Storage backend
    pub fn storage(&self) -> &S {
        self.sessions.storage()
    }
}
