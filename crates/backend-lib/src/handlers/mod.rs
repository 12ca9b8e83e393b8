// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers. Each one pulls its inputs out of the request and hands
//! them to [`crate::auth::SessionManager`] or the storage backend.

pub mod admin;
pub mod chirps;
pub mod users;
