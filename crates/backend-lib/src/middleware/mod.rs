// ============================
// crates/backend-lib/src/middleware/mod.rs
// ============================
//! Middleware for the Chirpy server.

pub mod hits;

pub use hits::count_hits;
