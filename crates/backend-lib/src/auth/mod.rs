// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod headers;
pub mod password;
pub mod session;
pub mod token;

pub use headers::{api_key, bearer_token};
pub use session::SessionManager;
pub use token::TokenService;
