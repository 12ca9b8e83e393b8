// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input validation and the chirp profanity filter.

use thiserror::Error;

use crate::error::AppError;

/// Longest chirp body accepted, in characters
pub const MAX_CHIRP_LENGTH: usize = 140;

/// Words replaced by [`REPLACEMENT`] in chirp bodies
const BANNED_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];

const REPLACEMENT: &str = "****";

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Chirp is too long")]
    ChirpTooLong,

    #[error("Email must not be empty")]
    EmptyEmail,

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Invalid author id: {0}")]
    InvalidAuthorId(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Reject bodies longer than [`MAX_CHIRP_LENGTH`] characters
pub fn validate_chirp_body(body: &str) -> ValidationResult<&str> {
    if body.chars().count() > MAX_CHIRP_LENGTH {
        return Err(ValidationError::ChirpTooLong);
    }
    Ok(body)
}

/// Registration and profile updates need both fields
pub fn validate_credentials<'a>(email: &'a str, password: &str) -> ValidationResult<&'a str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    Ok(email)
}

/// Parse the `author_id` query parameter
pub fn parse_author_id(raw: Option<&str>) -> ValidationResult<Option<u64>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| ValidationError::InvalidAuthorId(s.to_string())),
    }
}

fn is_banned(word: &str) -> bool {
    BANNED_WORDS.iter().any(|b| word.eq_ignore_ascii_case(b))
}

/// Replace banned words with `****`.
///
/// Words are split on single spaces, so `kerfuffle!` passes through untouched.
pub fn clean_body(body: &str) -> String {
    body.split(' ')
        .map(|word| if is_banned(word) { REPLACEMENT } else { word })
        .collect::<Vec<_>>()
        .join(" ")
}
