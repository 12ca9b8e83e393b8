// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Signed access and refresh tokens.
//!
//! Both kinds are HS256 JWTs signed with the same secret. They differ only in
//! the issuer claim and lifetime, so parsing a token says nothing about which
//! kind it is; callers compare [`Claims::kind`] against what the endpoint
//! expects and consult the revocation set for refresh tokens.
use std::time::Duration;
use chirpy_common::RecordId;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey,
    EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;

/// Access token lifetime (1 hour)
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Refresh token lifetime (60 days)
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 60);

pub const ACCESS_ISSUER: &str = "chirpy-access";
pub const REFRESH_ISSUER: &str = "chirpy-refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn issuer(self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_ISSUER,
            TokenKind::Refresh => REFRESH_ISSUER,
        }
    }

    pub fn ttl(self) -> Duration {
        match self {
            TokenKind::Access => ACCESS_TOKEN_TTL,
            TokenKind::Refresh => REFRESH_TOKEN_TTL,
        }
    }

    pub fn from_issuer(issuer: &str) -> Option<Self> {
        match issuer {
            ACCESS_ISSUER => Some(TokenKind::Access),
            REFRESH_ISSUER => Some(TokenKind::Refresh),
            _ => None,
        }
    }
}

/// Registered claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer, one of the token kind namespaces
    pub iss: String,
    /// Subject: user id as a decimal string
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: u64,
    /// Expiration time (unix seconds)
    pub exp: u64,
    /// Unique per issuance, so two tokens are never the same string
    pub jti: String,
}

impl Claims {
    pub fn new(kind: TokenKind, user_id: RecordId) -> Self {
        let now = get_current_timestamp();
        Self {
            iss: kind.issuer().to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now + kind.ttl().as_secs(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Token kind named by the issuer claim, if it is one of ours
    pub fn kind(&self) -> Option<TokenKind> {
        TokenKind::from_issuer(&self.iss)
    }

    pub fn user_id(&self) -> Result<RecordId, TokenError> {
        self.sub
            .parse()
            .map_err(|_| TokenError::InvalidSubject(self.sub.clone()))
    }
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),

    #[error("invalid subject: {0:?}")]
    InvalidSubject(String),

    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(e) => AppError::Internal(format!("failed to sign token: {e}")),
            other => AppError::Unauthenticated(other.to_string()),
        }
    }
}

/// Issues and verifies tokens with one shared HMAC secret
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn issue_access_token(&self, user_id: RecordId) -> Result<String, TokenError> {
        self.sign(&Claims::new(TokenKind::Access, user_id))
    }

    pub fn issue_refresh_token(&self, user_id: RecordId) -> Result<String, TokenError> {
        self.sign(&Claims::new(TokenKind::Refresh, user_id))
    }

    /// Sign arbitrary claims
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Verify signature and expiry. Issuer and revocation are not checked.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            })
    }
}
