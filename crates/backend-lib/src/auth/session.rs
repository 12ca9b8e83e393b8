// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Request flows that combine credentials, tokens and storage.
//!
//! Every authenticated flow walks the same linear path: pull the bearer token,
//! verify it, check that it is the right kind, check revocation (refresh
//! tokens only), take the subject as the acting user, then make exactly one
//! storage call. Any step can end the request with an error; nothing is
//! retried.
use std::sync::Arc;
use chirpy_common::{RecordId, UserResponse, WebhookRequest, USER_UPGRADED_EVENT};
use metrics::counter;
use tracing::{debug, info, warn};

use super::password::{hash_password_blocking, verify_password_blocking};
use super::token::{TokenKind, TokenService};
use crate::error::{AppError, ForbiddenReason};
use crate::metrics as keys;
use crate::storage::{Chirp, Storage};
use crate::validation::{clean_body, validate_chirp_body, validate_credentials};

/// The only message a failed login ever produces
pub const INVALID_CREDENTIALS: &str = "incorrect email or password";

/// Session flows over a storage backend
pub struct SessionManager<S> {
    storage: Arc<S>,
    tokens: Arc<TokenService>,
    api_key: String,
}

impl<S: Storage> SessionManager<S> {
    pub fn new(storage: Arc<S>, tokens: Arc<TokenService>, api_key: impl Into<String>) -> Self {
        Self {
            storage,
            tokens,
            api_key: api_key.into(),
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    async fn validate(
        &self,
        bearer: Option<&str>,
        expected: TokenKind,
        check_revocation: bool,
    ) -> Result<RecordId, AppError> {
        let token =
            bearer.ok_or_else(|| AppError::Unauthenticated("missing bearer token".to_string()))?;

        let claims = self.tokens.parse(token)?;

        if claims.kind() != Some(expected) {
            warn!(issuer = %claims.iss, expected = expected.issuer(), "token kind rejected");
            return Err(AppError::Forbidden(ForbiddenReason::WrongTokenKind));
        }

        if check_revocation && self.storage.revoked_tokens().await?.contains(token) {
            warn!(subject = %claims.sub, "revoked refresh token presented");
            return Err(AppError::Forbidden(ForbiddenReason::Revoked));
        }

        Ok(claims.user_id()?)
    }

    /// Resolve a bearer token to the acting user id.
    ///
    /// Only refresh tokens are checked against the revocation set.
    pub async fn authorize(
        &self,
        bearer: Option<&str>,
        expected: TokenKind,
    ) -> Result<RecordId, AppError> {
        self.validate(bearer, expected, expected == TokenKind::Refresh)
            .await
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<UserResponse, AppError> {
        let email = validate_credentials(email, password)?;
        let hash = hash_password_blocking(password.to_string()).await?;
        let user = self.storage.create_user(email, &hash).await?;

        counter!(keys::USER_CREATED).increment(1);
        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Verify credentials and hand out an access/refresh token pair.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserResponse, AppError> {
        let Some(user) = self.storage.find_user_by_email(email.trim()).await? else {
            return Err(self.login_failed("unknown email"));
        };

        if !verify_password_blocking(user.password_hash.clone(), password.to_string()).await? {
            return Err(self.login_failed("password mismatch"));
        }

        let access = self.tokens.issue_access_token(user.id)?;
        let refresh = self.tokens.issue_refresh_token(user.id)?;

        counter!(keys::LOGIN_SUCCEEDED).increment(1);
        info!(user_id = user.id, "login succeeded");

        Ok(UserResponse {
            token: Some(access),
            refresh_token: Some(refresh),
            ..user.public()
        })
    }

    fn login_failed(&self, cause: &'static str) -> AppError {
        counter!(keys::LOGIN_FAILED).increment(1);
        debug!(cause, "login failed");
        AppError::Unauthenticated(INVALID_CREDENTIALS.to_string())
    }

    /// Mint a new access token from an unrevoked refresh token
    pub async fn refresh(&self, bearer: Option<&str>) -> Result<String, AppError> {
        let user_id = self.authorize(bearer, TokenKind::Refresh).await?;
        let token = self.tokens.issue_access_token(user_id)?;

        counter!(keys::TOKEN_REFRESHED).increment(1);
        debug!(user_id, "access token refreshed");
        Ok(token)
    }

    /// Add a refresh token to the revocation set.
    ///
    /// Other tokens of the same user stay valid. Revoking twice is not an error.
    pub async fn revoke(&self, bearer: Option<&str>) -> Result<(), AppError> {
        let user_id = self.validate(bearer, TokenKind::Refresh, false).await?;
        // validate() already rejected a missing token
        let token = bearer.unwrap_or_default();
        self.storage.revoke_token(token).await?;

        counter!(keys::TOKEN_REVOKED).increment(1);
        info!(user_id, "refresh token revoked");
        Ok(())
    }

    pub async fn create_chirp(&self, bearer: Option<&str>, body: &str) -> Result<Chirp, AppError> {
        let user_id = self.authorize(bearer, TokenKind::Access).await?;
        validate_chirp_body(body)?;
        let chirp = self.storage.create_chirp(user_id, &clean_body(body)).await?;

        counter!(keys::CHIRP_CREATED).increment(1);
        info!(user_id, chirp_id = chirp.id, "chirp created");
        Ok(chirp)
    }

    pub async fn delete_chirp(
        &self,
        bearer: Option<&str>,
        chirp_id: RecordId,
    ) -> Result<(), AppError> {
        let user_id = self.authorize(bearer, TokenKind::Access).await?;
        self.storage.delete_chirp(chirp_id, user_id).await?;

        counter!(keys::CHIRP_DELETED).increment(1);
        info!(user_id, chirp_id, "chirp deleted");
        Ok(())
    }

    /// Replace the caller's email and password, keeping the Chirpy Red flag
    pub async fn update_user(
        &self,
        bearer: Option<&str>,
        email: &str,
        password: &str,
    ) -> Result<UserResponse, AppError> {
        let user_id = self.authorize(bearer, TokenKind::Access).await?;
        let email = validate_credentials(email, password)?;
        let hash = hash_password_blocking(password.to_string()).await?;

        let updated = self.storage.update_credentials(user_id, email, &hash).await?;

        info!(user_id, "user updated");
        Ok(updated.public())
    }

    /// Payment provider webhook. Events other than `user.upgraded` are
    /// acknowledged and ignored.
    pub async fn upgrade_user(
        &self,
        api_key: Option<&str>,
        request: &WebhookRequest,
    ) -> Result<(), AppError> {
        match api_key {
            Some(key) if key == self.api_key => {},
            _ => {
                warn!("webhook rejected: bad api key");
                return Err(AppError::Unauthenticated("invalid api key".to_string()));
            },
        }

        if request.event != USER_UPGRADED_EVENT {
            debug!(event = %request.event, "webhook event ignored");
            return Ok(());
        }

        let user_id = request.data.user_id;
        self.storage.mark_user_upgraded(user_id).await?;

        counter!(keys::USER_UPGRADED).increment(1);
        info!(user_id, "user upgraded to chirpy red");
        Ok(())
    }
}
