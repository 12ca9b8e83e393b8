// ============================
// crates/common/src/lib.rs
// ============================
//! Request and response bodies exchanged between Chirpy clients and the server.
//!
//! Everything in here is plain data; the server-side records live in
//! `backend-lib::storage` and are projected into these types before they
//! leave the process.

use serde::{Deserialize, Serialize};

/// Identifier type for users and chirps
pub type RecordId = u64;

/// Webhook event name that grants a user Chirpy Red
pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

/// Email/password pair used by registration, login and profile updates
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Body of a new chirp
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChirpRequest {
    pub body: String,
}

/// A chirp as returned to clients
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChirpResponse {
    pub id: RecordId,
    pub author_id: RecordId,
    pub body: String,
}

/// Public projection of a user. Never carries the password hash.
///
/// `token` and `refresh_token` are only filled in by a successful login.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub id: RecordId,
    pub email: String,
    pub is_chirpy_red: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Freshly minted access token
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenResponse {
    pub token: String,
}

/// Payment provider webhook body
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WebhookRequest {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WebhookData {
    pub user_id: RecordId,
}

/// Ordering of chirp listings, by id
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse a `sort` query value. Anything other than `desc` is ascending.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_from_query() {
        assert_eq!(SortOrder::from_query(None), SortOrder::Asc);
        assert_eq!(SortOrder::from_query(Some("asc")), SortOrder::Asc);
        assert_eq!(SortOrder::from_query(Some("desc")), SortOrder::Desc);
        assert_eq!(SortOrder::from_query(Some("DESC")), SortOrder::Desc);
        assert_eq!(SortOrder::from_query(Some("sideways")), SortOrder::Asc);
    }

    #[test]
    fn test_user_response_skips_missing_tokens() {
        let user = UserResponse {
            id: 1,
            email: "walt@breakingbad.com".to_string(),
            is_chirpy_red: false,
            token: None,
            refresh_token: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("token").is_none());
        assert!(json.get("refresh_token").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "walt@breakingbad.com");
    }

    #[test]
    fn test_webhook_request_shape() {
        let raw = r#"{"event":"user.upgraded","data":{"user_id":3}}"#;
        let req: WebhookRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.event, USER_UPGRADED_EVENT);
        assert_eq!(req.data.user_id, 3);
    }
}
