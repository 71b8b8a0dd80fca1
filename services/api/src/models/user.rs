use auth::HashedPassword;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    pub password: HashedPassword,
    #[serde(default)]
    pub watch_history: Vec<Uuid>,
    #[serde(default)]
    pub is_email_verified: bool,
    /// SHA-256 digest of the active refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verification_token: Option<String>,
    /// Epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verification_expiry: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forgot_password_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forgot_password_expiry: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        fullname: String,
        avatar: String,
        cover_image: Option<String>,
        password: HashedPassword,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            fullname,
            avatar,
            cover_image,
            password,
            watch_history: Vec::new(),
            is_email_verified: false,
            refresh_token: None,
            email_verification_token: None,
            email_verification_expiry: None,
            forgot_password_token: None,
            forgot_password_expiry: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A user as returned to clients and attached to authenticated requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub watch_history: Vec<Uuid>,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            fullname: user.fullname,
            avatar: user.avatar,
            cover_image: user.cover_image,
            watch_history: user.watch_history,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
