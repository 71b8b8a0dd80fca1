//! Session lifecycle
//!
//! A user has at most one active session: the digest of the latest refresh
//! token is kept on the user document and every login, refresh, logout and
//! password reset goes through [`SessionManager`]. Presenting a refresh
//! token other than the latest one is rejected.

use auth::{AccessSubject, JwtService, hash_token};
use common::store::{Filter, Update};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{PublicUser, User};
use crate::repositories::UserRepository;

const REFRESH_TOKEN_FIELD: &str = "refreshToken";

/// Tokens handed to the client
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    users: UserRepository,
    jwt: JwtService,
}

impl SessionManager {
    pub fn new(users: UserRepository, jwt: JwtService) -> Self {
        Self { users, jwt }
    }

    /// Start a new session, replacing any previous one
    pub async fn issue(&self, user: &User) -> ApiResult<SessionTokens> {
        let tokens = self.sign(user)?;
        self.users
            .update(
                user.id,
                &[Update::set(REFRESH_TOKEN_FIELD, hash_token(&tokens.refresh_token))],
            )
            .await?
            .ok_or_else(ApiError::unauthorized)?;

        info!("Issued session for user {}", user.id);
        Ok(tokens)
    }

    /// Exchange the current refresh token for a new pair
    pub async fn rotate(&self, presented: &str) -> ApiResult<(User, SessionTokens)> {
        let claims = self.jwt.validate_refresh_token(presented).map_err(|e| {
            warn!("Rejected refresh token: {}", e);
            ApiError::Unauthorized("Invalid refresh token".to_string())
        })?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

        let presented_digest = hash_token(presented);
        if user.refresh_token.as_deref() != Some(presented_digest.as_str()) {
            warn!("Superseded refresh token presented for user {}", user.id);
            return Err(ApiError::Unauthorized(
                "Refresh token is expired or used".to_string(),
            ));
        }

        let tokens = self.sign(&user)?;
        // Conditional on the old digest so two concurrent refreshes cannot both win
        let user = self
            .users
            .update_if(
                user.id,
                Filter::eq(REFRESH_TOKEN_FIELD, presented_digest),
                &[Update::set(REFRESH_TOKEN_FIELD, hash_token(&tokens.refresh_token))],
            )
            .await?
            .ok_or_else(|| {
                ApiError::Unauthorized("Refresh token is expired or used".to_string())
            })?;

        info!("Rotated session for user {}", user.id);
        Ok((user, tokens))
    }

    /// End the user's session
    pub async fn revoke(&self, user_id: Uuid) -> ApiResult<()> {
        self.users
            .update(user_id, &[Update::Unset(REFRESH_TOKEN_FIELD.to_string())])
            .await?;
        info!("Revoked session for user {}", user_id);
        Ok(())
    }

    /// Resolve an access token to the user it was issued for
    pub async fn authenticate(&self, access_token: &str) -> ApiResult<PublicUser> {
        let claims = self.jwt.validate_access_token(access_token).map_err(|e| {
            warn!("Rejected access token: {}", e);
            ApiError::Unauthorized("Invalid access token".to_string())
        })?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid access token".to_string()))?;

        Ok(user.into())
    }

    fn sign(&self, user: &User) -> ApiResult<SessionTokens> {
        let subject = AccessSubject {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
        };
        let access_token = self
            .jwt
            .generate_access_token(&subject)
            .map_err(|e| ApiError::Internal(e.into()))?;
        let refresh_token = self
            .jwt
            .generate_refresh_token(user.id)
            .map_err(|e| ApiError::Internal(e.into()))?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }
}
