//! JWT service for token generation and validation
//!
//! Access and refresh tokens are HS256 tokens signed with separate secrets.
//! Access tokens carry the user's identity fields; refresh tokens carry only
//! the user id and a random `jti`, so two tokens minted in the same second
//! still differ.

use anyhow::Result;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret for signing access tokens
    pub access_token_secret: String,
    /// Secret for signing refresh tokens
    pub refresh_token_secret: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 10 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `ACCESS_TOKEN_SECRET`: Secret for access tokens (required)
    /// - `REFRESH_TOKEN_SECRET`: Secret for refresh tokens (required)
    /// - `ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 864000)
    pub fn from_env() -> Result<Self> {
        let access_token_secret = std::env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("ACCESS_TOKEN_SECRET environment variable not set"))?;

        let refresh_token_secret = std::env::var("REFRESH_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("REFRESH_TOKEN_SECRET environment variable not set"))?;

        if access_token_secret == refresh_token_secret {
            return Err(anyhow::anyhow!(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ"
            ));
        }

        let access_token_expiry = std::env::var("ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "900".to_string()) // 15 minutes
            .parse()
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "864000".to_string()) // 10 days
            .parse()
            .unwrap_or(864000);

        Ok(JwtConfig {
            access_token_secret,
            refresh_token_secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Identity fields embedded in an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSubject {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    pub token_type: TokenType,
}

/// Refresh token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User ID
    pub sub: Uuid,
    /// Unique token id
    pub jti: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    pub token_type: TokenType,
}

/// Reasons a token is rejected
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is not a {0:?} token")]
    WrongType(TokenType),

    #[error("Token is malformed")]
    Malformed,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

fn now_seconds() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| TokenError::Signing(format!("Failed to get current time: {}", e)))
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtService {
            access_encoding_key: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            validation,
            config,
        }
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, subject: &AccessSubject) -> Result<String, TokenError> {
        let now = now_seconds()?;
        let claims = AccessClaims {
            sub: subject.id,
            username: subject.username.clone(),
            email: subject.email.clone(),
            fullname: subject.fullname.clone(),
            iat: now,
            exp: now + self.config.access_token_expiry,
            token_type: TokenType::Access,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.access_encoding_key,
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        let now = now_seconds()?;
        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + self.config.refresh_token_expiry,
            token_type: TokenType::Refresh,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.refresh_encoding_key,
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate an access token and return the claims
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims =
            decode::<AccessClaims>(token, &self.access_decoding_key, &self.validation)?.claims;
        if claims.token_type != TokenType::Access {
            return Err(TokenError::WrongType(TokenType::Access));
        }
        Ok(claims)
    }

    /// Validate a refresh token and return the claims
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims =
            decode::<RefreshClaims>(token, &self.refresh_decoding_key, &self.validation)?.claims;
        if claims.token_type != TokenType::Refresh {
            return Err(TokenError::WrongType(TokenType::Refresh));
        }
        Ok(claims)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }
}
