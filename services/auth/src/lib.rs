//! Credential and token service
//!
//! Password hashing, signed access/refresh tokens, one-time tokens for email
//! verification and password reset, the fixed-window rate limiter and input
//! validation rules shared by the HTTP layer.

pub mod jwt;
pub mod one_time;
pub mod password;
pub mod rate_limiter;
pub mod validation;

pub use jwt::{AccessClaims, AccessSubject, JwtConfig, JwtService, RefreshClaims, TokenError, TokenType};
pub use one_time::{ONE_TIME_TOKEN_TTL, OneTimeToken, hash_token};
pub use password::{HashedPassword, PasswordHasher};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
