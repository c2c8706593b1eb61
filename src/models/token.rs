use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::user::User;

/// Stored extension token row. Only the SHA-256 digest of the bearer value is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExtensionToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ExtensionToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn info(&self) -> TokenInfo {
        TokenInfo {
            user_id: self.user_id,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            last_used_at: self.last_used_at,
        }
    }
}

/// Token metadata safe to hand back to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Result of `TokenService::issue`. The raw `token` exists only here.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub info: TokenInfo,
}

/// Result of a successful validation.
#[derive(Debug, Clone)]
pub struct Validated {
    pub user: User,
    pub token_info: TokenInfo,
}

/// Why a presented token was refused. Closed set; the HTTP layer maps each
/// variant to a fixed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Invalid token")]
    NotFound,

    #[error("Expired")]
    Expired,

    #[error("Revoked")]
    Revoked,

    #[error("User no longer exists")]
    DanglingUser,
}

impl ValidationFailure {
    /// Short machine-readable tag used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationFailure::NotFound => "not_found",
            ValidationFailure::Expired => "expired",
            ValidationFailure::Revoked => "revoked",
            ValidationFailure::DanglingUser => "dangling_user",
        }
    }
}
