//! Extension token lifecycle: issue, validate, revoke, purge.
//!
//! Validity is recomputed from the stored row on every call. Nothing here
//! caches a verdict.

pub mod codec;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::token::{ExtensionToken, IssuedToken, Validated, ValidationFailure};
use crate::store::{TokenBackend, UserDirectory};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Invalid(#[from] ValidationFailure),

    #[error("session not recognised")]
    Unauthenticated,

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct TokenService {
    tokens: Arc<dyn TokenBackend>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(
        tokens: Arc<dyn TokenBackend>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            tokens,
            users,
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint and persist a token for `user_id`. The raw value is returned once
    /// and never stored.
    pub async fn issue(&self, user_id: Uuid) -> Result<IssuedToken, TokenError> {
        let token = codec::generate();
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("token ttl {} overflows the issue time", self.ttl))?;
        let record = ExtensionToken {
            token_hash: codec::hash(&token),
            user_id,
            issued_at: now,
            expires_at,
            revoked: false,
            last_used_at: None,
        };

        self.tokens.insert_token(&record).await?;

        tracing::info!(
            user_id = %user_id,
            token = %codec::mask(&token),
            expires_at = %record.expires_at,
            "issued extension token"
        );

        Ok(IssuedToken {
            token,
            info: record.info(),
        })
    }

    /// Resolve a web session to its user and issue a token for them.
    pub async fn issue_for_session(&self, session_token: &str) -> Result<IssuedToken, TokenError> {
        let user = self
            .users
            .find_user_by_session(session_token)
            .await?
            .ok_or(TokenError::Unauthenticated)?;
        self.issue(user.id).await
    }

    /// Check a presented token. Failure precedence: not found, expired,
    /// revoked, dangling user.
    pub async fn validate(&self, token: &str) -> Result<Validated, TokenError> {
        if !codec::is_well_formed(token) {
            return Err(ValidationFailure::NotFound.into());
        }

        let token_hash = codec::hash(token);
        let record = self
            .tokens
            .get_token(&token_hash)
            .await?
            .ok_or(ValidationFailure::NotFound)?;

        let now = self.clock.now();
        if record.is_expired_at(now) {
            return Err(ValidationFailure::Expired.into());
        }
        if record.revoked {
            return Err(ValidationFailure::Revoked.into());
        }

        let user = self
            .users
            .find_user_by_id(record.user_id)
            .await?
            .ok_or(ValidationFailure::DanglingUser)?;

        // last_used_at is advisory; a failed write must not fail the caller.
        let last_used_at = match self.tokens.touch_token(&token_hash, now).await {
            Ok(()) => Some(now),
            Err(e) => {
                tracing::warn!(
                    token = %codec::mask(token),
                    error = %e,
                    "failed to record extension token use"
                );
                record.last_used_at
            }
        };

        let mut token_info = record.info();
        token_info.last_used_at = last_used_at;

        Ok(Validated { user, token_info })
    }

    /// Revoke a token. Unknown and already-revoked tokens are not errors.
    pub async fn revoke(&self, token: &str) -> Result<(), TokenError> {
        if !codec::is_well_formed(token) {
            return Ok(());
        }

        let matched = self.tokens.revoke_token(&codec::hash(token)).await?;
        if matched {
            tracing::info!(token = %codec::mask(token), "revoked extension token");
        } else {
            tracing::debug!(token = %codec::mask(token), "revoke for unknown extension token");
        }
        Ok(())
    }

    /// Delete tokens that expired before `cutoff`.
    pub async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, TokenError> {
        Ok(self.tokens.purge_expired(cutoff).await?)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
