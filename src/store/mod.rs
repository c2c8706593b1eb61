pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::token::ExtensionToken;
use crate::models::user::User;

/// Row-level persistence for extension tokens, keyed by token hash.
#[async_trait]
pub trait TokenBackend: Send + Sync {
    async fn insert_token(&self, token: &ExtensionToken) -> anyhow::Result<()>;

    async fn get_token(&self, token_hash: &str) -> anyhow::Result<Option<ExtensionToken>>;

    /// Mark the token revoked. Returns whether a row matched.
    async fn revoke_token(&self, token_hash: &str) -> anyhow::Result<bool>;

    async fn touch_token(&self, token_hash: &str, used_at: DateTime<Utc>) -> anyhow::Result<()>;

    /// Delete tokens whose `expires_at` is before `cutoff`. Returns rows deleted.
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;
}

/// Read side of the user/session store.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    async fn find_user_by_session(&self, session_token: &str) -> anyhow::Result<Option<User>>;
}

/// Push subscription persistence. Delete-by-endpoint only.
#[async_trait]
pub trait SubscriptionBackend: Send + Sync {
    /// Remove the subscription if present. Returns whether a row matched.
    async fn delete_subscription(&self, endpoint: &str) -> anyhow::Result<bool>;
}

/// Liveness of the backing store, used by `/readyz`.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> anyhow::Result<()>;
}
