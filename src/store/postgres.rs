use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{HealthCheck, SubscriptionBackend, TokenBackend, UserDirectory};
use crate::models::token::ExtensionToken;
use crate::models::user::User;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

// -- Token Operations --

#[async_trait]
impl TokenBackend for PgStore {
    async fn insert_token(&self, token: &ExtensionToken) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO extension_tokens (token_hash, user_id, issued_at, expires_at, revoked, last_used_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&token.token_hash)
        .bind(token.user_id)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.revoked)
        .bind(token.last_used_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_token(&self, token_hash: &str) -> anyhow::Result<Option<ExtensionToken>> {
        let row = sqlx::query_as::<_, ExtensionToken>(
            "SELECT token_hash, user_id, issued_at, expires_at, revoked, last_used_at FROM extension_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn revoke_token(&self, token_hash: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE extension_tokens SET revoked = true WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_token(&self, token_hash: &str, used_at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query("UPDATE extension_tokens SET last_used_at = $2 WHERE token_hash = $1")
            .bind(token_hash)
            .bind(used_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM extension_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// -- User / Session Operations --

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, email, name, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_user_by_session(&self, session_token: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"SELECT u.id, u.email, u.name, u.created_at
               FROM sessions s
               JOIN users u ON u.id = s.user_id
               WHERE s.session_token = $1 AND s.expires > NOW()"#,
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

// -- Push Subscription Operations --

#[async_trait]
impl SubscriptionBackend for PgStore {
    async fn delete_subscription(&self, endpoint: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1")
            .bind(endpoint)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
