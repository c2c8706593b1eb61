use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{HealthCheck, SubscriptionBackend, TokenBackend, UserDirectory};
use crate::models::subscription::PushSubscription;
use crate::models::token::ExtensionToken;
use crate::models::user::User;

/// DashMap-backed stand-in for the managed backend.
///
/// Backs `serve --in-memory` and the test suites. Every trait call bumps a
/// counter, and `set_unavailable(true)` makes every call fail the way an
/// unreachable database would.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tokens: Arc<DashMap<String, ExtensionToken>>,
    users: Arc<DashMap<Uuid, User>>,
    sessions: Arc<DashMap<String, Uuid>>,
    subscriptions: Arc<DashMap<String, PushSubscription>>,
    calls: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn remove_user(&self, id: Uuid) -> Option<User> {
        self.users.remove(&id).map(|(_, u)| u)
    }

    pub fn insert_session(&self, session_token: &str, user_id: Uuid) {
        self.sessions.insert(session_token.to_string(), user_id);
    }

    pub fn insert_subscription(&self, sub: PushSubscription) {
        self.subscriptions.insert(sub.endpoint.clone(), sub);
    }

    pub fn has_subscription(&self, endpoint: &str) -> bool {
        self.subscriptions.contains_key(endpoint)
    }

    /// Put a token row in place directly, bypassing issuance.
    pub fn put_token(&self, token: ExtensionToken) {
        self.tokens.insert(token.token_hash.clone(), token);
    }

    pub fn token(&self, token_hash: &str) -> Option<ExtensionToken> {
        self.tokens.get(token_hash).map(|t| t.clone())
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Number of backend calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn enter(&self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused: backend unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl TokenBackend for InMemoryStore {
    async fn insert_token(&self, token: &ExtensionToken) -> anyhow::Result<()> {
        self.enter()?;
        if self.tokens.contains_key(&token.token_hash) {
            anyhow::bail!("duplicate key value violates unique constraint on token_hash");
        }
        self.tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn get_token(&self, token_hash: &str) -> anyhow::Result<Option<ExtensionToken>> {
        self.enter()?;
        Ok(self.tokens.get(token_hash).map(|t| t.clone()))
    }

    async fn revoke_token(&self, token_hash: &str) -> anyhow::Result<bool> {
        self.enter()?;
        match self.tokens.get_mut(token_hash) {
            Some(mut t) => {
                t.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_token(&self, token_hash: &str, used_at: DateTime<Utc>) -> anyhow::Result<()> {
        self.enter()?;
        if let Some(mut t) = self.tokens.get_mut(token_hash) {
            t.last_used_at = Some(used_at);
        }
        Ok(())
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        self.enter()?;
        let before = self.tokens.len();
        self.tokens.retain(|_, t| t.expires_at >= cutoff);
        Ok((before - self.tokens.len()) as u64)
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        self.enter()?;
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_user_by_session(&self, session_token: &str) -> anyhow::Result<Option<User>> {
        self.enter()?;
        let user_id = match self.sessions.get(session_token) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }
}

#[async_trait]
impl SubscriptionBackend for InMemoryStore {
    async fn delete_subscription(&self, endpoint: &str) -> anyhow::Result<bool> {
        self.enter()?;
        Ok(self.subscriptions.remove(endpoint).is_some())
    }
}

#[async_trait]
impl HealthCheck for InMemoryStore {
    async fn ping(&self) -> anyhow::Result<()> {
        self.enter()
    }
}
