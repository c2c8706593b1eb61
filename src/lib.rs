//! extgate — short-lived extension tokens for a web app backend.
//!
//! Library crate shared by the `extgate` binary and the integration tests in `tests/`.

use std::sync::Arc;

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod store;
pub mod tokens;

use clock::Clock;
use store::{HealthCheck, SubscriptionBackend, TokenBackend, UserDirectory};
use tokens::TokenService;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub tokens: TokenService,
    pub subscriptions: Arc<dyn SubscriptionBackend>,
    pub health: Arc<dyn HealthCheck>,
    pub config: config::Config,
}

impl AppState {
    /// Wire the state from a single backend that serves every store role,
    /// which is how both `PgStore` and `InMemoryStore` are deployed.
    pub fn new<B>(backend: B, clock: Arc<dyn Clock>, config: config::Config) -> Self
    where
        B: TokenBackend + UserDirectory + SubscriptionBackend + HealthCheck + Clone + 'static,
    {
        let tokens = TokenService::new(
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            clock,
            config.token_ttl(),
        );
        Self {
            tokens,
            subscriptions: Arc::new(backend.clone()),
            health: Arc::new(backend),
            config,
        }
    }
}
