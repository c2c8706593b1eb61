#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use extgate::clock::ManualClock;
use extgate::config::Config;
use extgate::models::user::User;
use extgate::store::memory::InMemoryStore;
use extgate::{api, AppState};

pub struct Harness {
    pub store: InMemoryStore,
    pub clock: Arc<ManualClock>,
    pub state: Arc<AppState>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = InMemoryStore::new();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let state = Arc::new(AppState::new(store.clone(), clock.clone(), config));
        Self {
            store,
            clock,
            state,
        }
    }

    pub fn app(&self) -> Router {
        api::app(self.state.clone())
    }

    pub fn add_user(&self, email: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            created_at: Utc::now(),
        };
        self.store.insert_user(user.clone());
        user
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, &body.to_string()).await
    }
}
