#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request};
use tessera_core::{User, UserId};
use tessera_db::{StoreError, UserStore};
use tessera_server::app::AppState;
use tessera_server::config::ServerConfig;
use tower::ServiceExt;
use tracing_subscriber::EnvFilter;

/// In-process stand-in for the users collection.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<UserId, User>>,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.users.lock().expect("users lock").len()
    }

    pub fn seed(&self, user: User) {
        self.users
            .lock()
            .expect("users lock")
            .insert(user.id, user);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("delay lock") = Some(delay);
    }

    async fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "connection refused by 10.0.0.7:27017".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.enter().await?;
        Ok(self.users.lock().expect("users lock").get(&id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.enter().await?;
        self.users
            .lock()
            .expect("users lock")
            .insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<u64, StoreError> {
        self.enter().await?;
        let removed = self.users.lock().expect("users lock").remove(&id);
        Ok(u64::from(removed.is_some()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let delay = *self.delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("no primary".to_string()));
        }
        Ok(())
    }
}

pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("tessera_server=debug"))
            .with_test_writer()
            .try_init();
    });
}

pub fn test_state(store: Arc<MemoryStore>, config: ServerConfig) -> AppState {
    AppState::new(store, config)
}

pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("json body")
    }
}

pub async fn send(app: &axum::Router, method: Method, path: &str, body: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(path);
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec();
    TestResponse {
        status,
        content_type,
        body,
    }
}
