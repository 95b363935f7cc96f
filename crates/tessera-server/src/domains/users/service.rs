use std::future::Future;
use std::time::{Duration, Instant};

use tessera_core::{IdParseError, PayloadError, User, UserFields, UserId};
use tessera_db::StoreError;
use thiserror::Error;

use crate::app::AppState;
use crate::infra::metrics::{self, StoreOutcome};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("invalid user id: {0}")]
    InvalidId(#[from] IdParseError),
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] PayloadError),
    #[error("user not found")]
    NotFound,
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl UserError {
    fn outcome(&self) -> &'static str {
        match self {
            Self::InvalidId(_) => "invalid_id",
            Self::InvalidBody(_) => "invalid_body",
            Self::NotFound => "not_found",
            Self::Store(StoreError::Timeout(_)) => "store_timeout",
            Self::Store(_) => "store_error",
        }
    }
}

fn observed<T>(operation: &'static str, result: Result<T, UserError>) -> Result<T, UserError> {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.outcome(),
    };
    metrics::record_user_request(operation, outcome);
    result
}

/// Runs one store call under `timeout`, recording its outcome.
async fn bounded<T, F>(operation: &'static str, timeout: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let start = Instant::now();
    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    };
    let outcome = match &result {
        Ok(_) => StoreOutcome::Ok,
        Err(StoreError::Timeout(_)) => StoreOutcome::Timeout,
        Err(_) => StoreOutcome::Error,
    };
    metrics::record_store_call(operation, outcome, start.elapsed());
    result
}

pub async fn get_user(state: &AppState, raw_id: &str) -> Result<User, UserError> {
    observed("get", fetch(state, raw_id).await)
}

pub async fn create_user(state: &AppState, body: &[u8]) -> Result<User, UserError> {
    observed("create", insert(state, body).await)
}

pub async fn delete_user(state: &AppState, raw_id: &str) -> Result<UserId, UserError> {
    observed("delete", remove(state, raw_id).await)
}

async fn fetch(state: &AppState, raw_id: &str) -> Result<User, UserError> {
    let id: UserId = raw_id.parse()?;
    let timeout = state.config.store.operation_timeout();

    match bounded("find_user", timeout, state.store.find_user(id)).await {
        Ok(Some(user)) => {
            tracing::debug!(event = "user_fetched", user_id = %id);
            Ok(user)
        }
        Ok(None) => Err(UserError::NotFound),
        Err(err) => {
            tracing::error!(event = "user_fetch_failed", user_id = %id, error = %err, "Error fetching user");
            Err(UserError::Store(err))
        }
    }
}

async fn insert(state: &AppState, body: &[u8]) -> Result<User, UserError> {
    let fields = UserFields::from_json_slice(body)?;
    let user = User::create(fields);
    let timeout = state.config.store.operation_timeout();

    if let Err(err) = bounded("insert_user", timeout, state.store.insert_user(&user)).await {
        tracing::error!(event = "user_create_failed", user_id = %user.id, error = %err, "Error inserting user");
        return Err(UserError::Store(err));
    }
    tracing::info!(event = "user_created", user_id = %user.id, fields = user.fields.len());
    Ok(user)
}

async fn remove(state: &AppState, raw_id: &str) -> Result<UserId, UserError> {
    let id: UserId = raw_id.parse()?;
    let timeout = state.config.store.operation_timeout();

    match bounded("delete_user", timeout, state.store.delete_user(id)).await {
        Ok(0) => Err(UserError::NotFound),
        Ok(_) => {
            tracing::info!(event = "user_deleted", user_id = %id);
            Ok(id)
        }
        Err(err) => {
            tracing::error!(event = "user_delete_failed", user_id = %id, error = %err, "Error deleting user");
            Err(UserError::Store(err))
        }
    }
}
