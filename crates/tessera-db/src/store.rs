use std::time::Duration;

use async_trait::async_trait;
use tessera_core::{User, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mongodb: {0}")]
    Driver(#[from] mongodb::error::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("document encode failed: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),
    #[error("document decode failed: {0}")]
    Decode(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for the users collection.
///
/// Implementations must be safe to share across concurrent requests; the
/// server holds one instance behind an `Arc` for the process lifetime.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Returns the number of records removed (0 or 1).
    async fn delete_user(&self, id: UserId) -> Result<u64, StoreError>;

    /// Liveness check against the primary.
    async fn ping(&self) -> Result<(), StoreError>;
}
