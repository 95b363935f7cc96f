use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::{ClientOptions, ReadPreference, SelectionCriteria};
use mongodb::{Client, Database};
use thiserror::Error;

use crate::repo::UserRepo;
use crate::store::StoreError;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub connect_timeout: Duration,
    pub ping_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub app_name: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            app_name: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to connect to MongoDB: {0}")]
    Connection(#[source] StoreError),
    #[error("MongoDB server not reachable or responsive: {0}")]
    Unreachable(#[source] StoreError),
}

/// Owns the driver client for the process lifetime.
///
/// `close` must be awaited once at shutdown. A handle dropped without being
/// closed still releases its pools through the driver, but logs a warning.
pub struct MongoHandle {
    client: Client,
    ping_timeout: Duration,
    shutdown_timeout: Duration,
    closed: bool,
}

impl MongoHandle {
    fn new(client: Client, options: &StoreOptions) -> Self {
        Self {
            client,
            ping_timeout: options.ping_timeout,
            shutdown_timeout: options.shutdown_timeout,
            closed: false,
        }
    }

    pub fn database(&self, name: &str) -> Database {
        self.client.database(name)
    }

    pub fn user_repo(&self, database: &str, collection: &str) -> UserRepo {
        UserRepo::new(self.database(database), collection).with_ping_timeout(self.ping_timeout)
    }

    pub async fn ping(&self, timeout: Duration) -> Result<(), StoreError> {
        ping_database(&self.database("admin"), timeout).await
    }

    /// Tears the client down. Failures are logged, never returned.
    pub async fn close(mut self) {
        self.closed = true;
        let client = self.client.clone();
        match tokio::time::timeout(self.shutdown_timeout, client.shutdown()).await {
            Ok(()) => tracing::info!(event = "store_disconnected", "Disconnected from MongoDB"),
            Err(_) => tracing::warn!(
                event = "store_disconnect_failed",
                timeout_ms = self.shutdown_timeout.as_millis() as u64,
                "MongoDB shutdown did not finish in time"
            ),
        }
    }
}

impl Drop for MongoHandle {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(
                event = "store_handle_dropped",
                "MongoDB handle dropped without close"
            );
        }
    }
}

pub(crate) async fn ping_database(db: &Database, timeout: Duration) -> Result<(), StoreError> {
    let primary = SelectionCriteria::ReadPreference(ReadPreference::Primary);
    match tokio::time::timeout(timeout, db.run_command(doc! { "ping": 1 }, primary)).await {
        Ok(result) => result.map(|_| ()).map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

async fn build_client(uri: &str, options: &StoreOptions) -> Result<Client, StoreError> {
    let mut client_options = ClientOptions::parse(uri).await?;
    client_options.connect_timeout = Some(options.connect_timeout);
    if client_options.server_selection_timeout.is_none() {
        client_options.server_selection_timeout = Some(options.connect_timeout);
    }
    if let Some(app_name) = options.app_name.as_ref() {
        client_options.app_name = Some(app_name.clone());
    }
    Ok(Client::with_options(client_options)?)
}

/// Connects under `connect_timeout`, then verifies the primary answers a ping
/// within `ping_timeout`. A failed ping tears the fresh client down before
/// returning [`ConnectError::Unreachable`].
pub async fn connect_mongo(uri: &str, options: &StoreOptions) -> Result<MongoHandle, ConnectError> {
    let client = match tokio::time::timeout(options.connect_timeout, build_client(uri, options)).await
    {
        Ok(Ok(client)) => client,
        Ok(Err(err)) => return Err(ConnectError::Connection(err)),
        Err(_) => {
            return Err(ConnectError::Connection(StoreError::Timeout(
                options.connect_timeout,
            )))
        }
    };
    let handle = MongoHandle::new(client, options);

    if let Err(err) = handle.ping(options.ping_timeout).await {
        tracing::warn!(event = "store_ping_failed", error = %err, "MongoDB ping failed");
        handle.close().await;
        return Err(ConnectError::Unreachable(err));
    }

    tracing::info!(event = "store_connected", "Database connected");
    Ok(handle)
}
