use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::{Collection, Database};
use tessera_core::{User, UserId};

use super::codec::{document_to_user, user_to_document};
use crate::connect::{ping_database, DEFAULT_PING_TIMEOUT};
use crate::store::{StoreError, UserStore};

#[derive(Clone)]
pub struct UserRepo {
    database: Database,
    collection: Collection<Document>,
    ping_timeout: Duration,
}

impl UserRepo {
    pub fn new(database: Database, collection: &str) -> Self {
        let collection = database.collection::<Document>(collection);
        Self {
            database,
            collection,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    pub fn ping_timeout(&self) -> Duration {
        self.ping_timeout
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }
}

#[async_trait]
impl UserStore for UserRepo {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let filter = doc! { "_id": id.as_object_id() };
        match self.collection.find_one(filter, None).await? {
            Some(document) => document_to_user(document).map(Some),
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let document = user_to_document(user)?;
        self.collection.insert_one(document, None).await?;
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<u64, StoreError> {
        let filter = doc! { "_id": id.as_object_id() };
        let result = self.collection.delete_one(filter, None).await?;
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        ping_database(&self.database, self.ping_timeout).await
    }
}
