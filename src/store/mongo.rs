//! MongoDB driver implementation of the store traits

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::{Collection, Database};
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::connection::ConnectionManager;
use crate::error::{FerryError, Result};
use crate::error::mongo::partial_insert_from;

use super::{CollectionStore, Connector, DatabaseStore};

/// Database handle backed by the MongoDB driver
#[derive(Clone)]
pub struct MongoDatabase {
    database: Database,
    name: String,
}

impl MongoDatabase {
    pub fn new(database: Database) -> Self {
        let name = database.name().to_string();
        Self { database, name }
    }

    /// Open `name` on an established connection
    pub fn from_manager(manager: &ConnectionManager, name: &str) -> Result<Self> {
        Ok(Self::new(manager.get_database(name)?))
    }
}

#[async_trait]
impl DatabaseStore for MongoDatabase {
    type Collection = MongoCollection;

    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> MongoCollection {
        MongoCollection {
            collection: self.database.collection::<Document>(name),
            name: name.to_string(),
        }
    }

    async fn list_collection_names(&self) -> Result<Vec<String>> {
        Ok(self.database.list_collection_names().await?)
    }
}

/// Collection handle backed by the MongoDB driver
#[derive(Clone)]
pub struct MongoCollection {
    collection: Collection<Document>,
    name: String,
}

#[async_trait]
impl CollectionStore for MongoCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count(&self, filter: Document) -> Result<u64> {
        Ok(self.collection.count_documents(filter).await?)
    }

    async fn find(&self, filter: Document, skip: u64, limit: u64) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        debug!(
            "find on '{}' with skip={} limit={}",
            self.name, skip, limit
        );
        // Sorting on _id keeps skip windows stable between queries.
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "_id": 1 })
            .skip(skip)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let batch_len = documents.len();
        let result = self
            .collection
            .insert_many(documents)
            .await
            .map_err(|e| match partial_insert_from(&e, batch_len) {
                Some(partial) => FerryError::Transfer(partial),
                None => FerryError::MongoDb(e),
            })?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }
}

/// Opens a fresh [`ConnectionManager`] per call
pub struct MongoConnector {
    config: ConnectionConfig,
}

impl MongoConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Database = MongoDatabase;

    async fn connect(&self, endpoint: &str, database: &str) -> Result<MongoDatabase> {
        let mut manager = ConnectionManager::new(endpoint.to_string(), self.config.clone());
        manager.connect().await?;
        MongoDatabase::from_manager(&manager, database)
    }
}
