//! In-process implementation of the store traits
//!
//! Collections are plain vectors kept in insertion order. Inserts follow the
//! server's ordered `insertMany` rules: a missing `_id` gets a fresh
//! `ObjectId`, and a duplicate `_id` stops the batch with a partial insert
//! error after the documents before it were stored.
//!
//! Call counters make it possible to assert that an operation never reached
//! the store (dry runs, registry misses).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};

use crate::error::{ConnectionError, Result, TransferError};

use super::{CollectionStore, Connector, DatabaseStore};

type Collections = BTreeMap<String, Vec<Document>>;

#[derive(Debug, Default)]
struct CallStats {
    count: AtomicUsize,
    find: AtomicUsize,
    insert: AtomicUsize,
}

/// In-memory database, cheap to clone; clones share state
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    name: String,
    collections: Arc<Mutex<Collections>>,
    stats: Arc<CallStats>,
}

impl MemoryDatabase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: Arc::new(Mutex::new(BTreeMap::new())),
            stats: Arc::new(CallStats::default()),
        }
    }

    /// Seed a collection with documents, bypassing the call counters
    pub fn with_collection(self, name: &str, documents: Vec<Document>) -> Self {
        self.lock().insert(name.to_string(), documents);
        self
    }

    /// Snapshot of a collection's documents
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock().get(collection).cloned().unwrap_or_default()
    }

    /// Number of `insert_many` calls made against any collection
    pub fn insert_calls(&self) -> usize {
        self.stats.insert.load(Ordering::SeqCst)
    }

    /// Number of `find` calls made against any collection
    pub fn find_calls(&self) -> usize {
        self.stats.find.load(Ordering::SeqCst)
    }

    /// Number of `count` calls made against any collection
    pub fn count_calls(&self) -> usize {
        self.stats.count.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DatabaseStore for MemoryDatabase {
    type Collection = MemoryCollection;

    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> MemoryCollection {
        MemoryCollection {
            name: name.to_string(),
            database: self.clone(),
        }
    }

    async fn list_collection_names(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}

/// Handle to one collection of a [`MemoryDatabase`]
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    name: String,
    database: MemoryDatabase,
}

impl MemoryCollection {
    fn matching(&self, filter: &Document) -> Vec<Document> {
        self.database
            .lock()
            .get(&self.name)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matches_filter(d, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Top-level equality match, the only filter form the in-memory store supports
fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

#[async_trait]
impl CollectionStore for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count(&self, filter: Document) -> Result<u64> {
        self.database.stats.count.fetch_add(1, Ordering::SeqCst);
        Ok(self.matching(&filter).len() as u64)
    }

    async fn find(&self, filter: Document, skip: u64, limit: u64) -> Result<Vec<Document>> {
        self.database.stats.find.fetch_add(1, Ordering::SeqCst);
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .matching(&filter)
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect())
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>> {
        self.database.stats.insert.fetch_add(1, Ordering::SeqCst);
        let total = documents.len();
        let mut collections = self.database.lock();
        let stored = collections.entry(self.name.clone()).or_default();

        let mut ids = Vec::with_capacity(total);
        for document in documents {
            let document = match document.get("_id") {
                Some(_) => document,
                None => {
                    let mut with_id = doc! { "_id": ObjectId::new() };
                    with_id.extend(document);
                    with_id
                }
            };
            let id = document.get("_id").cloned().unwrap_or(Bson::Null);

            if stored.iter().any(|d| d.get("_id") == Some(&id)) {
                return Err(TransferError::PartialInsert {
                    inserted: ids.len(),
                    failed: total - ids.len(),
                    message: format!(
                        "E11000 duplicate key error collection: {}.{} dup key: {{ _id: {} }}",
                        self.database.name, self.name, id
                    ),
                }
                .into());
            }

            stored.push(document);
            ids.push(id);
        }

        Ok(ids)
    }
}

/// A set of named in-memory databases standing in for one cluster
#[derive(Debug, Clone, Default)]
pub struct MemoryCluster {
    databases: Arc<Mutex<BTreeMap<String, MemoryDatabase>>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the named database
    pub fn database(&self, name: &str) -> MemoryDatabase {
        self.databases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(name.to_string())
            .or_insert_with(|| MemoryDatabase::new(name))
            .clone()
    }
}

/// Connector resolving endpoints to registered [`MemoryCluster`]s
#[derive(Debug, Default)]
pub struct MemoryConnector {
    clusters: BTreeMap<String, MemoryCluster>,
    connects: AtomicUsize,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(mut self, endpoint: &str, cluster: MemoryCluster) -> Self {
        self.clusters.insert(endpoint.to_string(), cluster);
        self
    }

    /// Number of connection attempts, successful or not
    pub fn connect_calls(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Database = MemoryDatabase;

    async fn connect(&self, endpoint: &str, database: &str) -> Result<MemoryDatabase> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.clusters
            .get(endpoint)
            .map(|cluster| cluster.database(database))
            .ok_or_else(|| {
                ConnectionError::ConnectionFailed(format!("no cluster at {endpoint}")).into()
            })
    }
}
