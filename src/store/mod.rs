//! Database collaborator interface
//!
//! The transfer engine never talks to the driver directly. It depends on the
//! small capability surface defined here:
//!
//! - [`CollectionStore`]: `count`, paginated `find`, `insert_many`
//! - [`DatabaseStore`]: `list_collection_names` and collection handles
//! - [`Connector`]: opens a database on a cluster endpoint
//!
//! [`mongo`] implements it on top of the MongoDB driver and [`memory`] keeps
//! everything in process.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use crate::error::Result;

pub mod memory;
pub mod mongo;

pub use memory::{MemoryCluster, MemoryConnector, MemoryDatabase};
pub use mongo::{MongoCollection, MongoConnector, MongoDatabase};

/// A single collection that documents can be read from and written to
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    /// Count documents matching `filter`
    async fn count(&self, filter: Document) -> Result<u64>;

    /// Fetch at most `limit` documents matching `filter` after skipping `skip`
    ///
    /// Successive calls with the same filter return documents in the same
    /// order, so adjacent skip windows never overlap.
    async fn find(&self, filter: Document, skip: u64, limit: u64) -> Result<Vec<Document>>;

    /// Insert documents in order and return their ids in input order
    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>>;
}

/// A database holding named collections
#[async_trait]
pub trait DatabaseStore: Send + Sync {
    /// Collection handle type
    type Collection: CollectionStore;

    /// Database name
    fn name(&self) -> &str;

    /// Handle to a collection, created lazily on first insert
    fn collection(&self, name: &str) -> Self::Collection;

    /// Names of the collections currently in the database
    async fn list_collection_names(&self) -> Result<Vec<String>>;
}

/// Opens databases on a cluster endpoint
///
/// Every call yields an independent connection.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Database handle type
    type Database: DatabaseStore;

    /// Connect to `endpoint` and return a handle to `database`
    async fn connect(&self, endpoint: &str, database: &str) -> Result<Self::Database>;
}
