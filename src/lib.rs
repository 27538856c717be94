//! mongo-ferry library
//!
//! Moves MongoDB collections between a live database and JSON Lines files,
//! and between clusters, in bounded batches so that collections of any size
//! can be exported, imported or relocated without holding them in memory.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management
//! - `error`: Error types and handling
//! - `registry`: Cluster alias to URI lookup
//! - `store`: Database capability traits and their implementations
//! - `transfer`: Batching, JSON Lines codec, export/import and moves
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use mongo_ferry::config::Config;
//! use mongo_ferry::store::{Connector, DatabaseStore, MongoConnector};
//! use mongo_ferry::transfer::{CollectionExporter, TransferSettings, TransferWindow};
//! use mongodb::bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let connector = MongoConnector::new(config.connection.clone());
//!     let db = connector.connect(&config.connection.default_uri, "shop").await?;
//!
//!     let exporter = CollectionExporter::new(TransferSettings::from_config(&config.transfer));
//!     let report = exporter
//!         .export(&db.collection("orders"), Path::new("backup"), TransferWindow::all(), doc! {}, false)
//!         .await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod registry;
pub mod store;
pub mod transfer;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{FerryError, Result};
pub use registry::ClusterRegistry;
pub use transfer::{
    CollectionExporter, CollectionImporter, DatabaseOrchestrator, Mover, TransferSettings,
    TransferWindow,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
