//! Collection and database moves
//!
//! Three flavours:
//!
//! - [`Mover::move_collection`]: same connection, pages are read from the
//!   source and inserted into the destination directly, no file involved
//! - [`Mover::move_collection_cluster`]: export on the origin cluster into
//!   `<path>/<collection>.jsonl`, then import that file on the destination
//! - [`Mover::move_database_cluster`]: database backup on the origin into
//!   `<path>/<database>/`, then restore of that directory on the destination
//!
//! Cluster moves resolve both aliases before opening any connection, so a
//! registry miss never reaches the network.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use mongodb::bson::doc;
use tracing::{debug, info};

use crate::error::Result;
use crate::registry::ClusterRegistry;
use crate::store::{CollectionStore, Connector, DatabaseStore};

use super::exporter::CollectionExporter;
use super::importer::CollectionImporter;
use super::lines::LineStore;
use super::orchestrator::DatabaseOrchestrator;
use super::progress::ProgressTracker;
use super::report::{DatabaseReport, TransferKind, TransferReport};
use super::settings::TransferSettings;
use super::window::TransferWindow;

/// Origin and destination of a cluster move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRoute {
    pub origin_cluster: String,
    pub destination_cluster: String,
    pub database: String,
    pub destination_database: String,
}

impl ClusterRoute {
    /// Route keeping the database name on the destination
    pub fn new(origin_cluster: &str, destination_cluster: &str, database: &str) -> Self {
        Self {
            origin_cluster: origin_cluster.to_string(),
            destination_cluster: destination_cluster.to_string(),
            database: database.to_string(),
            destination_database: database.to_string(),
        }
    }

    pub fn with_destination_database(mut self, destination_database: &str) -> Self {
        self.destination_database = destination_database.to_string();
        self
    }
}

impl fmt::Display for ClusterRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> {}/{}",
            self.origin_cluster, self.database, self.destination_cluster, self.destination_database
        )
    }
}

/// Export and import halves of a collection move between clusters
#[derive(Debug)]
pub struct CollectionMoveReport {
    pub exported: TransferReport,
    pub imported: TransferReport,
}

impl fmt::Display for CollectionMoveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.exported)?;
        write!(f, "{}", self.imported)
    }
}

/// Backup and restore halves of a database move between clusters
#[derive(Debug)]
pub struct DatabaseMoveReport {
    pub backup: DatabaseReport,
    pub restore: DatabaseReport,
}

impl DatabaseMoveReport {
    pub fn has_failures(&self) -> bool {
        self.backup.has_failures() || self.restore.has_failures()
    }
}

impl fmt::Display for DatabaseMoveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backup {}", self.backup)?;
        write!(f, "restore {}", self.restore)
    }
}

/// Moves collections and databases within or across clusters
#[derive(Debug, Clone)]
pub struct Mover {
    settings: TransferSettings,
    exporter: CollectionExporter,
    importer: CollectionImporter,
    orchestrator: DatabaseOrchestrator,
}

impl Mover {
    pub fn new(settings: TransferSettings) -> Self {
        Self {
            exporter: CollectionExporter::new(settings.clone()),
            importer: CollectionImporter::new(settings.clone()),
            orchestrator: DatabaseOrchestrator::new(settings.clone()),
            settings,
        }
    }

    /// Copy `collection` from `source` to `destination` over one connection
    ///
    /// Pages of `batch_size` documents are fetched and inserted one at a
    /// time. Documents keep their original BSON types, `_id` included.
    pub async fn move_collection<S, D>(
        &self,
        source: &S,
        destination: &D,
        collection: &str,
        dry_run: bool,
    ) -> Result<TransferReport>
    where
        S: DatabaseStore,
        D: DatabaseStore,
    {
        let start_time = Instant::now();
        let from = source.collection(collection);
        let to = destination.collection(collection);

        let total = from.count(doc! {}).await?;
        let mut report = TransferReport {
            total: Some(total),
            dry_run,
            ..TransferReport::new(TransferKind::Move, collection)
        };

        if dry_run {
            info!(
                "Would move {} documents of '{}' from '{}' to '{}'",
                total,
                collection,
                source.name(),
                destination.name()
            );
            return Ok(report);
        }

        info!(
            "Moving '{}' from '{}' to '{}' ({} documents)",
            collection,
            source.name(),
            destination.name(),
            total
        );
        let tracker = ProgressTracker::new("Moved", total, self.settings.progress_bar);
        let outcome: Result<()> = async {
            for page in TransferWindow::all().pages(total, self.settings.batch_size) {
                if self.settings.is_cancelled() {
                    info!("Move of '{}' cancelled after {} documents", collection, report.transferred);
                    report.cancelled = true;
                    break;
                }

                let batch = from.find(doc! {}, page.skip, page.size).await?;
                if batch.is_empty() {
                    debug!("'{}' returned no documents at skip={}, stopping", collection, page.skip);
                    break;
                }
                let ids = to.insert_many(batch).await?;
                report.batches += 1;
                report.transferred += ids.len() as u64;
                tracker.advance(ids.len() as u64);
            }
            Ok(())
        }
        .await;
        tracker.finish();
        outcome?;

        report.elapsed_ms = start_time.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Move one collection between clusters through `<path>/<collection>.jsonl`
    pub async fn move_collection_cluster<K: Connector>(
        &self,
        registry: &ClusterRegistry,
        connector: &K,
        route: &ClusterRoute,
        collection: &str,
        path: &Path,
        dry_run: bool,
    ) -> Result<CollectionMoveReport> {
        let (origin, destination) = self.connect(registry, connector, route).await?;
        info!("Moving collection '{}' {}", collection, route);

        let exported = self
            .exporter
            .export(
                &origin.collection(collection),
                path,
                TransferWindow::all(),
                doc! {},
                dry_run,
            )
            .await?;

        let file = LineStore::file_path(path, collection);
        let target = destination.collection(collection);
        let imported = if !dry_run && !file.exists() {
            info!("Nothing exported from '{}', skipping import", collection);
            TransferReport::new(TransferKind::Import, collection)
        } else {
            self.importer
                .import(&file, &target, TransferWindow::all(), dry_run)
                .await?
        };

        Ok(CollectionMoveReport { exported, imported })
    }

    /// Move a whole database between clusters through `<path>/<database>/`
    pub async fn move_database_cluster<K: Connector>(
        &self,
        registry: &ClusterRegistry,
        connector: &K,
        route: &ClusterRoute,
        path: &Path,
        dry_run: bool,
    ) -> Result<DatabaseMoveReport> {
        let (origin, destination) = self.connect(registry, connector, route).await?;
        info!("Moving database {}", route);

        let backup = self
            .orchestrator
            .backup_database(&origin, path, dry_run)
            .await?;

        let dir = DatabaseOrchestrator::backup_dir(path, &route.database);
        let restore = if dry_run && !dir.is_dir() {
            info!("Would restore the collections above from {}", dir.display());
            DatabaseReport::new(destination.name(), dir)
        } else {
            self.orchestrator
                .restore_database(&dir, &destination, dry_run)
                .await?
        };

        Ok(DatabaseMoveReport { backup, restore })
    }

    async fn connect<K: Connector>(
        &self,
        registry: &ClusterRegistry,
        connector: &K,
        route: &ClusterRoute,
    ) -> Result<(K::Database, K::Database)> {
        let origin_uri = registry.resolve(&route.origin_cluster)?;
        let destination_uri = registry.resolve(&route.destination_cluster)?;

        debug!("Connecting to origin cluster '{}'", route.origin_cluster);
        let origin = connector.connect(origin_uri, &route.database).await?;
        debug!("Connecting to destination cluster '{}'", route.destination_cluster);
        let destination = connector
            .connect(destination_uri, &route.destination_database)
            .await?;
        Ok((origin, destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WritePolicy;
    use crate::error::{FerryError, RegistryError};
    use crate::store::{MemoryCluster, MemoryConnector, MemoryDatabase};
    use mongodb::bson::{Document, oid::ObjectId};
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    const ORIGIN_URI: &str = "mongodb://origin:27017";
    const DEST_URI: &str = "mongodb://dest:27017";

    fn mover() -> Mover {
        Mover::new(TransferSettings::new(4))
    }

    fn registry() -> ClusterRegistry {
        ClusterRegistry::from_pairs([("origin", ORIGIN_URI), ("dest", DEST_URI)])
    }

    fn docs(n: i32) -> Vec<Document> {
        (0..n).map(|i| doc! { "_id": ObjectId::new(), "i": i }).collect()
    }

    fn clusters() -> (MemoryCluster, MemoryCluster, MemoryConnector) {
        let origin = MemoryCluster::new();
        let dest = MemoryCluster::new();
        let connector = MemoryConnector::new()
            .with_cluster(ORIGIN_URI, origin.clone())
            .with_cluster(DEST_URI, dest.clone());
        (origin, dest, connector)
    }

    fn seed(db: &MemoryDatabase, collection: &str, documents: Vec<Document>) {
        let _ = db.clone().with_collection(collection, documents);
    }

    #[tokio::test]
    async fn test_move_collection_same_cluster_is_batched() {
        let source = MemoryDatabase::new("a").with_collection("users", docs(10));
        let destination = MemoryDatabase::new("b");

        let report = mover()
            .move_collection(&source, &destination, "users", false)
            .await
            .unwrap();

        assert_eq!(report.transferred, 10);
        assert_eq!(report.batches, 3);
        assert_eq!(destination.insert_calls(), 3);
        assert_eq!(destination.documents("users"), source.documents("users"));
    }

    #[tokio::test]
    async fn test_move_collection_dry_run() {
        let source = MemoryDatabase::new("a").with_collection("users", docs(10));
        let destination = MemoryDatabase::new("b");

        let report = mover()
            .move_collection(&source, &destination, "users", true)
            .await
            .unwrap();

        assert_eq!(report.total, Some(10));
        assert_eq!(source.find_calls(), 0);
        assert_eq!(destination.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_move_collection_cancelled() {
        let source = MemoryDatabase::new("a").with_collection("users", docs(10));
        let destination = MemoryDatabase::new("b");
        let token = CancellationToken::new();
        token.cancel();

        let report = Mover::new(TransferSettings::new(4).with_cancellation(token))
            .move_collection(&source, &destination, "users", false)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(destination.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_move_collection_cluster() {
        let (origin, dest, connector) = clusters();
        seed(&origin.database("app"), "users", docs(9));
        let dir = tempdir().unwrap();
        let route = ClusterRoute::new("origin", "dest", "app").with_destination_database("app_copy");

        let report = mover()
            .move_collection_cluster(&registry(), &connector, &route, "users", dir.path(), false)
            .await
            .unwrap();

        assert_eq!(report.exported.transferred, 9);
        assert_eq!(report.imported.transferred, 9);
        assert_eq!(connector.connect_calls(), 2);
        assert!(dir.path().join("users.jsonl").is_file());

        let copied = dest.database("app_copy").documents("users");
        assert_eq!(copied.len(), 9);
        assert_eq!(copied[8].get_i32("i").unwrap(), 8);
    }

    #[tokio::test]
    async fn test_overwrite_with_empty_origin_imports_nothing() {
        let (_, dest, connector) = clusters();
        let dir = tempdir().unwrap();
        let stale = dir.path().join("users.jsonl");
        std::fs::write(&stale, "{\"i\":1}\n{\"i\":2}\n").unwrap();
        let route = ClusterRoute::new("origin", "dest", "app");

        let report = Mover::new(TransferSettings::new(4).with_write_policy(WritePolicy::Truncate))
            .move_collection_cluster(&registry(), &connector, &route, "users", dir.path(), false)
            .await
            .unwrap();

        assert_eq!(report.exported.transferred, 0);
        assert_eq!(report.imported.transferred, 0);
        assert!(!stale.exists());
        assert!(dest.database("app").documents("users").is_empty());
        assert_eq!(dest.database("app").insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_database_move_skips_stale_files() {
        let (origin, dest, connector) = clusters();
        seed(&origin.database("app"), "orders", docs(2));
        seed(&origin.database("app"), "users", Vec::new());
        let dir = tempdir().unwrap();
        let backup = dir.path().join("app");
        std::fs::create_dir_all(&backup).unwrap();
        std::fs::write(backup.join("users.jsonl"), "{\"i\":1}\n").unwrap();

        let report = Mover::new(TransferSettings::new(4).with_write_policy(WritePolicy::Truncate))
            .move_database_cluster(
                &registry(),
                &connector,
                &ClusterRoute::new("origin", "dest", "app"),
                dir.path(),
                false,
            )
            .await
            .unwrap();

        assert_eq!(report.restore.transferred(), 2);
        assert_eq!(dest.database("app").documents("orders").len(), 2);
        assert!(dest.database("app").documents("users").is_empty());
    }

    #[tokio::test]
    async fn test_move_collection_cluster_dry_run() {
        let (origin, dest, connector) = clusters();
        seed(&origin.database("app"), "users", docs(9));
        let dir = tempdir().unwrap();
        let route = ClusterRoute::new("origin", "dest", "app");

        let report = mover()
            .move_collection_cluster(&registry(), &connector, &route, "users", dir.path(), true)
            .await
            .unwrap();

        assert_eq!(report.exported.total, Some(9));
        assert!(report.imported.dry_run);
        assert!(!dir.path().join("users.jsonl").exists());
        assert_eq!(dest.database("app").insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_alias_makes_no_connection() {
        let (_, _, connector) = clusters();
        let dir = tempdir().unwrap();

        for route in [
            ClusterRoute::new("nowhere", "dest", "app"),
            ClusterRoute::new("origin", "nowhere", "app"),
        ] {
            let err = mover()
                .move_collection_cluster(&registry(), &connector, &route, "users", dir.path(), false)
                .await
                .unwrap_err();
            match err {
                FerryError::Registry(RegistryError::AliasNotFound { alias, known }) => {
                    assert_eq!(alias, "nowhere");
                    assert_eq!(known, vec!["dest".to_string(), "origin".to_string()]);
                }
                other => panic!("unexpected error: {other}"),
            }

            let err = mover()
                .move_database_cluster(&registry(), &connector, &route, dir.path(), false)
                .await
                .unwrap_err();
            assert!(matches!(err, FerryError::Registry(_)));
        }

        assert_eq!(connector.connect_calls(), 0);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_move_database_cluster() {
        let (origin, dest, connector) = clusters();
        let app = origin.database("app");
        seed(&app, "orders", docs(6));
        seed(&app, "users", docs(3));
        let dir = tempdir().unwrap();

        let report = mover()
            .move_database_cluster(
                &registry(),
                &connector,
                &ClusterRoute::new("origin", "dest", "app"),
                dir.path(),
                false,
            )
            .await
            .unwrap();

        assert!(!report.has_failures());
        assert_eq!(report.backup.transferred(), 9);
        assert_eq!(report.restore.transferred(), 9);
        assert!(dir.path().join("app").join("orders.jsonl").is_file());
        assert_eq!(dest.database("app").documents("orders").len(), 6);
        assert_eq!(dest.database("app").documents("users").len(), 3);
    }

    #[tokio::test]
    async fn test_move_database_cluster_dry_run() {
        let (origin, dest, connector) = clusters();
        seed(&origin.database("app"), "orders", docs(6));
        let dir = tempdir().unwrap();

        let report = mover()
            .move_database_cluster(
                &registry(),
                &connector,
                &ClusterRoute::new("origin", "dest", "app"),
                dir.path(),
                true,
            )
            .await
            .unwrap();

        assert_eq!(report.backup.outcomes.len(), 1);
        assert!(report.restore.outcomes.is_empty());
        assert!(!dir.path().join("app").exists());
        assert_eq!(dest.database("app").insert_calls(), 0);
    }
}
