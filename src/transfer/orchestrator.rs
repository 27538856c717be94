//! Database-level backup and restore
//!
//! A failing collection does not stop the run: its error is logged and
//! recorded in the [`DatabaseReport`], and the next collection is processed.

use std::path::{Path, PathBuf};

use mongodb::bson::doc;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::store::DatabaseStore;

use super::exporter::CollectionExporter;
use super::importer::CollectionImporter;
use super::lines::FILE_EXTENSION;
use super::report::DatabaseReport;
use super::settings::TransferSettings;
use super::window::TransferWindow;

const SYSTEM_PREFIX: &str = "system.";

/// Applies the exporter or importer to every collection of a database
#[derive(Debug, Clone)]
pub struct DatabaseOrchestrator {
    settings: TransferSettings,
    exporter: CollectionExporter,
    importer: CollectionImporter,
}

impl DatabaseOrchestrator {
    pub fn new(settings: TransferSettings) -> Self {
        Self {
            exporter: CollectionExporter::new(settings.clone()),
            importer: CollectionImporter::new(settings.clone()),
            settings,
        }
    }

    /// Directory a database backup is written to: `<path>/<database>`
    pub fn backup_dir(path: &Path, database: &str) -> PathBuf {
        path.join(database)
    }

    /// Export every collection of `source` into `<path>/<database>/`
    ///
    /// `system.*` collections are skipped.
    pub async fn backup_database<D: DatabaseStore>(
        &self,
        source: &D,
        path: &Path,
        dry_run: bool,
    ) -> Result<DatabaseReport> {
        let dir = Self::backup_dir(path, source.name());
        if dry_run {
            info!("Would back up database '{}' to {}", source.name(), dir.display());
        } else {
            info!("Backing up database '{}' to {}", source.name(), dir.display());
        }

        let mut report = DatabaseReport::new(source.name(), dir.clone());
        for name in source.list_collection_names().await? {
            if name.starts_with(SYSTEM_PREFIX) {
                debug!("Skipping {}", name);
                continue;
            }
            if self.settings.is_cancelled() {
                info!("Backup of '{}' cancelled before '{}'", source.name(), name);
                break;
            }

            info!("Backing up collection '{}'", name);
            let result = self
                .exporter
                .export(
                    &source.collection(&name),
                    &dir,
                    TransferWindow::all(),
                    doc! {},
                    dry_run,
                )
                .await;
            if let Err(ref e) = result {
                error!("Backup of collection '{}' failed: {}", name, e);
            }
            report.push(&name, result);
        }
        Ok(report)
    }

    /// Import every `*.jsonl` file directly under `path` into `target`
    ///
    /// Each file goes to the collection named after its stem. Files are
    /// processed in name order.
    pub async fn restore_database<D: DatabaseStore>(
        &self,
        path: &Path,
        target: &D,
        dry_run: bool,
    ) -> Result<DatabaseReport> {
        if dry_run {
            info!("Would restore {} to database '{}'", path.display(), target.name());
        } else {
            info!("Restoring {} to database '{}'", path.display(), target.name());
        }

        let mut report = DatabaseReport::new(target.name(), path.to_path_buf());
        for file in collection_files(path).await? {
            let Some(name) = file.file_stem().and_then(|s| s.to_str()) else {
                debug!("Skipping {}: file name is not UTF-8", file.display());
                continue;
            };
            if self.settings.is_cancelled() {
                info!("Restore of '{}' cancelled before '{}'", target.name(), name);
                break;
            }

            info!("Restoring collection '{}' from {}", name, file.display());
            let result = self
                .importer
                .import(&file, &target.collection(name), TransferWindow::all(), dry_run)
                .await;
            if let Err(ref e) = result {
                error!("Restore of collection '{}' failed: {}", name, e);
            }
            report.push(name, result);
        }
        Ok(report)
    }
}

/// `*.jsonl` regular files directly under `dir`, sorted by path
async fn collection_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != FILE_EXTENSION) {
            continue;
        }
        if tokio::fs::metadata(&path).await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FerryError;
    use crate::store::MemoryDatabase;
    use mongodb::bson::{Binary, Document, spec::BinarySubtype};
    use tempfile::tempdir;

    fn orchestrator() -> DatabaseOrchestrator {
        DatabaseOrchestrator::new(TransferSettings::new(4))
    }

    fn docs(n: i32) -> Vec<Document> {
        (0..n).map(|i| doc! { "i": i }).collect()
    }

    #[tokio::test]
    async fn test_backup_writes_one_file_per_collection() {
        let db = MemoryDatabase::new("shop")
            .with_collection("orders", docs(9))
            .with_collection("users", docs(3))
            .with_collection("system.views", docs(1));
        let dir = tempdir().unwrap();

        let report = orchestrator()
            .backup_database(&db, dir.path(), false)
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.transferred(), 12);
        let shop = dir.path().join("shop");
        assert!(shop.join("orders.jsonl").is_file());
        assert!(shop.join("users.jsonl").is_file());
        assert!(!shop.join("system.views.jsonl").exists());
    }

    #[tokio::test]
    async fn test_backup_dry_run_writes_nothing() {
        let db = MemoryDatabase::new("shop").with_collection("orders", docs(9));
        let dir = tempdir().unwrap();

        let report = orchestrator()
            .backup_database(&db, dir.path(), true)
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 1);
        assert!(!dir.path().join("shop").exists());
        assert_eq!(db.find_calls(), 0);
    }

    #[tokio::test]
    async fn test_backup_continues_after_failure() {
        let bad = Binary {
            subtype: BinarySubtype::Generic,
            bytes: vec![0xff],
        };
        let db = MemoryDatabase::new("shop")
            .with_collection("a_bad", vec![doc! { "blob": bad }])
            .with_collection("b_good", docs(2));
        let dir = tempdir().unwrap();

        let report = orchestrator()
            .backup_database(&db, dir.path(), false)
            .await
            .unwrap();

        let failed: Vec<&str> = report.failures().map(|(name, _)| name).collect();
        assert_eq!(failed, vec!["a_bad"]);
        assert_eq!(report.transferred(), 2);
        assert!(dir.path().join("shop").join("b_good.jsonl").is_file());
    }

    #[tokio::test]
    async fn test_restore_reads_jsonl_files_in_order() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("users.jsonl"), "{\"a\":1}\n{\"a\":2}\n").unwrap();
        std::fs::write(dir.path().join("orders.jsonl"), "{\"b\":1}\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored\n").unwrap();
        std::fs::create_dir(dir.path().join("nested.jsonl")).unwrap();
        let target = MemoryDatabase::new("restored");

        let report = orchestrator()
            .restore_database(dir.path(), &target, false)
            .await
            .unwrap();

        let names: Vec<&str> = report.outcomes.iter().map(|o| o.collection.as_str()).collect();
        assert_eq!(names, vec!["orders", "users"]);
        assert_eq!(target.documents("users").len(), 2);
        assert_eq!(target.documents("orders").len(), 1);
        assert!(target.documents("notes").is_empty());
    }

    #[tokio::test]
    async fn test_restore_continues_after_bad_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.jsonl"), "not json\n").unwrap();
        std::fs::write(dir.path().join("b.jsonl"), "{\"ok\":true}\n").unwrap();
        let target = MemoryDatabase::new("restored");

        let report = orchestrator()
            .restore_database(dir.path(), &target, false)
            .await
            .unwrap();

        let (name, err) = report.failures().next().unwrap();
        assert_eq!(name, "a");
        assert!(matches!(err, FerryError::Decoding(_)));
        assert_eq!(target.documents("b").len(), 1);
    }

    #[tokio::test]
    async fn test_restore_dry_run_inserts_nothing() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("users.jsonl"), "{\"a\":1}\n").unwrap();
        let target = MemoryDatabase::new("restored");

        let report = orchestrator()
            .restore_database(dir.path(), &target, true)
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(target.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_restore_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let target = MemoryDatabase::new("restored");
        let err = orchestrator()
            .restore_database(&dir.path().join("absent"), &target, false)
            .await
            .unwrap_err();
        assert!(matches!(err, FerryError::Io(_)));
    }

    #[tokio::test]
    async fn test_backup_then_restore() {
        let source = MemoryDatabase::new("shop")
            .with_collection("orders", docs(9))
            .with_collection("users", docs(3));
        let target = MemoryDatabase::new("copy");
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator();

        orchestrator
            .backup_database(&source, dir.path(), false)
            .await
            .unwrap();
        let report = orchestrator
            .restore_database(&dir.path().join("shop"), &target, false)
            .await
            .unwrap();

        assert!(!report.has_failures());
        let values: Vec<i32> = target
            .documents("orders")
            .iter()
            .map(|d| d.get_i32("i").unwrap())
            .collect();
        assert_eq!(values, (0..9).collect::<Vec<_>>());
        assert_eq!(target.documents("users").len(), 3);
    }
}
