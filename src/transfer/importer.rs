//! Collection import from a JSON Lines file

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::Result;
use crate::store::CollectionStore;

use super::lines::LineStore;
use super::progress::ProgressTracker;
use super::report::{TransferKind, TransferReport};
use super::settings::TransferSettings;
use super::window::TransferWindow;

/// Inserts the documents of a JSON Lines file into a collection
///
/// One `insert_many` call per batch. Documents are inserted as they are;
/// importing the same file twice inserts everything twice, or fails on
/// duplicate `_id`s if the file carries them.
#[derive(Debug, Clone)]
pub struct CollectionImporter {
    settings: TransferSettings,
    store: LineStore,
}

impl CollectionImporter {
    pub fn new(settings: TransferSettings) -> Self {
        let store = LineStore::new(settings.batch_size);
        Self { settings, store }
    }

    /// Import `source_path` into `target`
    ///
    /// With `dry_run` the file is not opened and nothing is inserted.
    pub async fn import<C: CollectionStore>(
        &self,
        source_path: &Path,
        target: &C,
        window: TransferWindow,
        dry_run: bool,
    ) -> Result<TransferReport> {
        let start_time = Instant::now();
        let name = target.name();
        let mut report = TransferReport {
            path: Some(source_path.to_path_buf()),
            dry_run,
            ..TransferReport::new(TransferKind::Import, name)
        };

        if dry_run {
            info!(
                "Would import {} into '{}' ({})",
                source_path.display(),
                name,
                window
            );
            return Ok(report);
        }

        info!("Importing {} into '{}' ({})", source_path.display(), name, window);
        let mut batches = self.store.read(source_path, window)?;
        let tracker = ProgressTracker::unbounded("Inserted", self.settings.progress_bar);

        let outcome: Result<()> = async {
            loop {
                if self.settings.is_cancelled() {
                    info!("Import into '{}' cancelled after {} documents", name, report.transferred);
                    report.cancelled = true;
                    break;
                }

                let Some(batch) = batches.next() else {
                    break;
                };
                let batch = batch?;
                if batch.is_empty() {
                    continue;
                }

                debug!("Inserting {} documents into '{}'", batch.len(), name);
                let ids = target.insert_many(batch).await?;
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
}
