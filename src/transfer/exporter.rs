//! Collection export to a JSON Lines file
//!
//! An export counts the matching documents once, then walks the requested
//! window in batch-sized skip/limit pages, appending every page to
//! `<dir>/<collection>.jsonl` before fetching the next one.

use std::path::Path;
use std::time::Instant;

use mongodb::bson::Document;
use tracing::{debug, info};

use crate::config::WritePolicy;
use crate::error::Result;
use crate::store::CollectionStore;

use super::lines::LineStore;
use super::progress::ProgressTracker;
use super::report::{TransferKind, TransferReport};
use super::settings::TransferSettings;
use super::window::TransferWindow;

/// Copies one collection into a JSON Lines file
#[derive(Debug, Clone)]
pub struct CollectionExporter {
    settings: TransferSettings,
    store: LineStore,
}

impl CollectionExporter {
    pub fn new(settings: TransferSettings) -> Self {
        let store = LineStore::new(settings.batch_size);
        Self { settings, store }
    }

    /// Export the documents of `source` matching `filter` into `dest_dir`
    ///
    /// With `dry_run` only the count query runs. When there is nothing to
    /// transfer no file is written; under [`WritePolicy::Truncate`] an
    /// existing file from an earlier run is removed.
    pub async fn export<C: CollectionStore>(
        &self,
        source: &C,
        dest_dir: &Path,
        window: TransferWindow,
        filter: Document,
        dry_run: bool,
    ) -> Result<TransferReport> {
        let start_time = Instant::now();
        let name = source.name();

        let total = source.count(filter.clone()).await?;
        let mut report = TransferReport {
            path: Some(LineStore::file_path(dest_dir, name)),
            total: Some(total),
            dry_run,
            ..TransferReport::new(TransferKind::Export, name)
        };

        if dry_run {
            info!(
                "Would export {} documents from '{}' to {}",
                total,
                name,
                dest_dir.display()
            );
            return Ok(report);
        }

        let effective = window.effective_count(total);
        info!("{} documents in '{}', exporting {} ({})", total, name, effective, window);
        if effective == 0 {
            if self.settings.write_policy == WritePolicy::Truncate {
                self.store.discard(dest_dir, name).await?;
            }
            report.elapsed_ms = start_time.elapsed().as_millis() as u64;
            return Ok(report);
        }

        self.store
            .prepare_destination(dest_dir, name, self.settings.write_policy)
            .await?;

        let tracker = ProgressTracker::new("Downloaded", effective, self.settings.progress_bar);
        let outcome = self
            .copy_pages(source, dest_dir, window, effective, &filter, &tracker, &mut report)
            .await;
        tracker.finish();
        outcome?;

        report.elapsed_ms = start_time.elapsed().as_millis() as u64;
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn copy_pages<C: CollectionStore>(
        &self,
        source: &C,
        dest_dir: &Path,
        window: TransferWindow,
        effective: u64,
        filter: &Document,
        tracker: &ProgressTracker,
        report: &mut TransferReport,
    ) -> Result<()> {
        let name = source.name();

        for page in window.pages(effective, self.settings.batch_size) {
            if self.settings.is_cancelled() {
                info!("Export of '{}' cancelled after {} documents", name, report.transferred);
                report.cancelled = true;
                break;
            }

            debug!("Fetching '{}' skip={} limit={}", name, page.skip, page.size);
            let batch = source.find(filter.clone(), page.skip, page.size).await?;
            if batch.is_empty() {
                debug!("'{}' returned no documents at skip={}, stopping", name, page.skip);
                break;
            }

            let written = self.store.append(dest_dir, name, &batch).await?;
            report.batches += 1;
            report.transferred += written as u64;
            tracker.advance(written as u64);
        }
        Ok(())
    }
}
