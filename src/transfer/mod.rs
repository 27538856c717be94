//! Batched transfer engine
//!
//! This module moves collections between a database and JSON Lines files,
//! and between clusters, a bounded batch at a time.
//!
//! # Architecture
//!
//! Leaves first:
//!
//! 1. **Batching** ([`batch`]): fixed-size chunks over any iterator, with an
//!    optional item cutoff
//! 2. **RecordCodec** ([`codec`]): one document per JSON line
//! 3. **LineStore** ([`lines`]): append batches to `<collection>.jsonl`, read
//!    a file back as lazy batches honouring offset and limit
//! 4. **CollectionExporter** / **CollectionImporter**: skip/limit pages from
//!    a collection into a file, and file batches into `insert_many` calls
//! 5. **DatabaseOrchestrator**: the above for every collection of a database
//! 6. **Mover**: same-cluster and cross-cluster moves
//!
//! Everything runs sequentially. A [`TransferSettings`] carries the batch
//! size, write policy, progress display and an optional cancellation token
//! that is checked between batches.

pub mod batch;
pub mod codec;
pub mod exporter;
pub mod importer;
pub mod lines;
pub mod mover;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod settings;
pub mod window;

pub use batch::{BatchExt, Batched};
pub use codec::RecordCodec;
pub use exporter::CollectionExporter;
pub use importer::CollectionImporter;
pub use lines::{BatchReader, LineStore};
pub use mover::{ClusterRoute, CollectionMoveReport, DatabaseMoveReport, Mover};
pub use orchestrator::DatabaseOrchestrator;
pub use progress::ProgressTracker;
pub use report::{CollectionOutcome, DatabaseReport, TransferKind, TransferReport};
pub use settings::TransferSettings;
pub use window::{Page, TransferWindow, UNBOUNDED};
