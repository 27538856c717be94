//! Outcome summaries returned by transfer operations

use std::fmt;
use std::path::PathBuf;

use crate::error::FerryError;

/// Direction of a collection transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Export,
    Import,
    Move,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferKind::Export => write!(f, "export"),
            TransferKind::Import => write!(f, "import"),
            TransferKind::Move => write!(f, "move"),
        }
    }
}

/// Result of transferring one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub kind: TransferKind,
    pub collection: String,
    /// File read or written, if any
    pub path: Option<PathBuf>,
    /// Matching documents at the source; `None` when unknown (imports)
    pub total: Option<u64>,
    /// Documents written to the file or inserted into the target
    pub transferred: u64,
    pub batches: u64,
    pub dry_run: bool,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl TransferReport {
    pub fn new(kind: TransferKind, collection: &str) -> Self {
        Self {
            kind,
            collection: collection.to_string(),
            path: None,
            total: None,
            transferred: 0,
            batches: 0,
            dry_run: false,
            cancelled: false,
            elapsed_ms: 0,
        }
    }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(f, "[dry run] would {} '{}'", self.kind, self.collection)?;
            if let Some(total) = self.total {
                write!(f, " ({total} documents)")?;
            }
            if let Some(ref path) = self.path {
                write!(f, " via {}", path.display())?;
            }
            return Ok(());
        }

        write!(
            f,
            "{} '{}': {} documents in {} batches",
            self.kind, self.collection, self.transferred, self.batches
        )?;
        if let Some(total) = self.total {
            write!(f, " ({total} matched)")?;
        }
        if let Some(ref path) = self.path {
            write!(f, " [{}]", path.display())?;
        }
        write!(f, " in {}ms", self.elapsed_ms)?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// Per-collection result inside a database-level operation
#[derive(Debug)]
pub struct CollectionOutcome {
    pub collection: String,
    pub result: Result<TransferReport, FerryError>,
}

/// Result of a database-level backup or restore
#[derive(Debug)]
pub struct DatabaseReport {
    pub database: String,
    pub path: PathBuf,
    pub outcomes: Vec<CollectionOutcome>,
}

impl DatabaseReport {
    pub fn new(database: &str, path: PathBuf) -> Self {
        Self {
            database: database.to_string(),
            path,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, collection: &str, result: Result<TransferReport, FerryError>) {
        self.outcomes.push(CollectionOutcome {
            collection: collection.to_string(),
            result,
        });
    }

    /// Reports of the collections that succeeded
    pub fn succeeded(&self) -> impl Iterator<Item = &TransferReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Collections that failed, with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&str, &FerryError)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Ok(_) => None,
            Err(e) => Some((o.collection.as_str(), e)),
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Documents transferred across all successful collections
    pub fn transferred(&self) -> u64 {
        self.succeeded().map(|r| r.transferred).sum()
    }

    /// Whether any collection stopped early on cancellation
    pub fn cancelled(&self) -> bool {
        self.succeeded().any(|r| r.cancelled)
    }
}

impl fmt::Display for DatabaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "database '{}' ({}): {} collections, {} documents",
            self.database,
            self.path.display(),
            self.outcomes.len(),
            self.transferred()
        )?;
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(report) => writeln!(f, "  {report}")?,
                Err(e) => writeln!(f, "  '{}' failed: {e}", outcome.collection)?,
            }
        }
        Ok(())
    }
}
