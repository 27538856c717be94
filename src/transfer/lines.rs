//! JSON Lines files, one per collection
//!
//! Writing goes through [`LineStore::append`], which opens the collection's
//! file in append mode, writes one encoded document per line, flushes and
//! closes it again. No handle outlives a single call.
//!
//! Reading goes through [`LineStore::read`], which returns a [`BatchReader`]
//! owning the open file. The reader is lazy: lines are decoded only as
//! batches are pulled, and the file is closed when the reader is dropped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use mongodb::bson::Document;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::config::WritePolicy;
use crate::error::{FerryError, Result, TransferError};

use super::batch::{BatchExt, Batched};
use super::codec::RecordCodec;
use super::window::TransferWindow;

/// File extension used for collection files
pub const FILE_EXTENSION: &str = "jsonl";

/// Reads and writes collection files in fixed-size batches
#[derive(Debug, Clone)]
pub struct LineStore {
    batch_size: usize,
    codec: RecordCodec,
}

impl LineStore {
    /// # Panics
    /// Panics if `batch_size` is zero.
    pub fn new(batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        Self {
            batch_size,
            codec: RecordCodec::new(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// `<dir>/<collection>.jsonl`
    pub fn file_path(dir: &Path, collection: &str) -> PathBuf {
        dir.join(format!("{collection}.{FILE_EXTENSION}"))
    }

    /// Create the destination directory and apply the write policy once
    ///
    /// Returns the path of the collection file.
    pub async fn prepare_destination(
        &self,
        dir: &Path,
        collection: &str,
        policy: WritePolicy,
    ) -> Result<PathBuf> {
        if dir.is_file() {
            return Err(TransferError::InvalidDestination(format!(
                "{} is a file, expected a directory",
                dir.display()
            ))
            .into());
        }
        tokio::fs::create_dir_all(dir).await?;

        let path = Self::file_path(dir, collection);
        if policy == WritePolicy::Truncate {
            debug!("Truncating {}", path.display());
            tokio::fs::File::create(&path).await?;
        }
        Ok(path)
    }

    /// Remove the collection's file if it exists
    ///
    /// Returns whether a file was removed.
    pub async fn discard(&self, dir: &Path, collection: &str) -> Result<bool> {
        let path = Self::file_path(dir, collection);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Append a batch to the collection's file, one line per document
    ///
    /// Every document is encoded before anything is written, so a batch that
    /// fails to encode leaves the file untouched.
    pub async fn append(&self, dir: &Path, collection: &str, batch: &[Document]) -> Result<usize> {
        let mut buffer = String::new();
        for document in batch {
            buffer.push_str(&self.codec.encode(document)?);
            buffer.push('\n');
        }

        tokio::fs::create_dir_all(dir).await?;
        let path = Self::file_path(dir, collection);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let mut writer = BufWriter::new(file);
        writer.write_all(buffer.as_bytes()).await?;
        writer.flush().await?;

        debug!("Appended {} documents to {}", batch.len(), path.display());
        Ok(batch.len())
    }

    /// Open `path` and return its documents as a lazy sequence of batches
    ///
    /// `window.offset` physical lines are skipped first. A file shorter than
    /// the offset is not an error: a warning is logged and the sequence is
    /// empty. Blank lines after the offset are ignored. `window.limit` caps
    /// the number of documents.
    pub fn read(&self, path: &Path, window: TransferWindow) -> Result<BatchReader> {
        let file = File::open(path)?;
        let mut lines = RecordLines::new(BufReader::new(file), self.codec);

        match lines.skip_lines(window.offset) {
            Ok(()) => {}
            Err(FerryError::Transfer(notice @ TransferError::OffsetBeyondEnd { .. })) => {
                warn!("{}: {notice}, nothing to read", path.display());
                lines.finish();
            }
            Err(e) => return Err(e),
        }

        Ok(BatchReader {
            batches: lines.batched(self.batch_size, window.limit),
        })
    }
}

/// Lazy batches of decoded documents from one file
///
/// Yields `Err` at most once; the sequence ends after the first error.
#[derive(Debug)]
pub struct BatchReader {
    batches: Batched<RecordLines>,
}

impl Iterator for BatchReader {
    type Item = Result<Vec<Document>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.batches
            .next()
            .map(|batch| batch.into_iter().collect())
    }
}

/// Decoded, non-blank lines of a file with their 1-based line numbers
#[derive(Debug)]
struct RecordLines {
    reader: BufReader<File>,
    codec: RecordCodec,
    line_number: u64,
    buffer: String,
    done: bool,
}

impl RecordLines {
    fn new(reader: BufReader<File>, codec: RecordCodec) -> Self {
        Self {
            reader,
            codec,
            line_number: 0,
            buffer: String::new(),
            done: false,
        }
    }

    fn finish(&mut self) {
        self.done = true;
    }

    /// Read the next physical line into `buffer`; `false` at end of file
    fn next_line(&mut self) -> Result<bool> {
        self.buffer.clear();
        let read = self.reader.read_line(&mut self.buffer)?;
        if read == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        Ok(true)
    }

    fn skip_lines(&mut self, count: u64) -> Result<()> {
        while self.line_number < count {
            if !self.next_line()? {
                return Err(TransferError::OffsetBeyondEnd {
                    offset: count,
                    lines: self.line_number,
                }
                .into());
            }
        }
        Ok(())
    }
}

impl Iterator for RecordLines {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.next_line() {
                Ok(false) => self.done = true,
                Ok(true) if self.buffer.trim().is_empty() => continue,
                Ok(true) => {
                    let decoded = self.codec.decode_line(&self.buffer, self.line_number);
                    if decoded.is_err() {
                        self.done = true;
                    }
                    return Some(decoded);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodingError;
    use mongodb::bson::doc;
    use tempfile::tempdir;

    fn numbered(n: i32) -> Vec<Document> {
        (0..n).map(|i| doc! { "n": i }).collect()
    }

    fn read_all(store: &LineStore, path: &Path, window: TransferWindow) -> Vec<Document> {
        store
            .read(path, window)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    fn line_count(path: &Path) -> usize {
        std::fs::read_to_string(path).unwrap().lines().count()
    }

    #[tokio::test]
    async fn test_append_creates_directories_and_accumulates() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = LineStore::new(4);

        store.append(&nested, "users", &numbered(3)).await.unwrap();
        store.append(&nested, "users", &numbered(3)).await.unwrap();

        let path = LineStore::file_path(&nested, "users");
        assert!(path.ends_with("a/b/users.jsonl"));
        assert_eq!(line_count(&path), 6);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_prepare_destination_policies() {
        let dir = tempdir().unwrap();
        let store = LineStore::new(4);
        store.append(dir.path(), "c", &numbered(5)).await.unwrap();

        let path = store
            .prepare_destination(dir.path(), "c", WritePolicy::Append)
            .await
            .unwrap();
        assert_eq!(line_count(&path), 5);

        store
            .prepare_destination(dir.path(), "c", WritePolicy::Truncate)
            .await
            .unwrap();
        assert_eq!(line_count(&path), 0);
    }

    #[tokio::test]
    async fn test_prepare_destination_rejects_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, "x").unwrap();

        let err = LineStore::new(4)
            .prepare_destination(&file, "c", WritePolicy::Append)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FerryError::Transfer(TransferError::InvalidDestination(_))
        ));
    }

    #[tokio::test]
    async fn test_encoding_failure_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = LineStore::new(4);
        let nan = f64::NAN;
        let batch = vec![doc! { "ok": 1 }, doc! { "bad": nan }];

        assert!(store.append(dir.path(), "c", &batch).await.is_err());
        assert!(!LineStore::file_path(dir.path(), "c").exists());
    }

    #[tokio::test]
    async fn test_read_batches_in_order() {
        let dir = tempdir().unwrap();
        let store = LineStore::new(4);
        store.append(dir.path(), "c", &numbered(10)).await.unwrap();
        let path = LineStore::file_path(dir.path(), "c");

        let batches: Vec<Vec<Document>> = store
            .read(&path, TransferWindow::all())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(batches[2][1], doc! { "n": 9 });
    }

    #[tokio::test]
    async fn test_read_offset_yields_remaining_lines() {
        let dir = tempdir().unwrap();
        let store = LineStore::new(3);
        store.append(dir.path(), "c", &numbered(10)).await.unwrap();
        let path = LineStore::file_path(dir.path(), "c");

        for offset in 0..=12u64 {
            let docs = read_all(&store, &path, TransferWindow::new(offset, None));
            assert_eq!(docs.len() as u64, 10u64.saturating_sub(offset), "offset={offset}");
            if let Some(first) = docs.first() {
                assert_eq!(first.get_i32("n").unwrap() as u64, offset);
            }
        }
    }

    #[tokio::test]
    async fn test_read_offset_and_limit() {
        let dir = tempdir().unwrap();
        let store = LineStore::new(3);
        store.append(dir.path(), "c", &numbered(10)).await.unwrap();
        let path = LineStore::file_path(dir.path(), "c");

        let docs = read_all(&store, &path, TransferWindow::new(2, Some(5)));
        let values: Vec<i32> = docs.iter().map(|d| d.get_i32("n").unwrap()).collect();
        assert_eq!(values, vec![2, 3, 4, 5, 6]);

        assert!(read_all(&store, &path, TransferWindow::new(0, Some(0))).is_empty());
    }

    #[test]
    fn test_read_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.jsonl");
        std::fs::write(&path, "{\"a\":1}\n\n   \n{\"a\":2}\n").unwrap();

        let docs = read_all(&LineStore::new(8), &path, TransferWindow::all());
        assert_eq!(docs, vec![doc! { "a": 1 }, doc! { "a": 2 }]);
    }

    #[test]
    fn test_read_reports_bad_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.jsonl");
        std::fs::write(&path, "{\"a\":1}\n{\"a\":2}\nnope\n{\"a\":4}\n").unwrap();

        let mut reader = LineStore::new(2).read(&path, TransferWindow::all()).unwrap();
        assert_eq!(reader.next().unwrap().unwrap().len(), 2);
        match reader.next().unwrap().unwrap_err() {
            FerryError::Decoding(DecodingError::InvalidJson { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = LineStore::new(2)
            .read(&dir.path().join("absent.jsonl"), TransferWindow::all())
            .unwrap_err();
        assert!(matches!(err, FerryError::Io(_)));
    }
}
