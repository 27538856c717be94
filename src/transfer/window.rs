//! Offset/limit bounds and skip-window planning

use std::fmt;

/// Sentinel accepted on the command line for "no limit"
pub const UNBOUNDED: i64 = -1;

/// Which items of a source a transfer visits
///
/// `offset` leading items are skipped; at most `limit` items are processed
/// after that (`None` means no cutoff).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferWindow {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl TransferWindow {
    /// Visit everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }

    /// Build a window from signed command line values
    ///
    /// A negative offset is clamped to zero; any negative limit, including
    /// [`UNBOUNDED`], removes the cutoff.
    pub fn from_raw(offset: i64, limit: i64) -> Self {
        Self {
            offset: offset.max(0) as u64,
            limit: (limit >= 0).then_some(limit as u64),
        }
    }

    /// Number of items to transfer out of `available`
    pub fn effective_count(&self, available: u64) -> u64 {
        let after_skip = available.saturating_sub(self.offset);
        match self.limit {
            Some(limit) => after_skip.min(limit),
            None => after_skip,
        }
    }

    /// Skip windows covering `effective` items in steps of `batch_size`
    ///
    /// Each window's `skip` already includes the offset.
    pub fn pages(&self, effective: u64, batch_size: usize) -> Pages {
        Pages {
            offset: self.offset,
            effective,
            step: batch_size.max(1) as u64,
            start: 0,
        }
    }
}

impl fmt::Display for TransferWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "offset={} limit={}", self.offset, limit),
            None => write!(f, "offset={} limit=none", self.offset),
        }
    }
}

/// One paginated query: skip `skip` items, take `size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u64,
    pub size: u64,
}

/// Iterator over the [`Page`]s of a transfer
#[derive(Debug, Clone)]
pub struct Pages {
    offset: u64,
    effective: u64,
    step: u64,
    start: u64,
}

impl Iterator for Pages {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        if self.start >= self.effective {
            return None;
        }
        let size = self.step.min(self.effective - self.start);
        let page = Page {
            skip: self.offset + self.start,
            size,
        };
        self.start += size;
        Some(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_clamps_and_sentinel() {
        assert_eq!(TransferWindow::from_raw(-5, UNBOUNDED), TransferWindow::all());
        assert_eq!(
            TransferWindow::from_raw(10, 20),
            TransferWindow::new(10, Some(20))
        );
        assert_eq!(TransferWindow::from_raw(0, -42).limit, None);
        assert_eq!(TransferWindow::from_raw(0, 0).limit, Some(0));
    }

    #[test]
    fn test_effective_count() {
        assert_eq!(TransferWindow::all().effective_count(1300), 1300);
        assert_eq!(TransferWindow::new(0, Some(100)).effective_count(1300), 100);
        assert_eq!(TransferWindow::new(1250, Some(100)).effective_count(1300), 50);
        assert_eq!(TransferWindow::new(2000, None).effective_count(1300), 0);
    }

    #[test]
    fn test_pages_for_1300_documents() {
        let pages: Vec<Page> = TransferWindow::all().pages(1300, 512).collect();
        assert_eq!(
            pages,
            vec![
                Page { skip: 0, size: 512 },
                Page { skip: 512, size: 512 },
                Page { skip: 1024, size: 276 },
            ]
        );
    }

    #[test]
    fn test_pages_include_offset() {
        let window = TransferWindow::new(10, Some(5));
        let effective = window.effective_count(100);
        let pages: Vec<Page> = window.pages(effective, 2).collect();
        assert_eq!(
            pages,
            vec![
                Page { skip: 10, size: 2 },
                Page { skip: 12, size: 2 },
                Page { skip: 14, size: 1 },
            ]
        );
    }

    #[test]
    fn test_no_pages_when_empty() {
        assert_eq!(TransferWindow::all().pages(0, 512).count(), 0);
    }
}
