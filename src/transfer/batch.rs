//! Fixed-size batching over any iterator

/// Iterator adapter yielding `Vec<T>` chunks of at most `size` items
///
/// Created by [`BatchExt::batched`]. Consumes its source; restarting means
/// building a new adapter over a new source.
#[derive(Debug)]
pub struct Batched<I> {
    inner: I,
    size: usize,
    remaining: Option<u64>,
}

impl<I: Iterator> Batched<I> {
    /// # Panics
    /// Panics if `size` is zero.
    pub fn new(inner: I, size: usize, limit: Option<u64>) -> Self {
        assert!(size > 0, "batch size must be positive");
        Self {
            inner,
            size,
            remaining: limit,
        }
    }
}

impl<I: Iterator> Iterator for Batched<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            if self.remaining == Some(0) {
                break;
            }
            let Some(item) = self.inner.next() else {
                break;
            };
            batch.push(item);
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
        }

        if batch.is_empty() { None } else { Some(batch) }
    }
}

/// Extension trait adding [`batched`](BatchExt::batched) to every iterator
pub trait BatchExt: Iterator + Sized {
    /// Group items into batches of `size`, stopping after `limit` items if set
    ///
    /// The trailing batch may be shorter than `size`; empty batches are never
    /// produced.
    fn batched(self, size: usize, limit: Option<u64>) -> Batched<Self> {
        Batched::new(self, size, limit)
    }
}

impl<I: Iterator> BatchExt for I {}
