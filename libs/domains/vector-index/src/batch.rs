use std::num::NonZeroUsize;

use crate::error::{VectorIndexError, VectorIndexResult};

/// Default number of items per bulk store call
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Order-preserving, contiguous chunking.
///
/// Batch `i` always holds items `[i * size, min((i + 1) * size, len))`, so a
/// batch counter in a log line maps back to source positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSplitter {
    size: NonZeroUsize,
}

impl BatchSplitter {
    pub fn new(size: usize) -> VectorIndexResult<Self> {
        NonZeroUsize::new(size)
            .map(|size| Self { size })
            .ok_or_else(|| VectorIndexError::Validation("batch size must be at least 1".to_string()))
    }

    pub fn size(&self) -> usize {
        self.size.get()
    }

    /// `ceil(len / size)`
    pub fn total_batches(&self, len: usize) -> usize {
        len.div_ceil(self.size.get())
    }

    pub fn split<'a, T>(&self, items: &'a [T]) -> Vec<&'a [T]> {
        items.chunks(self.size.get()).collect()
    }

    /// Owned variant of [`split`](Self::split); moves items, never clones them.
    pub fn split_owned<T>(&self, items: Vec<T>) -> Vec<Vec<T>> {
        let size = self.size.get();
        let mut batches = Vec::with_capacity(self.total_batches(items.len()));
        let mut current = Vec::with_capacity(size.min(items.len()));

        for item in items {
            current.push(item);
            if current.len() == size {
                batches.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
            }
        }
        if !current.is_empty() {
            batches.push(current);
        }

        batches
    }
}

impl Default for BatchSplitter {
    fn default() -> Self {
        Self {
            size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
        }
    }
}
