//! Fixed-size batching of feed updates.

use super::sink::FeedUpdate;

/// Collects updates and hands them out in batches of `size`.
#[derive(Debug)]
pub struct Batcher {
    size: usize,
    pending: Vec<FeedUpdate>,
}

impl Batcher {
    /// `size` is clamped to at least 1.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            pending: Vec::with_capacity(size),
        }
    }

    /// Add an update. Returns a full batch once `size` updates are pending.
    pub fn push(&mut self, update: FeedUpdate) -> Option<Vec<FeedUpdate>> {
        self.pending.push(update);
        if self.pending.len() >= self.size {
            Some(std::mem::replace(&mut self.pending, Vec::with_capacity(self.size)))
        } else {
            None
        }
    }

    /// Take whatever is left, if anything.
    pub fn finish(&mut self) -> Option<Vec<FeedUpdate>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
