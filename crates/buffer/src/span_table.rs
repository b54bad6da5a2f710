//! Run-length classification spans over the buffer.
//!
//! The table partitions the logical text into contiguous runs, each carrying
//! an opaque classification tag produced by an external tokenizer. Edits
//! patch the runs incrementally so the table stays usable until the next
//! classification pass replaces it wholesale.
//!
//! Invariant: outside of an in-progress edit, the run lengths sum exactly to
//! the buffer's logical length.

use crate::error::SpanError;
use tracing::warn;

/// Opaque classification tag. Styling dispatch is external; the table only
/// stores the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagId(pub u16);

impl TagId {
    /// Unclassified text.
    pub const NORMAL: TagId = TagId(0);
}

/// A contiguous run of characters sharing one classification tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub length: usize,
    pub tag: TagId,
}

impl Span {
    pub fn new(length: usize, tag: TagId) -> Self {
        Self { length, tag }
    }
}

/// Ordered run-length partition of the buffer, patched on every edit.
#[derive(Debug)]
pub struct SpanTable {
    runs: Vec<Span>,
}

impl SpanTable {
    /// Creates a table with a single unclassified run covering `length`.
    pub fn new(length: usize) -> Self {
        Self {
            runs: vec![Span::new(length, TagId::NORMAL)],
        }
    }

    /// Resets to a single unclassified run covering `length`.
    pub fn reset(&mut self, length: usize) {
        self.runs.clear();
        self.runs.push(Span::new(length, TagId::NORMAL));
    }

    /// Returns the current runs in order.
    pub fn spans(&self) -> &[Span] {
        &self.runs
    }

    /// Sum of all run lengths. Equals the buffer's logical length outside of
    /// an in-progress edit.
    pub fn total_length(&self) -> usize {
        self.runs.iter().map(|r| r.length).sum()
    }

    /// Finds the run absorbing an insert at `offset`: the first run whose
    /// cumulative length reaches or exceeds the offset (inclusive boundary).
    /// Returns (run index, offset where that run starts).
    fn find_run_inclusive(&self, offset: usize) -> (usize, usize) {
        let mut cumulative = 0;
        for (i, run) in self.runs.iter().enumerate() {
            cumulative += run.length;
            if cumulative >= offset {
                return (i, cumulative - run.length);
            }
        }
        (0, 0)
    }

    /// Finds the run containing `offset` for a delete: the first run whose
    /// cumulative length strictly exceeds the offset (exclusive boundary).
    ///
    /// The tie-break differs from [`Self::find_run_inclusive`] on purpose: an
    /// edit exactly at a run boundary is absorbed by the earlier run on
    /// insert but taken from the later run on delete. Downstream highlighting
    /// depends on this asymmetry.
    fn find_run_exclusive(&self, offset: usize) -> (usize, usize) {
        let mut cumulative = 0;
        for (i, run) in self.runs.iter().enumerate() {
            cumulative += run.length;
            if cumulative > offset {
                return (i, cumulative - run.length);
            }
        }
        (0, 0)
    }

    /// Extends the run at `offset` by `count`. Inserted text inherits that
    /// run's tag; the approximation is corrected by the next classification
    /// pass.
    pub fn on_insert(&mut self, offset: usize, count: usize) {
        if count == 0 {
            return;
        }
        let (index, _) = self.find_run_inclusive(offset);
        self.runs[index].length += count;
    }

    /// Shrinks runs to account for deleting `count` characters at `offset`,
    /// spilling into subsequent runs when the first one is exhausted. Runs
    /// reduced to zero length are removed. Deleting the entire content
    /// resets the table to a single empty unclassified run.
    pub fn on_delete(&mut self, offset: usize, mut count: usize) {
        if count == 0 {
            return;
        }
        if count >= self.total_length() {
            self.reset(0);
            return;
        }
        let (mut index, run_start) = self.find_run_exclusive(offset);
        let mut within = offset - run_start.min(offset);
        while count > 0 && index < self.runs.len() {
            let available = self.runs[index].length - within;
            let taken = available.min(count);
            self.runs[index].length -= taken;
            count -= taken;
            if self.runs[index].length == 0 {
                self.runs.remove(index);
            } else {
                index += 1;
            }
            within = 0;
        }
    }

    /// Wholesale substitution by a completed classification pass.
    ///
    /// The new table's lengths must sum to `expected_length` (the buffer's
    /// logical length at application time). Otherwise the new table is
    /// rejected and the previous one kept; a pass that raced content changes
    /// is discarded, never forced in. An empty table over an empty buffer is
    /// normalized to the single `(0, NORMAL)` run.
    pub fn replace(&mut self, new_runs: Vec<Span>, expected_length: usize) -> Result<(), SpanError> {
        let actual: usize = new_runs.iter().map(|r| r.length).sum();
        if actual != expected_length {
            warn!(expected = expected_length, actual, "rejected span table: length mismatch");
            return Err(SpanError::LengthMismatch {
                expected: expected_length,
                actual,
            });
        }
        if new_runs.is_empty() {
            self.reset(0);
        } else {
            self.runs = new_runs;
        }
        Ok(())
    }
}
