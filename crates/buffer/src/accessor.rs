//! Shared, iterable handle to a [`TextBuffer`].
//!
//! The editing surface and the background classification worker both need
//! the same document, so the accessor wraps the buffer in `Arc<Mutex>`.
//! Cloning an accessor yields a fresh view of the same document with its
//! own iteration position; the underlying text is never copied.
//!
//! Read entry points degrade to sentinels ([`NULL_CHAR`], empty strings)
//! instead of panicking, because a worker iterating a snapshot position may
//! race edits that shrink the document under it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::SpanError;
use crate::gap_buffer::NULL_CHAR;
use crate::span_table::Span;
use crate::text_buffer::TextBuffer;

/// A cloneable cursor over a shared [`TextBuffer`].
#[derive(Debug)]
pub struct DocumentAccessor {
    buffer: Arc<Mutex<TextBuffer>>,
    /// Current iteration offset; runs over `0..doc_length()` so the
    /// terminator is yielded as the final character. `None` means the
    /// cursor is exhausted (an invalid seek parks it here).
    index: Option<usize>,
}

impl DocumentAccessor {
    /// Wraps a buffer for shared access.
    pub fn new(buffer: TextBuffer) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(buffer)),
            index: Some(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TextBuffer> {
        // A panic mid-edit can leave bookkeeping stale but never an invalid
        // gap, so reads through a poisoned lock stay safe.
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Iteration ====================

    /// Positions the cursor at `offset`. An invalid offset exhausts the
    /// cursor (`has_next()` false) and returns false; a later valid seek
    /// revives it.
    pub fn seek(&mut self, offset: usize) -> bool {
        let valid = self.lock().is_valid(offset);
        self.index = valid.then_some(offset);
        valid
    }

    /// Current cursor offset; `None` when exhausted.
    pub fn position(&self) -> Option<usize> {
        self.index
    }

    /// True while the cursor has characters left, the terminator included.
    pub fn has_next(&self) -> bool {
        self.index.is_some_and(|i| i < self.lock().doc_length())
    }

    /// Yields the character at the cursor and advances. An exhausted or
    /// out-of-range cursor stays put and yields [`NULL_CHAR`].
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> char {
        let Some(i) = self.index else {
            return NULL_CHAR;
        };
        let read = self.lock().char_at(i);
        match read {
            Some(c) => {
                self.index = Some(i + 1);
                c
            }
            None => NULL_CHAR,
        }
    }

    // ==================== Reads ====================

    /// Character at `offset`, or [`NULL_CHAR`] when out of range.
    pub fn char_at(&self, offset: usize) -> char {
        self.lock().char_at(offset).unwrap_or(NULL_CHAR)
    }

    /// Up to `count` characters from `offset`, clamped at end-of-text.
    pub fn sub_sequence(&self, offset: usize, count: usize) -> String {
        self.lock().sub_sequence(offset, count)
    }

    pub fn text_length(&self) -> usize {
        self.lock().text_length()
    }

    /// Character count including the terminator; the iteration bound.
    pub fn doc_length(&self) -> usize {
        self.lock().doc_length()
    }

    pub fn line_count(&self) -> usize {
        self.lock().line_count()
    }

    pub fn line_offset(&self, line: usize) -> Option<usize> {
        self.lock().line_offset(line)
    }

    pub fn offset_to_line(&self, offset: usize) -> Option<usize> {
        self.lock().offset_to_line(offset)
    }

    pub fn line_content(&self, line: usize) -> String {
        self.lock().line_content(line)
    }

    pub fn line_size(&self, line: usize) -> usize {
        self.lock().line_size(line)
    }

    /// The entire logical content.
    pub fn content(&self) -> String {
        self.lock().content()
    }

    // ==================== Edits ====================

    /// Inserts `text` at `offset` as an undoable edit.
    pub fn insert(&self, text: &str, offset: usize, timestamp: u64) -> bool {
        self.lock().insert_str(text, offset, timestamp, true)
    }

    /// Deletes up to `count` characters at `offset` as an undoable edit.
    pub fn delete(&self, offset: usize, count: usize, timestamp: u64) -> bool {
        self.lock().delete(offset, count, timestamp, true)
    }

    /// Replaces `count` characters at `offset` with `text` as one undoable
    /// step.
    pub fn replace(&self, offset: usize, count: usize, text: &str, timestamp: u64) -> bool {
        self.lock().replace(offset, count, text, timestamp)
    }

    /// Replaces the entire contents; resets spans and history.
    pub fn set_content(&self, text: &str, known_line_count: Option<usize>) {
        self.lock().set_content(text, known_line_count);
    }

    // ==================== Undo / redo ====================

    pub fn can_undo(&self) -> bool {
        self.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock().can_redo()
    }

    pub fn is_batch_edit(&self) -> bool {
        self.lock().is_batch_edit()
    }

    pub fn begin_batch(&self) {
        self.lock().begin_batch();
    }

    pub fn end_batch(&self) {
        self.lock().end_batch();
    }

    /// Reverts the newest edit batch; returns the resulting caret offset.
    pub fn undo(&self) -> Option<usize> {
        self.lock().undo()
    }

    /// Re-applies the most recently undone batch; returns the resulting
    /// caret offset.
    pub fn redo(&self) -> Option<usize> {
        self.lock().redo()
    }

    // ==================== Spans ====================

    /// Snapshot of the current classification runs.
    pub fn spans(&self) -> Vec<Span> {
        self.lock().spans().to_vec()
    }

    /// Applies a completed classification pass; rejected when stale.
    pub fn replace_spans(&self, runs: Vec<Span>) -> Result<(), SpanError> {
        self.lock().replace_spans(runs)
    }

    pub fn clear_spans(&self) {
        self.lock().clear_spans();
    }
}

impl Clone for DocumentAccessor {
    /// A new view of the same document, cursor rewound to the start.
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            index: Some(0),
        }
    }
}
