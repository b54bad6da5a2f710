//! TextBuffer sequences one logical edit across the storage engine.
//!
//! It owns the gap buffer, the line-offset cache, the span table and the
//! undo stack. Every insert/delete runs the same pipeline: capture for undo,
//! mutate storage (which keeps the newline count current), invalidate cached
//! line anchors at/after the edit point, and patch the classification runs.
//!
//! Line⇄offset conversion starts from the nearest cached anchor and scans
//! forward or backward counting newline characters; it never rescans the
//! whole buffer.

use crate::error::SpanError;
use crate::gap_buffer::{GapBuffer, EOF_CHAR};
use crate::line_cache::LineOffsetCache;
use crate::span_table::{Span, SpanTable};
use crate::undo_stack::{CommandKind, UndoStack};

/// Text storage with line indexing, classification spans and undo/redo.
#[derive(Debug)]
pub struct TextBuffer {
    storage: GapBuffer,
    cache: LineOffsetCache,
    spans: SpanTable,
    undo: UndoStack,
    /// Mutation counter for sampling debug assertions (debug builds only).
    #[cfg(debug_assertions)]
    debug_mutation_count: u64,
}

impl TextBuffer {
    /// Creates an empty buffer: zero characters, one line.
    pub fn new() -> Self {
        Self {
            storage: GapBuffer::new(),
            cache: LineOffsetCache::new(),
            spans: SpanTable::new(0),
            undo: UndoStack::new(),
            #[cfg(debug_assertions)]
            debug_mutation_count: 0,
        }
    }

    /// Creates a buffer initialized with the given text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Self {
        let storage = GapBuffer::from_str(text);
        let spans = SpanTable::new(storage.text_length());
        Self {
            storage,
            cache: LineOffsetCache::new(),
            spans,
            undo: UndoStack::new(),
            #[cfg(debug_assertions)]
            debug_mutation_count: 0,
        }
    }

    /// Replaces the entire contents (load path). `known_line_count` skips the
    /// newline rescan when the loader already counted terminators. Resets
    /// the span table and the edit history.
    pub fn set_content(&mut self, text: &str, known_line_count: Option<usize>) {
        self.storage.set_content(text, known_line_count);
        self.cache = LineOffsetCache::new();
        self.spans.reset(self.storage.text_length());
        self.undo = UndoStack::new();
    }

    // ==================== Reads ====================

    /// Logical character count, terminator excluded.
    pub fn text_length(&self) -> usize {
        self.storage.text_length()
    }

    /// Character count including the terminator slot; the exclusive upper
    /// bound for iteration through an accessor.
    pub fn doc_length(&self) -> usize {
        self.storage.text_length() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.storage.line_count()
    }

    /// Physical storage size in characters; grows as the gap reallocates.
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// True if `offset` addresses a logical character or the terminator slot.
    pub fn is_valid(&self, offset: usize) -> bool {
        self.storage.is_valid(offset)
    }

    /// Character at `offset`; a pure read that never moves the gap.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.storage.char_at(offset)
    }

    /// Up to `count` characters from `offset`, clamped at end-of-text.
    pub fn sub_sequence(&self, offset: usize, count: usize) -> String {
        self.storage.sub_sequence(offset, count)
    }

    /// The entire logical content, terminator excluded (save path).
    pub fn content(&self) -> String {
        self.storage.to_string()
    }

    // ==================== Line mapping ====================

    /// Offset of the first character of `line`, or `None` for an
    /// out-of-range line.
    pub fn line_offset(&mut self, line: usize) -> Option<usize> {
        if line >= self.line_count() {
            return None;
        }
        let (anchor_line, anchor_offset) = self.cache.nearest_line(line);
        let offset = match line.cmp(&anchor_line) {
            std::cmp::Ordering::Greater => self.scan_forward_to_line(line, anchor_line, anchor_offset)?,
            std::cmp::Ordering::Less => self.scan_backward_to_line(line, anchor_line, anchor_offset)?,
            std::cmp::Ordering::Equal => anchor_offset,
        };
        self.cache.update(line, offset);
        Some(offset)
    }

    /// Line containing `offset`, or `None` for an invalid offset. The
    /// terminator slot belongs to the last line.
    pub fn offset_to_line(&mut self, offset: usize) -> Option<usize> {
        if !self.storage.is_valid(offset) {
            return None;
        }
        let (mut line, anchor_offset) = self.cache.nearest_offset(offset);
        let mut o = anchor_offset;
        // Most recent line start discovered while walking; cached afterward.
        let mut discovered: Option<(usize, usize)> = None;
        if offset > o {
            while o < offset {
                if self.storage.char_at(o) == Some('\n') {
                    line += 1;
                    discovered = Some((line, o + 1));
                }
                o += 1;
            }
        } else {
            while o > offset {
                o -= 1;
                if self.storage.char_at(o) == Some('\n') {
                    discovered = Some((line, o + 1));
                    line -= 1;
                }
            }
        }
        if let Some((l, start)) = discovered {
            self.cache.update(l, start);
        }
        Some(line)
    }

    /// Content of `line` without its trailing newline. Out-of-range lines
    /// yield an empty string.
    pub fn line_content(&mut self, line: usize) -> String {
        let Some(start) = self.line_offset(line) else {
            return String::new();
        };
        let mut out = String::new();
        let mut o = start;
        while let Some(c) = self.storage.char_at(o) {
            if c == '\n' || c == EOF_CHAR {
                break;
            }
            out.push(c);
            o += 1;
        }
        out
    }

    /// Size of `line` in characters, counting its terminator (the newline,
    /// or the end-of-text terminator on the last line). Zero for
    /// out-of-range lines.
    pub fn line_size(&mut self, line: usize) -> usize {
        let Some(start) = self.line_offset(line) else {
            return 0;
        };
        let mut size = 0;
        let mut o = start;
        while let Some(c) = self.storage.char_at(o) {
            if c == '\n' || c == EOF_CHAR {
                break;
            }
            size += 1;
            o += 1;
        }
        size + 1
    }

    fn scan_forward_to_line(&self, target: usize, anchor_line: usize, anchor_offset: usize) -> Option<usize> {
        let limit = self.doc_length();
        let mut line = anchor_line;
        let mut o = anchor_offset;
        while line < target && o < limit {
            if self.storage.char_at(o) == Some('\n') {
                line += 1;
            }
            o += 1;
        }
        (line == target).then_some(o)
    }

    fn scan_backward_to_line(&self, target: usize, anchor_line: usize, anchor_offset: usize) -> Option<usize> {
        if target == 0 {
            return Some(0);
        }
        let mut line = anchor_line;
        let mut o = anchor_offset;
        // Walk back to the newline that terminates line `target - 1`; the
        // target line starts right after it.
        while line >= target && o > 0 {
            o -= 1;
            if self.storage.char_at(o) == Some('\n') {
                line -= 1;
            }
        }
        (line + 1 == target).then_some(o + 1)
    }

    // ==================== Mutations ====================

    /// Inserts `chars` at `offset`. Invalid arguments are absorbed as a
    /// no-op returning false; callers may be driven by stale UI events.
    ///
    /// When `undoable` is false the edit bypasses history capture (used by
    /// undo/redo replay itself).
    pub fn insert(&mut self, chars: &[char], offset: usize, timestamp: u64, undoable: bool) -> bool {
        if chars.is_empty() || !self.storage.is_valid(offset) {
            return false;
        }
        if undoable {
            self.undo.capture_insert(offset, chars.len(), timestamp, &self.storage);
        }
        self.apply_insert(offset, chars);
        true
    }

    /// Convenience wrapper over [`Self::insert`] for string slices.
    pub fn insert_str(&mut self, text: &str, offset: usize, timestamp: u64, undoable: bool) -> bool {
        let chars: Vec<char> = text.chars().collect();
        self.insert(&chars, offset, timestamp, undoable)
    }

    /// Deletes up to `count` characters at `offset`, clamped at end-of-text.
    /// Invalid arguments are absorbed as a no-op returning false.
    pub fn delete(&mut self, offset: usize, count: usize, timestamp: u64, undoable: bool) -> bool {
        if count == 0 || !self.storage.is_valid(offset) {
            return false;
        }
        let total = count.min(self.text_length().saturating_sub(offset));
        if total == 0 {
            return false;
        }
        if undoable {
            self.undo.capture_delete(offset, total, timestamp, &self.storage);
        }
        self.apply_delete(offset, total);
        true
    }

    /// Replaces `count` characters at `offset` with `text`, bracketed so the
    /// whole substitution undoes as one step. Returns false if neither half
    /// applied.
    pub fn replace(&mut self, offset: usize, count: usize, text: &str, timestamp: u64) -> bool {
        if !self.storage.is_valid(offset) {
            return false;
        }
        self.begin_batch();
        let deleted = self.delete(offset, count, timestamp, true);
        let inserted = self.insert_str(text, offset, timestamp, true);
        self.end_batch();
        deleted || inserted
    }

    /// Storage mutation + bookkeeping shared by edits and undo/redo replay.
    fn apply_insert(&mut self, offset: usize, chars: &[char]) {
        self.storage.insert(offset, chars);
        self.cache.invalidate(offset);
        self.spans.on_insert(offset, chars.len());
        self.assert_bookkeeping_consistent();
    }

    fn apply_delete(&mut self, offset: usize, count: usize) {
        self.storage.delete(offset, count);
        self.cache.invalidate(offset);
        self.spans.on_delete(offset, count);
        self.assert_bookkeeping_consistent();
    }

    // ==================== Undo / redo ====================

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn is_batch_edit(&self) -> bool {
        self.undo.is_batch_edit()
    }

    /// Opens a bracket whose edits undo/redo as one unit. Brackets nest;
    /// inner ones coalesce into the outermost.
    pub fn begin_batch(&mut self) {
        self.undo.begin_batch();
    }

    pub fn end_batch(&mut self) {
        self.undo.end_batch();
    }

    /// Reverts the most recent batch of edits. Returns the caret offset
    /// implied by the last inverse operation, or `None` if there is nothing
    /// to undo.
    pub fn undo(&mut self) -> Option<usize> {
        let batch = self.undo.undo_batch(&self.storage)?;
        let mut caret = 0;
        for cmd in &batch {
            match &cmd.kind {
                CommandKind::Insert { content } => {
                    debug_assert!(content.is_some(), "insert entry undone before sealing");
                    self.apply_delete(cmd.start, cmd.length);
                    caret = cmd.start;
                }
                CommandKind::Delete { content } => {
                    let chars: Vec<char> = content.chars().collect();
                    self.apply_insert(cmd.start, &chars);
                    caret = cmd.start + cmd.length;
                }
            }
        }
        Some(caret)
    }

    /// Re-applies the most recently undone batch. Returns the caret offset
    /// implied by the last replayed operation, or `None` if there is nothing
    /// to redo.
    pub fn redo(&mut self) -> Option<usize> {
        let batch = self.undo.redo_batch()?;
        let mut caret = 0;
        for cmd in &batch {
            match &cmd.kind {
                CommandKind::Insert { content } => {
                    debug_assert!(content.is_some(), "insert entry redone before sealing");
                    let text = content.as_deref().unwrap_or_default();
                    let chars: Vec<char> = text.chars().collect();
                    self.apply_insert(cmd.start, &chars);
                    caret = cmd.start + cmd.length;
                }
                CommandKind::Delete { .. } => {
                    self.apply_delete(cmd.start, cmd.length);
                    caret = cmd.start;
                }
            }
        }
        Some(caret)
    }

    // ==================== Spans ====================

    /// Current classification runs in order.
    pub fn spans(&self) -> &[Span] {
        self.spans.spans()
    }

    /// Applies a completed classification pass. Rejected (previous table
    /// kept) unless the run lengths sum to the current logical length.
    pub fn replace_spans(&mut self, runs: Vec<Span>) -> Result<(), SpanError> {
        self.spans.replace(runs, self.text_length())
    }

    /// Resets the table to a single unclassified run over the whole text.
    pub fn clear_spans(&mut self) {
        self.spans.reset(self.text_length());
    }

    // ==================== Validation ====================

    /// Debug assertion: the running newline count and the span-length sum
    /// must agree with ground truth recomputed from content. Sampled every
    /// 64th mutation so the O(n) recount doesn't tank tight loops; compiled
    /// out in release builds, where invariant drift degrades gracefully
    /// instead of aborting.
    #[cfg(debug_assertions)]
    fn assert_bookkeeping_consistent(&mut self) {
        self.debug_mutation_count += 1;
        if self.debug_mutation_count % 64 != 0 {
            return;
        }
        let recounted = self.storage.recount_lines();
        assert_eq!(
            self.storage.line_count(),
            recounted,
            "line count drift after {} mutations",
            self.debug_mutation_count,
        );
        assert_eq!(
            self.spans.total_length(),
            self.text_length(),
            "span sum drift after {} mutations",
            self.debug_mutation_count,
        );
    }

    #[cfg(not(debug_assertions))]
    fn assert_bookkeeping_consistent(&mut self) {}
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span_table::TagId;

    #[test]
    fn test_new_empty() {
        let mut buf = TextBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.text_length(), 0);
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_offset(0), Some(0));
        assert_eq!(buf.offset_to_line(0), Some(0));
    }

    #[test]
    fn test_from_str_line_queries() {
        let mut buf = TextBuffer::from_str("hello\nworld\nfoo");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.line_offset(0), Some(0));
        assert_eq!(buf.line_offset(1), Some(6));
        assert_eq!(buf.line_offset(2), Some(12));
        assert_eq!(buf.line_offset(3), None);
        assert_eq!(buf.line_content(1), "world");
        assert_eq!(buf.line_size(0), 6); // "hello" plus its newline
        assert_eq!(buf.line_size(2), 4); // "foo" plus the terminator
    }

    #[test]
    fn test_offset_to_line() {
        let mut buf = TextBuffer::from_str("hello\nworld\nfoo");
        assert_eq!(buf.offset_to_line(0), Some(0));
        assert_eq!(buf.offset_to_line(5), Some(0)); // the '\n' itself
        assert_eq!(buf.offset_to_line(6), Some(1));
        assert_eq!(buf.offset_to_line(11), Some(1));
        assert_eq!(buf.offset_to_line(12), Some(2));
        assert_eq!(buf.offset_to_line(15), Some(2)); // terminator slot
        assert_eq!(buf.offset_to_line(16), None);
    }

    #[test]
    fn test_line_mapping_round_trip() {
        let mut buf = TextBuffer::from_str("a\n\nbb\nccc\n");
        for line in 0..buf.line_count() {
            let start = buf.line_offset(line).unwrap();
            assert_eq!(buf.offset_to_line(start), Some(line));
        }
    }

    #[test]
    fn test_line_queries_backward_from_cached_anchor() {
        let mut buf = TextBuffer::from_str("aa\nbb\ncc\ndd");
        // Warm the cache with a late line, then resolve an earlier one.
        assert_eq!(buf.line_offset(3), Some(9));
        assert_eq!(buf.line_offset(1), Some(3));
        assert_eq!(buf.offset_to_line(4), Some(1));
    }

    #[test]
    fn test_insert_mid_line_keeps_line_count() {
        // Scenario: "ab\ncd" + "X" at offset 1.
        let mut buf = TextBuffer::from_str("ab\ncd");
        assert!(buf.insert_str("X", 1, 0, true));
        assert_eq!(buf.content(), "aXb\ncd");
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.offset_to_line(0), Some(0));
        assert_eq!(buf.offset_to_line(5), Some(1));
    }

    #[test]
    fn test_delete_before_newline_keeps_line_count() {
        // Scenario: "ab\ncd" minus two chars at offset 0.
        let mut buf = TextBuffer::from_str("ab\ncd");
        assert!(buf.delete(0, 2, 0, true));
        assert_eq!(buf.content(), "\ncd");
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.line_offset(1), Some(1));
    }

    #[test]
    fn test_invalid_edits_are_noops() {
        let mut buf = TextBuffer::from_str("abc");
        assert!(!buf.insert_str("x", 4, 0, true));
        assert!(!buf.insert(&[], 0, 0, true));
        assert!(!buf.delete(4, 1, 0, true));
        assert!(!buf.delete(0, 0, 0, true));
        assert!(!buf.delete(3, 5, 0, true)); // terminator slot
        assert_eq!(buf.content(), "abc");
        assert!(!buf.can_undo());
    }

    #[test]
    fn test_append_at_end_of_text() {
        let mut buf = TextBuffer::from_str("ab");
        assert!(buf.insert_str("c\n", 2, 0, true));
        assert_eq!(buf.content(), "abc\n");
        assert_eq!(buf.line_count(), 2);
    }

    #[test]
    fn test_undo_insert_returns_caret_at_start() {
        let mut buf = TextBuffer::from_str("hello");
        buf.insert_str(" world", 5, 0, true);
        assert_eq!(buf.undo(), Some(5));
        assert_eq!(buf.content(), "hello");
        assert_eq!(buf.line_count(), 1);
    }

    #[test]
    fn test_undo_delete_restores_content_exactly() {
        let mut buf = TextBuffer::from_str("one\ntwo\nthree");
        buf.delete(2, 6, 0, true);
        assert_eq!(buf.content(), "onthree");
        assert_eq!(buf.undo(), Some(8));
        assert_eq!(buf.content(), "one\ntwo\nthree");
        assert_eq!(buf.line_count(), 3);
    }

    #[test]
    fn test_undo_empty_returns_none() {
        let mut buf = TextBuffer::from_str("abc");
        assert_eq!(buf.undo(), None);
        assert_eq!(buf.redo(), None);
    }

    #[test]
    fn test_redo_after_undo() {
        let mut buf = TextBuffer::from_str("abc");
        buf.insert_str("xy", 1, 0, true);
        buf.undo();
        assert_eq!(buf.redo(), Some(3));
        assert_eq!(buf.content(), "axybc");
        assert_eq!(buf.redo(), None);
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut buf = TextBuffer::from_str("abc");
        buf.insert_str("x", 0, 0, true);
        buf.undo();
        assert!(buf.can_redo());
        buf.insert_str("y", 1, u64::MAX / 2, true);
        assert!(!buf.can_redo());
        assert_eq!(buf.redo(), None);
    }

    #[test]
    fn test_batch_undoes_as_single_step() {
        // Scenario: bracketed delete-then-insert reverts in one undo.
        let mut buf = TextBuffer::from_str("hello world");
        buf.begin_batch();
        buf.delete(0, 3, 0, true);
        buf.insert_str("HELLO", 0, u64::MAX / 2, true);
        buf.end_batch();
        assert_eq!(buf.content(), "HELLOlo world");

        assert!(buf.undo().is_some());
        assert_eq!(buf.content(), "hello world");
        assert!(!buf.can_undo());

        assert!(buf.redo().is_some());
        assert_eq!(buf.content(), "HELLOlo world");
    }

    #[test]
    fn test_replace_undoes_as_one_step() {
        let mut buf = TextBuffer::from_str("hello world");
        assert!(buf.replace(6, 5, "there", 0));
        assert_eq!(buf.content(), "hello there");
        assert!(buf.undo().is_some());
        assert_eq!(buf.content(), "hello world");
        assert!(!buf.can_undo());
    }

    #[test]
    fn test_replace_degenerate_halves() {
        let mut buf = TextBuffer::from_str("abc");
        // Nothing to delete: acts as an insert.
        assert!(buf.replace(1, 0, "x", 0));
        assert_eq!(buf.content(), "axbc");
        // Nothing to insert: acts as a delete.
        assert!(buf.replace(0, 2, "", u64::MAX / 2));
        assert_eq!(buf.content(), "bc");
        assert!(!buf.replace(5, 1, "y", 0));
    }

    #[test]
    fn test_undo_replay_is_not_recaptured() {
        let mut buf = TextBuffer::from_str("abc");
        buf.insert_str("x", 0, 0, true);
        buf.undo();
        // The replayed delete must not have produced a new undo entry.
        assert!(!buf.can_undo());
    }

    #[test]
    fn test_spans_follow_edits() {
        let mut buf = TextBuffer::from_str("hello world");
        buf.replace_spans(vec![Span::new(5, TagId(1)), Span::new(6, TagId(0))])
            .unwrap();
        buf.insert_str("!!", 2, 0, true);
        assert_eq!(buf.spans(), &[Span::new(7, TagId(1)), Span::new(6, TagId(0))]);
        buf.delete(0, 9, u64::MAX / 2, true);
        assert_eq!(buf.spans(), &[Span::new(4, TagId(0))]);
        assert_eq!(buf.spans().iter().map(|s| s.length).sum::<usize>(), buf.text_length());
    }

    #[test]
    fn test_replace_spans_rejects_stale_table() {
        let mut buf = TextBuffer::from_str("hello");
        let stale = vec![Span::new(3, TagId(1))];
        assert!(buf.replace_spans(stale).is_err());
        assert_eq!(buf.spans(), &[Span::new(5, TagId(0))]);
    }

    #[test]
    fn test_set_content_resets_everything() {
        let mut buf = TextBuffer::from_str("hello");
        buf.insert_str("x", 0, 0, true);
        buf.set_content("a\nb", None);
        assert_eq!(buf.content(), "a\nb");
        assert_eq!(buf.line_count(), 2);
        assert!(!buf.can_undo());
        assert_eq!(buf.spans(), &[Span::new(3, TagId::NORMAL)]);
    }

    #[test]
    fn test_undo_many_random_edits_restores_original() {
        let original = "fn main() {\n    println!(\"hi\");\n}\n";
        let mut buf = TextBuffer::from_str(original);
        let edits: [(usize, bool); 8] = [
            (0, true),
            (10, false),
            (5, true),
            (20, false),
            (1, true),
            (0, false),
            (30, true),
            (7, false),
        ];
        for (i, (offset, is_insert)) in edits.iter().enumerate() {
            // Spread timestamps so nothing merges.
            let ts = (i as u64 + 1) * 10_000_000_000;
            if *is_insert {
                buf.insert_str("XY", *offset, ts, true);
            } else {
                buf.delete(*offset, 3, ts, true);
            }
        }
        while buf.undo().is_some() {}
        assert_eq!(buf.content(), original);
        assert_eq!(buf.line_count(), 3 + 1);
    }
}
