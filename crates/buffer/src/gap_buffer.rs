//! Gap buffer implementation for efficient text editing.
//!
//! A gap buffer is a character array with a movable gap. Insertions and
//! deletions at the gap are O(1); moving the gap is O(distance) but amortizes
//! well for typical editing patterns (locality of edits). The buffer also
//! keeps a running newline count so `line_count()` never rescans content.
//!
//! The last valid character of the array is always a terminator ([`EOF_CHAR`])
//! placed one past the last logical character. Ordinary edits can neither
//! delete it nor insert after it; its slot is addressable so that appending
//! at end-of-text is an ordinary insert.

use tracing::debug;

const MIN_GAP_SIZE: usize = 64;

/// Terminator character stored one past the last logical character.
pub const EOF_CHAR: char = '\u{ffff}';

/// Sentinel returned for out-of-range character reads.
pub const NULL_CHAR: char = '\0';

/// A gap buffer for text storage with logical/physical offset translation.
///
/// A *logical offset* addresses the virtual gap-free character sequence; a
/// *physical index* addresses the real array including the gap. The
/// translation is a bijection over valid offsets.
#[derive(Debug)]
pub struct GapBuffer {
    /// The underlying storage: [pre-gap content | gap | post-gap content].
    /// The last valid character is always `EOF_CHAR`.
    data: Vec<char>,
    /// Index where the gap starts (first unused position).
    gap_start: usize,
    /// Index where the gap ends (first used position after gap).
    gap_end: usize,
    /// Running count of newline characters in valid content, plus one.
    line_count: usize,
    /// Growth multiplier; doubles on every reallocation so amortized
    /// per-character insert cost stays O(1).
    alloc_multiplier: usize,
}

impl GapBuffer {
    /// Creates a new empty gap buffer (one line, zero logical characters).
    pub fn new() -> Self {
        let mut data = vec![NULL_CHAR; MIN_GAP_SIZE + 1];
        data[MIN_GAP_SIZE] = EOF_CHAR;
        Self {
            data,
            gap_start: 0,
            gap_end: MIN_GAP_SIZE,
            line_count: 1,
            alloc_multiplier: 1,
        }
    }

    /// Creates a gap buffer initialized with the given text.
    pub fn from_str(text: &str) -> Self {
        let mut buf = Self::new();
        buf.set_content(text, None);
        buf
    }

    /// Replaces the entire contents with `text`.
    ///
    /// `known_line_count` lets a loader that already counted terminators skip
    /// the rescan; when `None` the newlines are counted here.
    pub fn set_content(&mut self, text: &str, known_line_count: Option<usize>) {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();

        let mut data = Vec::with_capacity(len + MIN_GAP_SIZE + 1);
        data.extend(chars);
        data.resize(len + MIN_GAP_SIZE, NULL_CHAR);
        data.push(EOF_CHAR);

        self.line_count = known_line_count
            .unwrap_or_else(|| text.chars().filter(|&c| c == '\n').count() + 1);
        self.data = data;
        self.gap_start = len;
        self.gap_end = len + MIN_GAP_SIZE;
        self.alloc_multiplier = 1;
        debug!(text_length = len, lines = self.line_count, "buffer content reset");
    }

    /// Returns the logical length in characters, terminator excluded.
    pub fn text_length(&self) -> usize {
        self.data.len() - self.gap_len() - 1
    }

    /// Returns the number of lines (newline count + 1, at least 1).
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Returns true if the buffer holds no logical characters.
    pub fn is_empty(&self) -> bool {
        self.text_length() == 0
    }

    /// Returns the physical array size. Grows over time; observable by tests
    /// that exercise gap reallocation.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns true if `offset` addresses a logical character or the
    /// terminator slot. The terminator slot is valid so inserts may append
    /// at end-of-text.
    pub fn is_valid(&self, offset: usize) -> bool {
        offset <= self.text_length()
    }

    fn gap_len(&self) -> usize {
        self.gap_end - self.gap_start
    }

    /// Translates a logical offset to a physical array index.
    fn logical_to_physical(&self, offset: usize) -> usize {
        if offset < self.gap_start {
            offset
        } else {
            offset + self.gap_len()
        }
    }

    /// Returns the character at the given logical offset.
    ///
    /// A pure read; never moves the gap. The terminator slot reads back as
    /// [`EOF_CHAR`].
    pub fn char_at(&self, offset: usize) -> Option<char> {
        if !self.is_valid(offset) {
            return None;
        }
        Some(self.data[self.logical_to_physical(offset)])
    }

    /// Returns up to `count` characters starting at `offset` as a String,
    /// clamped at end-of-text. Invalid arguments yield an empty string.
    ///
    /// A pure read; never moves the gap.
    pub fn sub_sequence(&self, offset: usize, count: usize) -> String {
        if !self.is_valid(offset) || count == 0 {
            return String::new();
        }
        let total = count.min(self.text_length() - offset.min(self.text_length()));
        let mut out = String::with_capacity(total);
        let mut physical = self.logical_to_physical(offset);
        for _ in 0..total {
            out.push(self.data[physical]);
            physical += 1;
            if physical == self.gap_start {
                physical = self.gap_end;
            }
        }
        out
    }

    /// Returns an iterator over the logical characters, terminator excluded.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.data[..self.gap_start]
            .iter()
            .chain(self.data[self.gap_end..self.data.len() - 1].iter())
            .copied()
            .filter(|&c| c != EOF_CHAR)
    }

    /// Moves the gap to the given logical offset, O(distance moved).
    ///
    /// Cheap for sequential typing at one cursor, expensive for distant
    /// random edits. That trade-off is intentional.
    fn move_gap_to(&mut self, offset: usize) {
        debug_assert!(self.gap_start <= self.gap_end && self.gap_end <= self.data.len());
        if offset < self.gap_start {
            let shift = self.gap_start - offset;
            self.data.copy_within(offset..self.gap_start, self.gap_end - shift);
            self.gap_start = offset;
            self.gap_end -= shift;
        } else if offset > self.gap_start {
            let shift = offset - self.gap_start;
            self.data
                .copy_within(self.gap_end..self.gap_end + shift, self.gap_start);
            self.gap_start += shift;
            self.gap_end += shift;
        }
    }

    /// Grows the array so the gap can hold at least `min_size` characters.
    /// Preserves the gap position; only the post-gap content shifts right.
    fn ensure_gap(&mut self, min_size: usize) {
        if self.gap_len() >= min_size {
            return;
        }
        let needed = min_size - self.gap_len();
        let growth = needed + MIN_GAP_SIZE * self.alloc_multiplier;

        let old_len = self.data.len();
        let old_gap_end = self.gap_end;
        self.data.resize(old_len + growth, NULL_CHAR);
        // Shift the post-gap content (terminator included) to the new end.
        self.data
            .copy_within(old_gap_end..old_len, old_gap_end + growth);
        self.gap_end += growth;
        self.alloc_multiplier <<= 1;
        debug!(
            capacity = self.data.len(),
            multiplier = self.alloc_multiplier,
            "gap buffer grown"
        );
    }

    /// Inserts `chars` at `offset`, shifting later characters right.
    ///
    /// Returns false (no-op) if the offset is invalid or `chars` is empty.
    /// Callers may race stale UI events, so bad arguments are absorbed
    /// rather than signalled.
    pub fn insert(&mut self, offset: usize, chars: &[char]) -> bool {
        if !self.is_valid(offset) || chars.is_empty() {
            return false;
        }
        self.move_gap_to(offset);
        self.ensure_gap(chars.len());
        for &c in chars {
            if c == '\n' {
                self.line_count += 1;
            }
            self.data[self.gap_start] = c;
            self.gap_start += 1;
        }
        true
    }

    /// Deletes `count` characters starting at `offset` by collapsing the
    /// range into the gap. The count is clamped at end-of-text; the
    /// terminator is never deletable.
    ///
    /// Returns false (no-op) if the offset is invalid or nothing remains to
    /// delete after clamping.
    pub fn delete(&mut self, offset: usize, count: usize) -> bool {
        if !self.is_valid(offset) || count == 0 {
            return false;
        }
        let total = count.min(self.text_length() - offset.min(self.text_length()));
        if total == 0 {
            return false;
        }
        self.move_gap_to(offset + total);
        for _ in 0..total {
            self.gap_start -= 1;
            if self.data[self.gap_start] == '\n' {
                self.line_count -= 1;
            }
        }
        true
    }

    /// Recounts newlines from content. Debug validation only; the running
    /// count must always agree with this.
    #[cfg(any(debug_assertions, test))]
    pub fn recount_lines(&self) -> usize {
        self.chars().filter(|&c| c == '\n').count() + 1
    }
}

impl Default for GapBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GapBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for ch in self.chars() {
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}
