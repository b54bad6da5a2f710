//! Bounded cache of (line, start offset) pairs.
//!
//! Line/offset conversions over the gap buffer scan from the nearest known
//! anchor instead of the start of the buffer. This cache remembers the last
//! few validated anchors in LRU order. It is a per-buffer structure; two
//! buffers never share cached positions.
//!
//! Slot 0 permanently holds `(0, 0)`: line 0 starts at offset 0, which is
//! true even for an empty buffer. It survives invalidation and eviction, so
//! every lookup has at least one anchor to start from.

const CACHE_SIZE: usize = 4;

/// LRU cache of validated (line, start-of-line offset) pairs.
#[derive(Debug)]
pub struct LineOffsetCache {
    entries: [Option<(usize, usize)>; CACHE_SIZE],
}

impl LineOffsetCache {
    pub fn new() -> Self {
        let mut entries = [None; CACHE_SIZE];
        entries[0] = Some((0, 0));
        Self { entries }
    }

    /// Returns the cached entry nearest to `line` by absolute distance and
    /// promotes it to the LRU head.
    pub fn nearest_line(&mut self, line: usize) -> (usize, usize) {
        self.nearest_by(|(l, _)| l.abs_diff(line))
    }

    /// Returns the cached entry nearest to `offset` by absolute distance and
    /// promotes it to the LRU head.
    pub fn nearest_offset(&mut self, offset: usize) -> (usize, usize) {
        self.nearest_by(|(_, o)| o.abs_diff(offset))
    }

    fn nearest_by<F: Fn((usize, usize)) -> usize>(&mut self, distance: F) -> (usize, usize) {
        let mut best = 0;
        let mut best_distance = usize::MAX;
        for (i, entry) in self.entries.iter().enumerate() {
            if let Some(pair) = entry {
                let d = distance(*pair);
                if d < best_distance {
                    best_distance = d;
                    best = i;
                }
            }
        }
        self.promote(best);
        // Slot 0 is always occupied, so a nearest entry always exists.
        self.entries[if best == 0 { 0 } else { 1 }].unwrap_or((0, 0))
    }

    /// Moves `index` to the LRU head (slot 1; slot 0 is pinned).
    fn promote(&mut self, index: usize) {
        if index == 0 {
            return;
        }
        let entry = self.entries[index];
        for i in (2..=index).rev() {
            self.entries[i] = self.entries[i - 1];
        }
        self.entries[1] = entry;
    }

    /// Records a validated pair, replacing an existing entry for the same
    /// line or evicting the least recently used one. The pinned `(0, 0)`
    /// entry already covers line 0.
    pub fn update(&mut self, line: usize, offset: usize) {
        if line == 0 {
            return;
        }
        for entry in self.entries.iter_mut().skip(1) {
            if let Some((l, o)) = entry {
                if *l == line {
                    *o = offset;
                    return;
                }
            }
        }
        self.promote(CACHE_SIZE - 1);
        self.entries[1] = Some((line, offset));
    }

    /// Drops every cached pair whose recorded offset is at or after
    /// `from_offset`. Entries strictly before an edit point remain valid.
    pub fn invalidate(&mut self, from_offset: usize) {
        for entry in self.entries.iter_mut().skip(1) {
            if matches!(entry, Some((_, o)) if *o >= from_offset) {
                *entry = None;
            }
        }
    }
}

impl Default for LineOffsetCache {
    fn default() -> Self {
        Self::new()
    }
}
