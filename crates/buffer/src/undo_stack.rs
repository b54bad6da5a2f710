//! Undo/redo log of invertible primitive edits.
//!
//! The stack is tightly coupled to the gap buffer on purpose: the buffer
//! calls `capture_insert`/`capture_delete` at the moment of mutation, and
//! delete capture snapshots the characters about to disappear while they can
//! still be read. Insert capture is lazy: the inserted text stays in the
//! buffer, so it is only copied out when the entry stops being the newest
//! edit or is first undone.
//!
//! Consecutive edits merge into one entry when they are the same kind,
//! positionally contiguous, and fall within [`MERGE_TIME`] of each other, so
//! a burst of typing undoes as a unit without an explicit batch.
//!
//! Undo/redo never remove entries; they only move the `top` pointer.
//! Entries past `top` form the redo region and are trimmed when a new edit
//! is captured.

use crate::gap_buffer::GapBuffer;

/// Maximum gap between two edits that may merge, in nanoseconds.
const MERGE_TIME: u64 = 1_000_000_000;

#[derive(Debug, Clone)]
pub(crate) enum CommandKind {
    /// `length` characters were inserted at `start`. `content` is filled in
    /// lazily; `None` means the text is still readable from the buffer.
    Insert { content: Option<String> },
    /// `content` was removed from `start`.
    Delete { content: String },
}

/// One invertible primitive edit.
#[derive(Debug, Clone)]
pub(crate) struct Command {
    pub(crate) start: usize,
    pub(crate) length: usize,
    /// Entries sharing a group undo/redo as one unit.
    pub(crate) group: u32,
    pub(crate) kind: CommandKind,
}

#[derive(Debug)]
pub(crate) struct UndoStack {
    stack: Vec<Command>,
    /// Where the next entry goes; entries past it are the redo region.
    top: usize,
    group_id: u32,
    /// Nesting depth of begin/end batch brackets; edits coalesce into the
    /// outermost bracket.
    batch_depth: u32,
    last_edit_time: Option<u64>,
}

impl UndoStack {
    pub(crate) fn new() -> Self {
        Self {
            stack: Vec::new(),
            top: 0,
            group_id: 0,
            batch_depth: 0,
            last_edit_time: None,
        }
    }

    pub(crate) fn can_undo(&self) -> bool {
        self.top > 0
    }

    pub(crate) fn can_redo(&self) -> bool {
        self.top < self.stack.len()
    }

    pub(crate) fn is_batch_edit(&self) -> bool {
        self.batch_depth > 0
    }

    pub(crate) fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    pub(crate) fn end_batch(&mut self) {
        if self.batch_depth > 0 {
            self.batch_depth -= 1;
            if self.batch_depth == 0 {
                self.group_id += 1;
            }
        }
    }

    fn within_merge_window(&self, time: u64) -> bool {
        self.last_edit_time
            .is_some_and(|last| time.saturating_sub(last) < MERGE_TIME)
    }

    /// Copies the newest insert entry's text out of the buffer. Must run
    /// before any mutation that could disturb `[start, start + length)`.
    fn seal_top(&mut self, storage: &GapBuffer) {
        if self.top == 0 {
            return;
        }
        let cmd = &mut self.stack[self.top - 1];
        if let CommandKind::Insert { content: content @ None } = &mut cmd.kind {
            *content = Some(storage.sub_sequence(cmd.start, cmd.length));
        }
    }

    fn push(&mut self, start: usize, length: usize, kind: CommandKind) {
        self.stack.truncate(self.top);
        self.stack.push(Command {
            start,
            length,
            group: self.group_id,
            kind,
        });
        self.top += 1;
        if self.batch_depth == 0 {
            self.group_id += 1;
        }
    }

    /// Records an insert of `length` characters at `start`. Called before
    /// the actual insertion.
    pub(crate) fn capture_insert(&mut self, start: usize, length: usize, time: u64, storage: &GapBuffer) {
        let mut merged = false;
        if self.top > 0 && self.within_merge_window(time) {
            let cmd = &mut self.stack[self.top - 1];
            // Only an unsealed entry can grow; a sealed snapshot would go
            // stale.
            if matches!(cmd.kind, CommandKind::Insert { content: None })
                && start == cmd.start + cmd.length
            {
                cmd.length += length;
                merged = true;
            }
        }
        if merged {
            self.stack.truncate(self.top);
        } else {
            self.seal_top(storage);
            self.push(start, length, CommandKind::Insert { content: None });
        }
        self.last_edit_time = Some(time);
    }

    /// Records a delete of `length` characters at `start`, snapshotting the
    /// doomed text. Called before the actual deletion.
    pub(crate) fn capture_delete(&mut self, start: usize, length: usize, time: u64, storage: &GapBuffer) {
        let content = storage.sub_sequence(start, length);
        let mut merged = false;
        if self.top > 0 && self.within_merge_window(time) {
            let cmd = &mut self.stack[self.top - 1];
            // Backspace run: the new deletion ends where the previous one
            // began.
            if let CommandKind::Delete { content: existing } = &mut cmd.kind {
                if start + length == cmd.start {
                    cmd.start = start;
                    cmd.length += length;
                    existing.insert_str(0, &content);
                    merged = true;
                }
            }
        }
        if merged {
            self.stack.truncate(self.top);
        } else {
            self.seal_top(storage);
            self.push(start, length, CommandKind::Delete { content });
        }
        self.last_edit_time = Some(time);
    }

    /// Retires the newest batch from the undo region, newest entry first.
    /// Returns `None` if there is nothing to undo.
    pub(crate) fn undo_batch(&mut self, storage: &GapBuffer) -> Option<Vec<Command>> {
        if !self.can_undo() {
            return None;
        }
        self.seal_top(storage);
        let group = self.stack[self.top - 1].group;
        let mut batch = Vec::new();
        while self.top > 0 && self.stack[self.top - 1].group == group {
            self.top -= 1;
            batch.push(self.stack[self.top].clone());
        }
        Some(batch)
    }

    /// Re-admits the oldest undone batch, original order. Returns `None` if
    /// there is nothing to redo.
    pub(crate) fn redo_batch(&mut self) -> Option<Vec<Command>> {
        if !self.can_redo() {
            return None;
        }
        let group = self.stack[self.top].group;
        let mut batch = Vec::new();
        while self.top < self.stack.len() && self.stack[self.top].group == group {
            batch.push(self.stack[self.top].clone());
            self.top += 1;
        }
        Some(batch)
    }
}
