//! Text storage engine for an editor: a gap buffer with incremental line
//! indexing, run-length classification spans, and undo/redo.
//!
//! [`TextBuffer`] is the composition root. [`DocumentAccessor`] wraps one in
//! `Arc<Mutex>` for sharing with background workers. All offsets and lengths
//! are in characters; lines and offsets are zero-based.

mod accessor;
mod error;
mod gap_buffer;
mod line_cache;
mod span_table;
mod text_buffer;
mod undo_stack;

pub use accessor::DocumentAccessor;
pub use error::SpanError;
pub use gap_buffer::{EOF_CHAR, NULL_CHAR};
pub use span_table::{Span, TagId};
pub use text_buffer::TextBuffer;
