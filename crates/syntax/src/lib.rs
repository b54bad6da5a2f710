//! Background classification for [`quill_buffer`] documents.
//!
//! A [`Tokenizer`] walks a shared [`DocumentAccessor`] and produces the
//! run-length span table for the whole document. [`ClassifyWorker`] runs it
//! off-thread, cancels superseded passes, and ferries finished tables back
//! for application on the caller's thread.

mod worker;

pub use worker::ClassifyWorker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use quill_buffer::{DocumentAccessor, Span};

/// Cooperative cancellation handle shared with an in-flight pass.
///
/// Tokenizers are expected to poll [`CancelFlag::is_set`] regularly and bail
/// out promptly; the flag is the only way to stop a pass over a large
/// document.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Produces classification runs for an entire document.
///
/// The result is all-or-nothing: `None` means the pass was cancelled and the
/// document's current table must stay in place. A returned table's lengths
/// must sum to the document's logical length at application time or it will
/// be rejected there.
pub trait Tokenizer: Send + 'static {
    fn classify(&self, doc: &mut DocumentAccessor, cancel: &CancelFlag) -> Option<Vec<Span>>;
}
