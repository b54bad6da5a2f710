//! Off-thread classification passes.
//!
//! One worker serves one document. Each spawn supersedes the previous pass:
//! the old one is cancelled and joined before the new thread starts, so at
//! most one pass runs at a time. Finished tables travel over a channel and
//! are applied on the caller's thread by [`ClassifyWorker::apply_results`];
//! the buffer itself rejects tables that went stale against newer edits.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use quill_buffer::{DocumentAccessor, Span};
use tracing::{debug, warn};

use crate::{CancelFlag, Tokenizer};

/// Runs [`Tokenizer`] passes on a background thread.
#[derive(Debug)]
pub struct ClassifyWorker {
    tx: Sender<Vec<Span>>,
    rx: Receiver<Vec<Span>>,
    cancel: CancelFlag,
    handle: Option<JoinHandle<()>>,
}

impl ClassifyWorker {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            cancel: CancelFlag::new(),
            handle: None,
        }
    }

    /// True while a pass is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts a pass over `doc`, cancelling any in-flight one first. The
    /// tokenizer iterates its own cloned view of the document.
    pub fn spawn<T: Tokenizer>(&mut self, tokenizer: T, doc: &DocumentAccessor) {
        self.cancel_in_flight();
        self.cancel.clear();

        let mut view = doc.clone();
        let cancel = self.cancel.clone();
        let tx = self.tx.clone();
        self.handle = Some(thread::spawn(move || {
            match tokenizer.classify(&mut view, &cancel) {
                Some(spans) => {
                    // Send fails only when the worker was dropped; the pass
                    // result is moot then.
                    let _ = tx.send(spans);
                }
                None => debug!("classification pass cancelled"),
            }
        }));
    }

    /// Signals the in-flight pass to stop and waits for it to exit.
    pub fn cancel_in_flight(&mut self) {
        self.cancel.set();
        self.join();
    }

    /// Waits for the in-flight pass to finish on its own.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            // A panicking tokenizer loses its pass; the document keeps its
            // current table.
            if handle.join().is_err() {
                warn!("classification pass panicked");
            }
        }
    }

    /// Drains finished tables into `doc`, newest last. Returns how many were
    /// accepted; tables stale against newer edits are rejected by the buffer
    /// and dropped here.
    pub fn apply_results(&self, doc: &DocumentAccessor) -> usize {
        let mut applied = 0;
        while let Ok(spans) = self.rx.try_recv() {
            match doc.replace_spans(spans) {
                Ok(()) => applied += 1,
                Err(e) => warn!(error = %e, "dropped stale classification result"),
            }
        }
        applied
    }
}

impl Default for ClassifyWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ClassifyWorker {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}
