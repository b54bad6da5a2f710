//! Error types.
//!
//! Boundary problems on the public edit and query entry points are absorbed
//! as no-ops or `Option` sentinels, because callers may be driven by stale
//! asynchronous UI events racing content changes. The only operation that
//! reports failure by value is span table replacement, where the caller (the
//! classification worker) must learn that its result went stale.

use thiserror::Error;

/// Rejection reasons for an externally supplied span table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpanError {
    /// The supplied run lengths do not sum to the buffer's logical length;
    /// content changed while the classification pass was running.
    #[error("span table covers {actual} chars but buffer holds {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}
