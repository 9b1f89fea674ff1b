//! Progress-reporting trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn ProgressReporter>`] into [`crate::run::run`] to
//! receive `(message, percent)` events as the orchestrator moves through its
//! stages.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a terminal progress bar, a web socket, or a log sink
//! without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` so the same reporter can be
//! shared with blocking worker tasks.
//!
//! # Monotonicity
//!
//! The orchestrator wraps whatever reporter it is given in a
//! [`ProgressGuard`], which clamps percentages so they never decrease within
//! one run. Reporter implementations can therefore assume `percent` is
//! non-decreasing and in `0..=100` — that invariant is enforced by the
//! library, not left to caller discipline.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Called by the orchestrator on each stage transition.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    ///
    /// # Arguments
    /// * `message` — human-readable description of what is happening
    /// * `percent` — overall run completion, `0..=100`, non-decreasing
    fn report(&self, message: &str, percent: u8);
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no reporter is configured.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _message: &str, _percent: u8) {}
}

/// Adapter: use a plain closure as a [`ProgressReporter`].
///
/// ```rust
/// use pdf2qa::progress::{FnProgress, ProgressReporter};
///
/// let reporter = FnProgress::new(|msg, pct| eprintln!("[{pct:>3}%] {msg}"));
/// reporter.report("Running OCR and PDF ingestion", 20);
/// ```
pub struct FnProgress<F: Fn(&str, u8) + Send + Sync>(F);

impl<F: Fn(&str, u8) + Send + Sync> FnProgress<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F: Fn(&str, u8) + Send + Sync> ProgressReporter for FnProgress<F> {
    fn report(&self, message: &str, percent: u8) {
        (self.0)(message, percent)
    }
}

/// Convenience alias matching the type accepted by [`crate::run::run`].
pub type Progress = Arc<dyn ProgressReporter>;

/// Wrapper enforcing the non-decreasing-percent invariant.
///
/// Owned by the orchestrator; one guard per run. A stage that tries to
/// report a percentage lower than what was already reported is clamped up to
/// the high-water mark rather than rejected — the message still matters even
/// when a stage mis-estimates its position.
pub struct ProgressGuard {
    inner: Progress,
    high_water: AtomicU8,
}

impl ProgressGuard {
    pub fn new(inner: Progress) -> Self {
        Self {
            inner,
            high_water: AtomicU8::new(0),
        }
    }

    /// Forward an event, clamping `percent` to `0..=100` and to the run's
    /// high-water mark.
    pub fn report(&self, message: &str, percent: u8) {
        let pct = percent.min(100);
        let clamped = self.high_water.fetch_max(pct, Ordering::SeqCst).max(pct);
        self.inner.report(message, clamped);
    }
}
