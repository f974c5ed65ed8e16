//! Progress-callback trait for per-page extraction events.
//!
//! Attach an [`Arc<dyn ExtractionProgressCallback>`] with
//! [`crate::orchestrator::PipelineOrchestrator::with_progress`] to receive
//! events as the pipeline works through a document. The callback is a side
//! channel: nothing it does affects the results of the run.
//!
//! # Example
//!
//! ```rust
//! use pdf_data_extractor::ExtractionProgressCallback;
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     signals: Mutex<Vec<(usize, usize)>>,
//! }
//!
//! impl ExtractionProgressCallback for Recorder {
//!     fn on_progress(&self, pages_done: usize, pages_total: usize) {
//!         self.signals.lock().unwrap().push((pages_done, pages_total));
//!     }
//! }
//!
//! let recorder = Arc::new(Recorder::default());
//! recorder.on_progress(1, 3);
//! assert_eq!(*recorder.signals.lock().unwrap(), vec![(1, 3)]);
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Pages are processed one at a time, so calls never
/// overlap within a run, but implementations must still be `Send + Sync`
/// because the run may hop between runtime threads.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after rendering, before the first extraction call.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the extraction request is sent for a page.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called as soon as a page was extracted successfully, with the
    /// cleaned response that will become that page's row.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, content: &str) {
        let _ = (page_num, total_pages, content);
    }

    /// Called when a page failed. `error` is human-readable.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: String) {
        let _ = (page_num, total_pages, error);
    }

    /// Progress signal, emitted once after every attempted page.
    fn on_progress(&self, pages_done: usize, pages_total: usize) {
        let _ = (pages_done, pages_total);
    }

    /// Called once after every page has a result.
    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias for the type stored by the orchestrator.
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        last_done: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _content: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: String) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_progress(&self, pages_done: usize, _pages_total: usize) {
            self.last_done.store(pages_done, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, "Total: 42");
        cb.on_page_error(2, 5, "some error".to_string());
        cb.on_progress(2, 5);
        cb.on_run_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, "Invoice 1001");
        tracker.on_progress(1, 2);
        tracker.on_page_start(2, 2);
        tracker.on_page_error(2, 2, "quota exceeded".to_string());
        tracker.on_progress(2, 2);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.last_done.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn callback_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoopProgressCallback>();
        let _cb: ProgressCallback = Arc::new(NoopProgressCallback);
    }
}
