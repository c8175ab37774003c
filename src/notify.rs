//! User-visible notices and session events.
//!
//! Inject an [`Arc<dyn SessionNotifier>`] via
//! [`crate::config::CaptureConfigBuilder::notifier`] to receive the notices a
//! person at the capture station should see (a blocking alert in a browser,
//! a coloured line in a terminal) plus a few lifecycle events.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doccapture::{CaptureConfig, SessionNotifier};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<String>>);
//!
//! impl SessionNotifier for Collect {
//!     fn alert(&self, message: &str) {
//!         self.0.lock().unwrap().push(message.to_string());
//!     }
//! }
//!
//! let config = CaptureConfig::builder()
//!     .notifier(Arc::new(Collect::default()) as Arc<dyn SessionNotifier>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Receives notices and events from a [`crate::CaptureSession`].
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait SessionNotifier: Send + Sync {
    /// A message the user must see: validation failures, upload results.
    fn alert(&self, message: &str) {
        let _ = message;
    }

    /// The active document type changed; `None` means deselected.
    fn on_selection_changed(&self, label: Option<&str>) {
        let _ = label;
    }

    /// A frame was stored under `label`.
    fn on_capture(&self, label: &str, width: u32, height: u32) {
        let _ = (label, width, height);
    }

    /// The PDF was assembled.
    fn on_pdf_rendered(&self, file_name: &str, size_bytes: usize) {
        let _ = (file_name, size_bytes);
    }

    /// The PDF was stored remotely.
    fn on_upload_complete(&self, file_name: &str, file_id: &str) {
        let _ = (file_name, file_id);
    }
}

/// A no-op implementation; the default when no notifier is configured.
pub struct NoopNotifier;

impl SessionNotifier for NoopNotifier {}

/// Alias matching the type stored in [`crate::config::CaptureConfig`].
pub type Notifier = Arc<dyn SessionNotifier>;
