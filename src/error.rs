//! Error types for the edgequake-doccapture library.
//!
//! Every failure is one [`CaptureError`]. Variants are grouped by where the
//! failure happens, and [`CaptureError::category`] exposes that grouping:
//!
//! * **Device**: the camera is missing, denied, or has no live feed.
//! * **Validation**: the user has not finished their part yet (no document
//!   type selected, ID number too short, a required photo missing).
//! * **Collaborator**: the PDF renderer, cloud storage, OAuth token source or
//!   offline cache failed.
//!
//! None of these is fatal to a [`crate::CaptureSession`]: the session stays
//! usable and the user can retry from scratch.

use std::path::PathBuf;
use thiserror::Error;

/// Broad grouping of a [`CaptureError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Camera unavailable, permission denied, no live feed.
    Device,
    /// Incomplete input: missing selection, short ID number, missing photo.
    Validation,
    /// A PDF, storage, auth or cache call failed.
    Collaborator,
    /// Configuration or internal failure.
    Internal,
}

/// All errors returned by the edgequake-doccapture library.
#[derive(Debug, Error)]
pub enum CaptureError {
    // ── Device errors ─────────────────────────────────────────────────────
    /// The camera could not be opened.
    #[error("Cannot access camera. Please allow camera permissions.\n{reason}")]
    CameraUnavailable { reason: String },

    /// The camera source exists but reading it was refused.
    #[error("Camera permission denied for '{source_name}'")]
    CameraPermissionDenied { source_name: String },

    /// A frame was requested before the camera was started.
    #[error("No live camera feed; start the camera before capturing.")]
    NoLiveFeed,

    // ── Validation errors ─────────────────────────────────────────────────
    /// Capture requested while no document type is active.
    #[error("Please select a document type before capturing.")]
    NoDocumentTypeSelected,

    /// The normalised ID number does not have exactly 13 digits.
    #[error("ID Number must be 13 digits (got {digits}).")]
    IncompleteIdNumber { digits: usize },

    /// A required document has not been captured.
    #[error("Please capture the {label} document.")]
    MissingDocument { label: String },

    /// Image bytes or a data URL could not be decoded.
    #[error("Invalid image{}: {detail}", label_suffix(.label))]
    InvalidImage {
        label: Option<String>,
        detail: String,
    },

    // ── Collaborator errors ───────────────────────────────────────────────
    /// Assembling the PDF failed.
    #[error("PDF generation failed: {detail}")]
    PdfRenderFailed { detail: String },

    /// Re-encoding a captured image failed.
    #[error("Image encoding failed for '{label}': {detail}")]
    ImageEncodingFailed { label: String, detail: String },

    /// No access token could be obtained for the storage API.
    #[error("Authorization failed: {detail}\nSet GOOGLE_DRIVE_ACCESS_TOKEN or configure a token provider.")]
    AuthFailed { detail: String },

    /// The destination folder could not be looked up or created.
    #[error("Could not resolve Drive folder '{folder}': {detail}")]
    FolderResolutionFailed { folder: String, detail: String },

    /// The file upload itself failed.
    #[error("Error uploading PDF '{file_name}': {detail}")]
    UploadFailed { file_name: String, detail: String },

    /// A storage request exceeded the configured timeout.
    #[error("Storage request timed out after {secs}s")]
    RequestTimeout { secs: u64 },

    /// Enumerating or deleting an offline cache bucket failed.
    #[error("Cache operation failed on '{name}': {source}")]
    CacheFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the local copy of the PDF failed.
    #[error("Failed to write PDF '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn label_suffix(label: &Option<String>) -> String {
    label
        .as_deref()
        .map(|l| format!(" for '{l}'"))
        .unwrap_or_default()
}

impl CaptureError {
    /// Which part of the flow produced this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CaptureError::CameraUnavailable { .. }
            | CaptureError::CameraPermissionDenied { .. }
            | CaptureError::NoLiveFeed => ErrorCategory::Device,

            CaptureError::NoDocumentTypeSelected
            | CaptureError::IncompleteIdNumber { .. }
            | CaptureError::MissingDocument { .. }
            | CaptureError::InvalidImage { .. } => ErrorCategory::Validation,

            CaptureError::PdfRenderFailed { .. }
            | CaptureError::ImageEncodingFailed { .. }
            | CaptureError::AuthFailed { .. }
            | CaptureError::FolderResolutionFailed { .. }
            | CaptureError::UploadFailed { .. }
            | CaptureError::RequestTimeout { .. }
            | CaptureError::CacheFailed { .. }
            | CaptureError::OutputWriteFailed { .. } => ErrorCategory::Collaborator,

            CaptureError::InvalidConfig(_) | CaptureError::Internal(_) => ErrorCategory::Internal,
        }
    }
}
