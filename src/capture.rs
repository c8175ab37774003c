//! Capture state: which document types have been photographed.
//!
//! [`CapturedDocumentSet`] maps a document-type label to exactly one image.
//! Re-capturing a label replaces its image in place, so the label keeps the
//! position it got on first capture and the PDF page order stays stable
//! while the user retakes a blurry shot.
//!
//! [`CaptureSession`] owns the set together with the active selection, the
//! activity log and the notifier. It is the only mutator; everything that
//! needs the state borrows the session explicitly.

use crate::activity_log::ActivityLog;
use crate::camera::{Camera, CameraConstraints};
use crate::config::{CaptureConfig, SelectionMode};
use crate::error::CaptureError;
use crate::notify::{NoopNotifier, Notifier};
use crate::pipeline::encode::CapturedImage;
use std::sync::Arc;
use tracing::{debug, warn};

/// Label → image, one image per label, in first-capture order.
#[derive(Debug, Clone, Default)]
pub struct CapturedDocumentSet {
    docs: Vec<(String, CapturedImage)>,
}

impl CapturedDocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `image` under `label`, replacing any earlier image.
    ///
    /// Returns the replaced image, if any.
    pub fn insert(&mut self, label: impl Into<String>, image: CapturedImage) -> Option<CapturedImage> {
        let label = label.into();
        match self.docs.iter_mut().find(|(l, _)| *l == label) {
            Some((_, slot)) => Some(std::mem::replace(slot, image)),
            None => {
                self.docs.push((label, image));
                None
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&CapturedImage> {
        self.docs.iter().find(|(l, _)| l == label).map(|(_, img)| img)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    /// `(label, image)` pairs in first-capture order.
    ///
    /// Borrowing, so it can be enumerated any number of times.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CapturedImage)> + '_ {
        self.docs.iter().map(|(l, img)| (l.as_str(), img))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.docs.iter().map(|(l, _)| l.as_str())
    }

    /// `true` iff every label in `required` has an image.
    pub fn all_present<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.first_missing(required).is_none()
    }

    /// The first label of `required` (in the given order) without an image.
    pub fn first_missing<'a, S: AsRef<str>>(&self, required: &'a [S]) -> Option<&'a str> {
        required
            .iter()
            .map(AsRef::as_ref)
            .find(|label| !self.contains(label))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// The state of one capture station, from page load to page close.
pub struct CaptureSession {
    mode: SelectionMode,
    selected: Option<String>,
    documents: CapturedDocumentSet,
    log: ActivityLog,
    notifier: Notifier,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("mode", &self.mode)
            .field("selected", &self.selected)
            .field("documents", &self.documents)
            .field("log_entries", &self.log.len())
            .finish()
    }
}

impl CaptureSession {
    /// Start an empty session using the selection mode and notifier of `config`.
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            mode: config.selection_mode,
            selected: None,
            documents: CapturedDocumentSet::new(),
            log: ActivityLog::new(),
            notifier: config
                .notifier
                .clone()
                .unwrap_or_else(|| Arc::new(NoopNotifier)),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// The active document type, if any.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Make `label` the target of the next capture.
    ///
    /// In [`SelectionMode::Toggle`] selecting the active label again clears
    /// it. In [`SelectionMode::Direct`] there is no active label and this is
    /// a no-op. Returns the selection after the call.
    pub fn select(&mut self, label: &str) -> Option<&str> {
        match self.mode {
            SelectionMode::Direct => {
                debug!("Ignoring selection of '{}' in direct mode", label);
                return None;
            }
            SelectionMode::Toggle if self.selected.as_deref() == Some(label) => {
                self.selected = None;
            }
            SelectionMode::Toggle | SelectionMode::Sticky => {
                self.selected = Some(label.to_string());
            }
        }
        self.notifier.on_selection_changed(self.selected.as_deref());
        debug!("Selected document type: {:?}", self.selected);
        self.selected.as_deref()
    }

    /// Clear the active document type.
    pub fn deselect(&mut self) {
        if self.selected.take().is_some() {
            self.notifier.on_selection_changed(None);
        }
    }

    /// Store `image` under the active label.
    ///
    /// Fails without touching the document set when nothing is selected (or
    /// in direct mode, where captures must name their label).
    pub fn capture(&mut self, image: CapturedImage) -> Result<(), CaptureError> {
        match self.selected.clone() {
            Some(label) if self.mode.tracks_selection() => {
                self.store(label, image);
                Ok(())
            }
            _ => Err(self.report(CaptureError::NoDocumentTypeSelected)),
        }
    }

    /// Store `image` under an explicit `label`, ignoring the selection.
    pub fn capture_as(&mut self, label: &str, image: CapturedImage) {
        self.store(label.to_string(), image);
    }

    /// Acquire the camera feed.
    ///
    /// A missing or refused camera is reported through the notifier and the
    /// activity log before the error is returned.
    pub async fn start_camera<C: Camera + ?Sized>(
        &mut self,
        camera: &mut C,
        constraints: &CameraConstraints,
    ) -> Result<(), CaptureError> {
        match camera.start(constraints).await {
            Ok(()) => {
                self.log.record("Camera started");
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Grab a frame from `camera` and store it under the target label.
    ///
    /// In direct mode the target is `label`; otherwise it is the active
    /// selection and `label` is ignored. Nothing is stored when there is no
    /// target or no live feed.
    pub async fn capture_from<C: Camera + ?Sized>(
        &mut self,
        camera: &mut C,
        label: Option<&str>,
    ) -> Result<(), CaptureError> {
        let target = if self.mode.tracks_selection() {
            self.selected.clone()
        } else {
            label.map(str::to_string)
        };
        let Some(target) = target else {
            return Err(self.report(CaptureError::NoDocumentTypeSelected));
        };

        if !camera.is_live() {
            return Err(self.report(CaptureError::NoLiveFeed));
        }

        match camera.grab_frame().await {
            Ok(image) => {
                self.store(target, image);
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    pub fn documents(&self) -> &CapturedDocumentSet {
        &self.documents
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Append an entry to the activity log.
    pub fn record(&mut self, action: impl Into<String>) {
        self.log.record(action);
    }

    /// Surface `err` to the user and the log, then hand it back.
    pub fn report(&mut self, err: CaptureError) -> CaptureError {
        let message = err.to_string();
        warn!("{}", message);
        self.notifier.alert(&message);
        self.log.record(format!("Error: {message}"));
        err
    }

    fn store(&mut self, label: String, image: CapturedImage) {
        let (w, h) = (image.width(), image.height());
        let replaced = self.documents.insert(label.clone(), image).is_some();
        self.notifier.on_capture(&label, w, h);
        if replaced {
            self.log.record(format!("Recaptured {label}"));
        } else {
            self.log.record(format!("Captured {label}"));
        }
    }
}
