//! Configuration types for a capture session.
//!
//! All session behaviour is controlled through [`CaptureConfig`], built via
//! its [`CaptureConfigBuilder`]. The three historical variants of the capture
//! page differ only in what is configured here: how a document type is
//! selected, which documents are mandatory, how the PDF is laid out and how
//! its file is named.

use crate::drive::DriveClient;
use crate::error::CaptureError;
use crate::notify::Notifier;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Documents required before a PDF may be generated, in capture-screen order.
pub const DEFAULT_REQUIRED_DOCUMENTS: [&str; 5] = ["KB", "SSO", "HAZARD ID", "ID FRONT", "ID BACK"];

/// Drive folder that receives the generated PDFs.
pub const DEFAULT_FOLDER_NAME: &str = "Employee test packs";

/// Configuration for a capture session.
///
/// Built via [`CaptureConfig::builder()`] or using
/// [`CaptureConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doccapture::{CaptureConfig, PageLayout, SelectionMode};
///
/// let config = CaptureConfig::builder()
///     .selection_mode(SelectionMode::Direct)
///     .layout(PageLayout::Continuous)
///     .required_documents(["ID FRONT", "ID BACK"])
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CaptureConfig {
    /// Labels that must all be captured before generation. Default: the five
    /// employee-pack documents. Empty disables the check.
    pub required_documents: Vec<String>,

    /// How the target document type for a capture is chosen. Default: [`SelectionMode::Toggle`].
    pub selection_mode: SelectionMode,

    /// PDF page layout. Default: [`PageLayout::PerDocument`].
    pub layout: PageLayout,

    /// PDF file-name style. Default: [`FileNaming::Dashed`].
    pub file_naming: FileNaming,

    /// Name of the Drive folder to upload into. Created on first use.
    pub folder_name: String,

    /// Save a local copy of every generated PDF into this directory.
    pub output_dir: Option<PathBuf>,

    /// Cloud storage client. When `None` the PDF is generated but not uploaded.
    pub storage: Option<Arc<dyn DriveClient>>,

    /// Receiver for user-visible notices. Default: none (notices only logged).
    pub notifier: Option<Notifier>,

    /// JPEG quality used when embedding captures in the PDF, 1–100. Default: 90.
    ///
    /// Camera frames are stored as PNG; at 90 the embedded JPEG is roughly a
    /// tenth of the size with no visible loss on printed text.
    pub jpeg_quality: u8,

    /// Overall timeout for the upload sequence in seconds. Default: 60.
    pub upload_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            required_documents: DEFAULT_REQUIRED_DOCUMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            selection_mode: SelectionMode::default(),
            layout: PageLayout::default(),
            file_naming: FileNaming::default(),
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            output_dir: None,
            storage: None,
            notifier: None,
            jpeg_quality: 90,
            upload_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for CaptureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureConfig")
            .field("required_documents", &self.required_documents)
            .field("selection_mode", &self.selection_mode)
            .field("layout", &self.layout)
            .field("file_naming", &self.file_naming)
            .field("folder_name", &self.folder_name)
            .field("output_dir", &self.output_dir)
            .field("storage", &self.storage.as_ref().map(|_| "<dyn DriveClient>"))
            .field("notifier", &self.notifier.as_ref().map(|_| "<dyn SessionNotifier>"))
            .field("jpeg_quality", &self.jpeg_quality)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .finish()
    }
}

impl CaptureConfig {
    /// Create a new builder for `CaptureConfig`.
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CaptureConfig`].
#[derive(Debug)]
pub struct CaptureConfigBuilder {
    config: CaptureConfig,
}

impl CaptureConfigBuilder {
    pub fn required_documents<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.required_documents = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn selection_mode(mut self, mode: SelectionMode) -> Self {
        self.config.selection_mode = mode;
        self
    }

    pub fn layout(mut self, layout: PageLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn file_naming(mut self, naming: FileNaming) -> Self {
        self.config.file_naming = naming;
        self
    }

    pub fn folder_name(mut self, name: impl Into<String>) -> Self {
        self.config.folder_name = name.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn storage(mut self, client: Arc<dyn DriveClient>) -> Self {
        self.config.storage = Some(client);
        self
    }

    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.config.notifier = Some(notifier);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CaptureConfig, CaptureError> {
        let c = &self.config;
        if c.folder_name.trim().is_empty() {
            return Err(CaptureError::InvalidConfig(
                "Drive folder name must not be empty".into(),
            ));
        }
        if let Some(blank) = c.required_documents.iter().find(|l| l.trim().is_empty()) {
            return Err(CaptureError::InvalidConfig(format!(
                "Required document labels must not be blank (got {blank:?})"
            )));
        }
        if c.upload_timeout_secs == 0 {
            return Err(CaptureError::InvalidConfig(
                "Upload timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the document type for the next capture is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Selecting a type makes it active; selecting it again clears it. (default)
    #[default]
    Toggle,
    /// Selecting a type makes it active until another type is selected.
    Sticky,
    /// No active type: every capture names its own label.
    Direct,
}

impl SelectionMode {
    /// Whether captures go to the tracked active label.
    pub fn tracks_selection(self) -> bool {
        !matches!(self, SelectionMode::Direct)
    }
}

/// How captured documents are laid out in the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageLayout {
    /// One A4 page per document: label, then the photo below it. (default)
    #[default]
    PerDocument,
    /// A header with the formatted ID number and date, followed by every
    /// document in sequence, breaking to a new page when the page fills up.
    Continuous,
}

/// How the PDF file is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileNaming {
    /// `8501015000081_05-03-2024.pdf` (zero-padded day and month). (default)
    #[default]
    Dashed,
    /// `8501015000081_5_3_2024.pdf` (unpadded day and month).
    Underscored,
}

impl FileNaming {
    /// File name for a PDF belonging to `id_digits`, generated on `date`.
    pub fn file_name(self, id_digits: &str, date: NaiveDate) -> String {
        match self {
            FileNaming::Dashed => format!("{}_{}.pdf", id_digits, date.format("%d-%m-%Y")),
            FileNaming::Underscored => format!(
                "{}_{}_{}_{}.pdf",
                id_digits,
                date.day(),
                date.month(),
                date.year()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_employee_pack() {
        let c = CaptureConfig::default();
        assert_eq!(
            c.required_documents,
            vec!["KB", "SSO", "HAZARD ID", "ID FRONT", "ID BACK"]
        );
        assert_eq!(c.folder_name, "Employee test packs");
        assert_eq!(c.selection_mode, SelectionMode::Toggle);
        assert_eq!(c.layout, PageLayout::PerDocument);
        assert!(c.storage.is_none());
    }

    #[test]
    fn builder_clamps_quality() {
        let c = CaptureConfig::builder().jpeg_quality(0).build().unwrap();
        assert_eq!(c.jpeg_quality, 1);
        let c = CaptureConfig::builder().jpeg_quality(200).build().unwrap();
        assert_eq!(c.jpeg_quality, 100);
    }

    #[test]
    fn builder_rejects_blank_folder() {
        let err = CaptureConfig::builder().folder_name("  ").build().unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_blank_required_label() {
        let err = CaptureConfig::builder()
            .required_documents(["KB", ""])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("blank"));
    }

    #[test]
    fn empty_required_set_is_allowed() {
        let c = CaptureConfig::builder()
            .required_documents(Vec::<String>::new())
            .build()
            .unwrap();
        assert!(c.required_documents.is_empty());
    }

    #[test]
    fn file_naming_styles() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            FileNaming::Dashed.file_name("8501015000081", d),
            "8501015000081_05-03-2024.pdf"
        );
        assert_eq!(
            FileNaming::Underscored.file_name("8501015000081", d),
            "8501015000081_5_3_2024.pdf"
        );
    }

    #[test]
    fn direct_mode_does_not_track_selection() {
        assert!(SelectionMode::Toggle.tracks_selection());
        assert!(SelectionMode::Sticky.tracks_selection());
        assert!(!SelectionMode::Direct.tracks_selection());
    }

    #[test]
    fn debug_hides_trait_objects() {
        let s = format!("{:?}", CaptureConfig::default());
        assert!(s.contains("CaptureConfig"));
        assert!(s.contains("storage: None"));
    }
}
