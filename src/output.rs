//! Result types returned by [`crate::generate`].

use crate::drive::UploadReceipt;
use serde::Serialize;
use std::path::PathBuf;

/// Everything produced by one successful generate request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutput {
    /// e.g. `8501015000081_01-02-2024.pdf`
    pub file_name: String,
    /// Display form, `850101 5000 08 1`.
    pub id_number: String,
    pub page_count: usize,
    pub pdf_size_bytes: usize,
    /// Labels in the order they appear in the PDF.
    pub documents: Vec<String>,
    /// Local copy, when an output directory was configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
    /// Storage location, when a storage client was configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadReceipt>,
    pub stats: GenerationStats,
    /// The PDF itself.
    #[serde(skip)]
    pub pdf: Vec<u8>,
}

/// Timings for one generate request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationStats {
    pub render_duration_ms: u64,
    pub upload_duration_ms: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let out = GenerationOutput {
            file_name: "a.pdf".into(),
            id_number: "850101 5000 08 1".into(),
            page_count: 1,
            pdf_size_bytes: 10,
            documents: vec!["KB".into()],
            saved_to: None,
            upload: None,
            stats: GenerationStats::default(),
            pdf: b"%PDF".to_vec(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("saved_to").is_none());
        assert!(json.get("upload").is_none());
        assert_eq!(json["stats"]["total_duration_ms"], 0);
        assert!(json.get("pdf").is_none());
    }

    #[test]
    fn upload_receipt_is_nested() {
        let out = GenerationOutput {
            file_name: "a.pdf".into(),
            id_number: String::new(),
            page_count: 2,
            pdf_size_bytes: 10,
            documents: Vec::new(),
            saved_to: Some(PathBuf::from("/tmp/a.pdf")),
            upload: Some(UploadReceipt {
                folder_id: "f".into(),
                file_id: "x".into(),
            }),
            stats: GenerationStats::default(),
            pdf: b"%PDF".to_vec(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["upload"]["file_id"], "x");
        assert_eq!(json["saved_to"], "/tmp/a.pdf");
    }
}
