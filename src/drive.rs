//! Cloud storage: find or create the destination folder, then upload.
//!
//! [`DriveClient`] is the seam. [`GoogleDriveClient`] talks to the Drive v3
//! REST API over `reqwest`; [`InMemoryDrive`] keeps everything in memory for
//! tests and offline runs.
//!
//! ## Upload sequence
//!
//! ```text
//! files.list  q = name='<folder>' and mimeType='…folder' and trashed=false
//!   ├─ hit  → use files[0].id
//!   └─ miss → files.create {name, mimeType: folder} → id
//! files.create (multipart) {name, parents: [id]} + PDF bytes
//! ```
//!
//! Each step awaits the previous one; a failure anywhere ends the sequence
//! and nothing is retried.

use crate::auth::{AccessTokenProvider, DriveCredentials};
use crate::error::CaptureError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const PDF_MIME_TYPE: &str = "application/pdf";

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const MULTIPART_BOUNDARY: &str = "doccapture-7d1f0c2a9b";

/// A file or folder as returned by the storage API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Where an uploaded PDF ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub folder_id: String,
    pub file_id: String,
}

/// Folder lookup, folder creation and file creation.
#[async_trait]
pub trait DriveClient: Send + Sync {
    /// First non-trashed folder called `name`, if any.
    async fn find_folder(&self, name: &str) -> Result<Option<DriveFile>, CaptureError>;

    /// Create a folder called `name` at the root.
    async fn create_folder(&self, name: &str) -> Result<DriveFile, CaptureError>;

    /// Create a file with `content` inside `parent_id`.
    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
        parent_id: &str,
    ) -> Result<DriveFile, CaptureError>;
}

/// Find `folder_name`, creating it when absent.
pub async fn resolve_folder(
    client: &dyn DriveClient,
    folder_name: &str,
) -> Result<DriveFile, CaptureError> {
    if let Some(folder) = client.find_folder(folder_name).await? {
        debug!("Found folder '{}' ({})", folder_name, folder.id);
        return Ok(folder);
    }
    info!("Folder '{}' not found, creating it", folder_name);
    client.create_folder(folder_name).await
}

/// Upload `pdf` as `file_name` into `folder_name`.
pub async fn upload_pdf(
    client: &dyn DriveClient,
    folder_name: &str,
    file_name: &str,
    pdf: Vec<u8>,
) -> Result<UploadReceipt, CaptureError> {
    let folder = resolve_folder(client, folder_name).await?;
    let size = pdf.len();
    let file = client
        .create_file(file_name, PDF_MIME_TYPE, pdf, &folder.id)
        .await?;
    info!(
        "Uploaded '{}' ({} bytes) → {} in folder {}",
        file_name, size, file.id, folder.id
    );
    Ok(UploadReceipt {
        folder_id: folder.id,
        file_id: file.id,
    })
}

/// Drive search expression for a non-trashed folder called `name`.
pub fn folder_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name='{escaped}' and mimeType='{FOLDER_MIME_TYPE}' and trashed=false")
}

/// `multipart/related` body: JSON metadata part, then the media part.
pub fn multipart_body(boundary: &str, metadata: &serde_json::Value, mime_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

// ── Google Drive REST client ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Drive v3 REST client.
pub struct GoogleDriveClient {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenProvider>,
    credentials: DriveCredentials,
    api_base: String,
    upload_base: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for GoogleDriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveClient")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .field("upload_base", &self.upload_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GoogleDriveClient {
    pub fn new(
        tokens: Arc<dyn AccessTokenProvider>,
        credentials: DriveCredentials,
        timeout_secs: u64,
    ) -> Result<Self, CaptureError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CaptureError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            tokens,
            credentials,
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            timeout_secs,
        })
    }

    /// Point the client at another endpoint (a proxy or a local emulator).
    pub fn with_base_urls(mut self, api_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.upload_base = upload_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn authorized(&self, req: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, CaptureError> {
        let token = self.tokens.access_token().await?;
        let req = req.bearer_auth(token);
        Ok(match self.credentials.api_key {
            Some(ref key) => req.query(&[("key", key.as_str())]),
            None => req,
        })
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        fail: impl Fn(String) -> CaptureError,
    ) -> Result<T, CaptureError> {
        let response = self
            .authorized(req)
            .await?
            .send()
            .await
            .map_err(|e| transport_error(e.is_timeout(), e.to_string(), self.timeout_secs, &fail))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, &fail));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| fail(format!("unexpected response: {e}")))
    }
}

#[async_trait]
impl DriveClient for GoogleDriveClient {
    async fn find_folder(&self, name: &str) -> Result<Option<DriveFile>, CaptureError> {
        let query = folder_query(name);
        let req = self
            .http
            .get(format!("{}/files", self.api_base))
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")]);
        let list: FileList = self
            .send_json(req, |detail| CaptureError::FolderResolutionFailed {
                folder: name.to_string(),
                detail,
            })
            .await?;
        Ok(list.files.into_iter().next())
    }

    async fn create_folder(&self, name: &str) -> Result<DriveFile, CaptureError> {
        let req = self
            .http
            .post(format!("{}/files", self.api_base))
            .query(&[("fields", "id,name")])
            .json(&serde_json::json!({ "name": name, "mimeType": FOLDER_MIME_TYPE }));
        self.send_json(req, |detail| CaptureError::FolderResolutionFailed {
            folder: name.to_string(),
            detail,
        })
        .await
    }

    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
        parent_id: &str,
    ) -> Result<DriveFile, CaptureError> {
        let metadata = serde_json::json!({ "name": name, "parents": [parent_id] });
        let body = multipart_body(MULTIPART_BOUNDARY, &metadata, mime_type, &content);
        let req = self
            .http
            .post(format!("{}/files", self.upload_base))
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body);
        self.send_json(req, |detail| CaptureError::UploadFailed {
            file_name: name.to_string(),
            detail,
        })
        .await
    }
}

/// Error for a request that never got a response.
fn transport_error(
    timed_out: bool,
    detail: String,
    timeout_secs: u64,
    fail: impl Fn(String) -> CaptureError,
) -> CaptureError {
    if timed_out {
        CaptureError::RequestTimeout { secs: timeout_secs }
    } else {
        fail(detail)
    }
}

/// Error for a non-success HTTP status. 401 and 403 are credential
/// problems; anything else belongs to the request that failed.
fn status_error(
    status: reqwest::StatusCode,
    body: &str,
    fail: impl Fn(String) -> CaptureError,
) -> CaptureError {
    let detail = format!("HTTP {status}: {}", truncate(body, 200));
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            CaptureError::AuthFailed { detail }
        }
        _ => fail(detail),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── In-memory client ─────────────────────────────────────────────────────

/// A file held by [`InMemoryDrive`].
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parent_id: Option<String>,
    pub content: Vec<u8>,
}

/// A [`DriveClient`] that keeps files in memory.
#[derive(Debug, Default)]
pub struct InMemoryDrive {
    files: Mutex<Vec<StoredFile>>,
}

impl InMemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything stored so far, folders included.
    pub fn files(&self) -> Vec<StoredFile> {
        self.lock().clone()
    }

    /// Non-folder files only.
    pub fn uploads(&self) -> Vec<StoredFile> {
        self.lock()
            .iter()
            .filter(|f| f.mime_type != FOLDER_MIME_TYPE)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredFile>> {
        // A poisoned lock only means a test panicked mid-push; the data is still usable.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn store(&self, name: &str, mime_type: &str, parent_id: Option<&str>, content: Vec<u8>) -> DriveFile {
        let mut files = self.lock();
        let id = format!("mem-{}", files.len() + 1);
        files.push(StoredFile {
            id: id.clone(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parent_id: parent_id.map(str::to_string),
            content,
        });
        DriveFile {
            id,
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl DriveClient for InMemoryDrive {
    async fn find_folder(&self, name: &str) -> Result<Option<DriveFile>, CaptureError> {
        Ok(self
            .lock()
            .iter()
            .find(|f| f.mime_type == FOLDER_MIME_TYPE && f.name == name)
            .map(|f| DriveFile {
                id: f.id.clone(),
                name: f.name.clone(),
            }))
    }

    async fn create_folder(&self, name: &str) -> Result<DriveFile, CaptureError> {
        Ok(self.store(name, FOLDER_MIME_TYPE, None, Vec::new()))
    }

    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
        parent_id: &str,
    ) -> Result<DriveFile, CaptureError> {
        if !self.lock().iter().any(|f| f.id == parent_id) {
            return Err(CaptureError::UploadFailed {
                file_name: name.to_string(),
                detail: format!("parent folder {parent_id} does not exist"),
            });
        }
        Ok(self.store(name, mime_type, Some(parent_id), content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_query_matches_drive_syntax() {
        assert_eq!(
            folder_query("Employee test packs"),
            "name='Employee test packs' and mimeType='application/vnd.google-apps.folder' and trashed=false"
        );
    }

    #[test]
    fn folder_query_escapes_quotes() {
        assert!(folder_query("Bob's docs").starts_with("name='Bob\\'s docs'"));
    }

    #[test]
    fn multipart_body_layout() {
        let meta = serde_json::json!({ "name": "a.pdf", "parents": ["f1"] });
        let body = multipart_body("b", &meta, PDF_MIME_TYPE, b"%PDF-1.5");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--b\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{"));
        assert!(text.contains("\r\n--b\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.5\r\n--b--\r\n"));
        assert!(text.contains("\"parents\":[\"f1\"]"));
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }

    fn upload_failed(detail: String) -> CaptureError {
        CaptureError::UploadFailed {
            file_name: "a.pdf".into(),
            detail,
        }
    }

    #[test]
    fn status_errors_map_by_code() {
        use reqwest::StatusCode;

        let cases = [
            (StatusCode::UNAUTHORIZED, "auth", "HTTP 401 Unauthorized: bad token"),
            (StatusCode::FORBIDDEN, "auth", "HTTP 403 Forbidden: bad token"),
            (StatusCode::NOT_FOUND, "upload", "HTTP 404 Not Found: bad token"),
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "upload",
                "HTTP 500 Internal Server Error: bad token",
            ),
        ];
        for (status, kind, expected) in cases {
            match (kind, status_error(status, "bad token", upload_failed)) {
                ("auth", CaptureError::AuthFailed { detail }) => assert_eq!(detail, expected),
                ("upload", CaptureError::UploadFailed { detail, .. }) => {
                    assert_eq!(detail, expected)
                }
                (_, other) => panic!("{status}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn status_error_uses_the_request_error_for_folders() {
        let err = status_error(reqwest::StatusCode::BAD_GATEWAY, "", |detail| {
            CaptureError::FolderResolutionFailed {
                folder: "Employee test packs".into(),
                detail,
            }
        });
        assert!(matches!(
            err,
            CaptureError::FolderResolutionFailed { ref detail, .. } if detail == "HTTP 502 Bad Gateway: "
        ));
    }

    #[test]
    fn status_error_truncates_long_bodies() {
        let body = "x".repeat(500);
        match status_error(reqwest::StatusCode::FORBIDDEN, &body, upload_failed) {
            CaptureError::AuthFailed { detail } => {
                assert_eq!(detail.len(), "HTTP 403 Forbidden: ".len() + 200)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn transport_errors_prefer_timeout() {
        assert!(matches!(
            transport_error(true, "operation timed out".into(), 30, upload_failed),
            CaptureError::RequestTimeout { secs: 30 }
        ));
        assert!(matches!(
            transport_error(false, "connection refused".into(), 30, upload_failed),
            CaptureError::UploadFailed { ref detail, .. } if detail == "connection refused"
        ));
    }

    #[tokio::test]
    async fn resolve_folder_creates_once() {
        let drive = InMemoryDrive::new();
        let a = resolve_folder(&drive, "Employee test packs").await.unwrap();
        let b = resolve_folder(&drive, "Employee test packs").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(drive.files().len(), 1);
    }

    #[tokio::test]
    async fn upload_pdf_places_file_in_folder() {
        let drive = InMemoryDrive::new();
        let receipt = upload_pdf(&drive, "packs", "x.pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        let uploads = drive.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].name, "x.pdf");
        assert_eq!(uploads[0].mime_type, PDF_MIME_TYPE);
        assert_eq!(uploads[0].parent_id.as_deref(), Some(receipt.folder_id.as_str()));
        assert_eq!(uploads[0].id, receipt.file_id);
    }

    #[tokio::test]
    async fn in_memory_rejects_unknown_parent() {
        let drive = InMemoryDrive::new();
        let err = drive
            .create_file("x.pdf", PDF_MIME_TYPE, Vec::new(), "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::UploadFailed { .. }));
    }
}
