//! # edgequake-doccapture
//!
//! Photograph a fixed set of identity documents, check the 13-digit ID
//! number, assemble everything into one PDF and upload it to a Google Drive
//! folder.
//!
//! ## Flow Overview
//!
//! ```text
//! select type ─► capture frame ─► type ID number ─► generate
//!                                                      │
//!  ├─ 1. Validate  ID has 13 digits, every required document captured
//!  ├─ 2. Encode    PNG captures → JPEG (spawn_blocking)
//!  ├─ 3. Render    A4 pages via lopdf (spawn_blocking)
//!  ├─ 4. Save      optional local copy, temp file + rename
//!  └─ 5. Upload    find/create folder, multipart upload
//! ```
//!
//! Every step reports failures the same way: a notice through the
//! [`SessionNotifier`] and an entry in the session's [`ActivityLog`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doccapture::{
//!     generate, CameraConstraints, CaptureConfig, CaptureSession, FileCamera, InMemoryDrive,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CaptureConfig::builder()
//!         .required_documents(["ID FRONT", "ID BACK"])
//!         .storage(Arc::new(InMemoryDrive::new()))
//!         .build()?;
//!     let mut session = CaptureSession::new(&config);
//!
//!     let mut camera = FileCamera::new();
//!     session.start_camera(&mut camera, &CameraConstraints::default()).await?;
//!     for (label, path) in [("ID FRONT", "front.jpg"), ("ID BACK", "back.jpg")] {
//!         session.select(label);
//!         camera.aim_at(path);
//!         session.capture_from(&mut camera, None).await?;
//!     }
//!
//!     let output = generate(&mut session, "850101 5000 08 1", &config).await?;
//!     println!("{} ({} pages)", output.file_name, output.page_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doccap` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-doccapture = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod activity_log;
pub mod auth;
pub mod cache;
pub mod camera;
pub mod capture;
pub mod config;
pub mod drive;
pub mod error;
pub mod generate;
pub mod id_number;
pub mod notify;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use activity_log::{ActivityLog, LogEntry};
pub use auth::{AccessTokenProvider, DriveCredentials, EnvTokenProvider, StaticTokenProvider};
pub use cache::{clear_all, CacheStore, DirCacheStore};
pub use camera::{Camera, CameraConstraints, FacingMode, FileCamera};
pub use capture::{CaptureSession, CapturedDocumentSet};
pub use config::{CaptureConfig, CaptureConfigBuilder, FileNaming, PageLayout, SelectionMode};
pub use drive::{DriveClient, DriveFile, GoogleDriveClient, InMemoryDrive, UploadReceipt};
pub use error::{CaptureError, ErrorCategory};
pub use generate::{generate, generate_dated, save_pdf};
pub use id_number::{IdInput, IdNumber};
pub use notify::{NoopNotifier, Notifier, SessionNotifier};
pub use output::{GenerationOutput, GenerationStats};
pub use pipeline::encode::CapturedImage;
