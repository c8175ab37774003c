//! The generate request: validate, render, save, upload.
//!
//! ## Sequence
//!
//! ```text
//! id input ──► IdNumber::parse ──► required documents present?
//!                                        │
//!                         render_pdf (spawn_blocking)
//!                                        │
//!                  local save (output_dir, temp file + rename)
//!                                        │
//!           resolve folder ──► create file (storage, with timeout)
//! ```
//!
//! Each stage runs only when the previous one succeeded. Validation failures
//! never reach the renderer or storage. Any error is reported through the
//! session (notice + activity log) and returned; the session itself stays
//! usable.

use crate::capture::CaptureSession;
use crate::config::CaptureConfig;
use crate::drive;
use crate::error::CaptureError;
use crate::id_number::IdNumber;
use crate::output::{GenerationOutput, GenerationStats};
use crate::pipeline::render;
use chrono::{Local, NaiveDate};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Generate the PDF for today's date.
///
/// # Errors
/// Validation errors when the ID number is incomplete or a required document
/// is missing; collaborator errors when rendering, saving or uploading fails.
/// Every error has already been surfaced through the session's notifier and
/// log when it is returned.
pub async fn generate(
    session: &mut CaptureSession,
    id_input: &str,
    config: &CaptureConfig,
) -> Result<GenerationOutput, CaptureError> {
    generate_dated(session, id_input, config, Local::now().date_naive()).await
}

/// [`generate`] with an explicit date for the file name and header.
pub async fn generate_dated(
    session: &mut CaptureSession,
    id_input: &str,
    config: &CaptureConfig,
    date: NaiveDate,
) -> Result<GenerationOutput, CaptureError> {
    match run(session, id_input, config, date).await {
        Ok(output) => {
            let (notice, action) = if output.upload.is_some() {
                (
                    "PDF generated and uploaded successfully!",
                    format!("Generated and uploaded PDF: {}", output.file_name),
                )
            } else {
                (
                    "PDF generated successfully!",
                    format!("Generated PDF: {}", output.file_name),
                )
            };
            session.notifier().alert(notice);
            session.record(action);
            Ok(output)
        }
        Err(e) => Err(session.report(e)),
    }
}

async fn run(
    session: &CaptureSession,
    id_input: &str,
    config: &CaptureConfig,
    date: NaiveDate,
) -> Result<GenerationOutput, CaptureError> {
    let total_start = Instant::now();

    // ── Step 1: Validate ─────────────────────────────────────────────────
    let id = IdNumber::parse(id_input)?;
    if let Some(label) = session.documents().first_missing(config.required_documents.as_slice()) {
        return Err(CaptureError::MissingDocument {
            label: label.to_string(),
        });
    }
    let file_name = config.file_naming.file_name(id.digits(), date);
    info!("Generating {} ({} documents)", file_name, session.documents().len());

    // ── Step 2: Render ───────────────────────────────────────────────────
    let docs: Vec<_> = session
        .documents()
        .entries()
        .map(|(label, img)| (label.to_string(), img.clone()))
        .collect();
    let documents: Vec<String> = docs.iter().map(|(l, _)| l.clone()).collect();

    let render_start = Instant::now();
    let rendered = render::render_pdf(
        config.layout,
        id.clone(),
        date,
        format!("Documents for ID {}", id.formatted()),
        docs,
        config.jpeg_quality,
    )
    .await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    session
        .notifier()
        .on_pdf_rendered(&file_name, rendered.bytes.len());

    // ── Step 3: Local copy ───────────────────────────────────────────────
    let saved_to = match config.output_dir {
        Some(ref dir) => {
            let path = dir.join(&file_name);
            save_pdf(&path, &rendered.bytes).await?;
            Some(path)
        }
        None => None,
    };

    // ── Step 4: Upload ───────────────────────────────────────────────────
    let upload_start = Instant::now();
    let upload = match config.storage {
        Some(ref client) => {
            let secs = config.upload_timeout_secs;
            let receipt = tokio::time::timeout(
                Duration::from_secs(secs),
                drive::upload_pdf(
                    client.as_ref(),
                    &config.folder_name,
                    &file_name,
                    rendered.bytes.clone(),
                ),
            )
            .await
            .map_err(|_| CaptureError::RequestTimeout { secs })??;
            session
                .notifier()
                .on_upload_complete(&file_name, &receipt.file_id);
            Some(receipt)
        }
        None => {
            debug!("No storage client configured; skipping upload");
            None
        }
    };
    let upload_duration_ms = if upload.is_some() {
        upload_start.elapsed().as_millis() as u64
    } else {
        0
    };

    let stats = GenerationStats {
        render_duration_ms,
        upload_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Generation complete: {} ({} pages, {} bytes) in {}ms",
        file_name,
        rendered.page_count,
        rendered.bytes.len(),
        stats.total_duration_ms
    );

    Ok(GenerationOutput {
        file_name,
        id_number: id.formatted(),
        page_count: rendered.page_count,
        pdf_size_bytes: rendered.bytes.len(),
        documents,
        saved_to,
        upload,
        stats,
        pdf: rendered.bytes,
    })
}

/// Write `bytes` to `path` through a temporary file in the same directory
/// and an atomic rename, so a reader never sees a half-written PDF.
pub async fn save_pdf(path: &Path, bytes: &[u8]) -> Result<(), CaptureError> {
    let target = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || save_pdf_blocking(&target, &bytes))
        .await
        .map_err(|e| CaptureError::Internal(format!("Save task panicked: {e}")))?
        .map_err(|source| CaptureError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Saved PDF to {}", path.display());
    Ok(())
}

fn save_pdf_blocking(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
