//! End-to-end tests of a capture session through the public API.
//!
//! Frames come from PNG files written into a temp directory and storage is
//! an [`InMemoryDrive`], so nothing here needs a camera or network access.

use chrono::NaiveDate;
use edgequake_doccapture::{
    generate_dated, Camera, CameraConstraints, CaptureConfig, CaptureError, CaptureSession,
    ErrorCategory, FileCamera, FileNaming, IdInput, InMemoryDrive, PageLayout, SelectionMode,
    SessionNotifier,
};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    alerts: Mutex<Vec<String>>,
    uploads: Mutex<Vec<String>>,
}

impl SessionNotifier for Recorder {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn on_upload_complete(&self, file_name: &str, _file_id: &str) {
        self.uploads.lock().unwrap().push(file_name.to_string());
    }
}

impl Recorder {
    fn last_alert(&self) -> Option<String> {
        self.alerts.lock().unwrap().last().cloned()
    }
}

fn write_frame(dir: &Path, name: &str, shade: u8) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 10, Rgb([shade, 90, 200 - shade])))
        .save(&path)
        .unwrap();
    path
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn live_camera() -> FileCamera {
    init_tracing();
    let mut camera = FileCamera::new();
    camera.start(&CameraConstraints::default()).await.unwrap();
    camera
}

/// Select `label`, aim at `path`, grab a frame.
async fn shoot(session: &mut CaptureSession, camera: &mut FileCamera, label: &str, path: &Path) {
    if session.selected() != Some(label) {
        session.select(label);
    }
    camera.aim_at(path);
    session.capture_from(camera, None).await.unwrap();
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn typing_an_id_character_by_character() {
    let mut input = IdInput::new();
    let shown = "8501015000081"
        .chars()
        .map(|c| input.type_char(c))
        .last()
        .unwrap();
    assert_eq!(shown, "850101 5000 08 1");
    assert_eq!(input.digits(), "8501015000081");
    assert!(input.is_complete());

    assert_eq!(input.backspace(), "850101 5000 08");
    assert!(!input.is_complete());
}

#[tokio::test]
async fn missing_required_document_never_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let drive = Arc::new(InMemoryDrive::new());
    let config = CaptureConfig::builder()
        .required_documents(["ID FRONT", "ID BACK", "KB"])
        .storage(drive.clone())
        .notifier(recorder.clone())
        .build()
        .unwrap();

    let mut session = CaptureSession::new(&config);
    let mut camera = live_camera().await;
    shoot(&mut session, &mut camera, "ID FRONT", &write_frame(dir.path(), "f.png", 10)).await;
    shoot(&mut session, &mut camera, "ID BACK", &write_frame(dir.path(), "b.png", 20)).await;

    let err = generate_dated(&mut session, "8501015000081", &config, date())
        .await
        .unwrap_err();

    assert!(matches!(err, CaptureError::MissingDocument { ref label } if label == "KB"));
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(
        recorder.last_alert().as_deref(),
        Some("Please capture the KB document.")
    );
    assert!(drive.files().is_empty(), "storage must not be touched");
    assert!(recorder.uploads.lock().unwrap().is_empty());

    // The session survives and the request succeeds once KB is captured.
    shoot(&mut session, &mut camera, "KB", &write_frame(dir.path(), "k.png", 30)).await;
    let out = generate_dated(&mut session, "8501015000081", &config, date())
        .await
        .unwrap();
    assert_eq!(out.documents, ["ID FRONT", "ID BACK", "KB"]);
}

#[tokio::test]
async fn full_flow_uploads_into_the_pack_folder() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let drive = Arc::new(InMemoryDrive::new());
    let config = CaptureConfig::builder()
        .storage(drive.clone())
        .notifier(recorder.clone())
        .build()
        .unwrap();

    let mut session = CaptureSession::new(&config);
    let mut camera = live_camera().await;
    for (i, label) in ["KB", "SSO", "HAZARD ID", "ID FRONT", "ID BACK"].iter().enumerate() {
        let frame = write_frame(dir.path(), &format!("{i}.png"), i as u8 * 40);
        shoot(&mut session, &mut camera, label, &frame).await;
    }

    let out = generate_dated(&mut session, "850101 5000 08 1", &config, date())
        .await
        .unwrap();
    assert_eq!(out.file_name, "8501015000081_01-02-2024.pdf");
    assert_eq!(out.page_count, 5);

    let files = drive.files();
    let folder = files
        .iter()
        .find(|f| f.name == "Employee test packs")
        .expect("folder created");
    let uploads = drive.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].parent_id.as_deref(), Some(folder.id.as_str()));
    assert_eq!(uploads[0].content, out.pdf);

    let doc = lopdf::Document::load_mem(&uploads[0].content).unwrap();
    assert_eq!(doc.get_pages().len(), 5);

    assert_eq!(
        recorder.last_alert().as_deref(),
        Some("PDF generated and uploaded successfully!")
    );
    assert_eq!(
        recorder.uploads.lock().unwrap().as_slice(),
        ["8501015000081_01-02-2024.pdf"]
    );

    // A second request reuses the folder.
    generate_dated(&mut session, "8501015000081", &config, date())
        .await
        .unwrap();
    let folders = drive
        .files()
        .into_iter()
        .filter(|f| f.name == "Employee test packs")
        .count();
    assert_eq!(folders, 1);
    assert_eq!(drive.uploads().len(), 2);
}

#[tokio::test]
async fn recapture_keeps_one_image_per_label() {
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig::builder()
        .required_documents(["KB"])
        .selection_mode(SelectionMode::Sticky)
        .build()
        .unwrap();
    let mut session = CaptureSession::new(&config);
    let mut camera = live_camera().await;

    shoot(&mut session, &mut camera, "KB", &write_frame(dir.path(), "1.png", 1)).await;
    shoot(&mut session, &mut camera, "KB", &write_frame(dir.path(), "2.png", 99)).await;

    assert_eq!(session.documents().len(), 1);
    let stored = session.documents().get("KB").unwrap();
    let expected = edgequake_doccapture::CapturedImage::from_bytes(
        &std::fs::read(dir.path().join("2.png")).unwrap(),
    )
    .unwrap();
    assert_eq!(stored, &expected);
    assert!(session.log().render().contains("Recaptured KB"));
}

#[tokio::test]
async fn capture_without_live_feed_is_a_device_error() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let config = CaptureConfig::builder()
        .notifier(recorder.clone())
        .build()
        .unwrap();
    let mut session = CaptureSession::new(&config);

    let mut camera = FileCamera::new();
    camera.aim_at(write_frame(dir.path(), "x.png", 5));
    session.select("SSO");
    let err = session.capture_from(&mut camera, None).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Device);
    assert!(session.documents().is_empty());
    assert!(recorder.last_alert().is_some());
}

#[tokio::test]
async fn continuous_layout_saved_locally_with_underscored_name() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let config = CaptureConfig::builder()
        .required_documents(["ID FRONT", "ID BACK"])
        .selection_mode(SelectionMode::Direct)
        .layout(PageLayout::Continuous)
        .file_naming(FileNaming::Underscored)
        .output_dir(&out_dir)
        .build()
        .unwrap();
    let mut session = CaptureSession::new(&config);
    let mut camera = live_camera().await;

    for (label, shade) in [("ID FRONT", 1), ("ID BACK", 2)] {
        camera.aim_at(write_frame(dir.path(), &format!("{shade}.png"), shade));
        session.capture_from(&mut camera, Some(label)).await.unwrap();
    }

    let out = generate_dated(&mut session, "8501015000081", &config, date())
        .await
        .unwrap();
    assert_eq!(out.file_name, "8501015000081_1_2_2024.pdf");
    assert!(out.upload.is_none());

    let saved = out.saved_to.clone().unwrap();
    assert_eq!(saved, out_dir.join("8501015000081_1_2_2024.pdf"));
    let bytes = std::fs::read(&saved).unwrap();
    assert_eq!(bytes, out.pdf);

    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    let first = doc.get_pages()[&1];
    let content = String::from_utf8_lossy(&doc.get_page_content(first).unwrap()).into_owned();
    assert!(content.contains("ID Number: 850101 5000 08 1"));
    assert!(content.contains("Date: 01/02/2024"));
}
