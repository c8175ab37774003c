//! Camera access: acquire a feed and freeze its current frame.
//!
//! The [`Camera`] trait is the seam between a session and whatever produces
//! pixels. A browser build would wrap `getUserMedia` plus a canvas; the CLI
//! and the tests use [`FileCamera`], whose "feed" is an image file on disk
//! that the operator points it at before each capture.

use crate::error::CaptureError;
use crate::pipeline::encode::CapturedImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which way the requested camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FacingMode {
    /// Rear camera, pointed at the document. (default)
    #[default]
    Environment,
    /// Front camera.
    User,
}

/// Stream constraints passed when starting the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConstraints {
    pub facing_mode: FacingMode,
    pub audio: bool,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            audio: false,
        }
    }
}

/// A source of still frames.
#[async_trait]
pub trait Camera: Send {
    /// Acquire the feed. Fails with a device error when the camera is
    /// missing or access is refused.
    async fn start(&mut self, constraints: &CameraConstraints) -> Result<(), CaptureError>;

    /// Whether a live feed is currently available.
    fn is_live(&self) -> bool;

    /// Freeze the current frame as PNG.
    async fn grab_frame(&mut self) -> Result<CapturedImage, CaptureError>;
}

/// A camera whose view is an image file.
///
/// [`FileCamera::aim_at`] chooses what is "in front of the lens"; each
/// [`Camera::grab_frame`] reads and decodes that file.
#[derive(Debug, Default)]
pub struct FileCamera {
    live: bool,
    facing_mode: FacingMode,
    in_view: Option<PathBuf>,
}

impl FileCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the camera at an image file.
    pub fn aim_at(&mut self, path: impl Into<PathBuf>) {
        self.in_view = Some(path.into());
    }

    /// Drop the feed.
    pub fn stop(&mut self) {
        self.live = false;
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }
}

#[async_trait]
impl Camera for FileCamera {
    async fn start(&mut self, constraints: &CameraConstraints) -> Result<(), CaptureError> {
        if constraints.audio {
            return Err(CaptureError::CameraUnavailable {
                reason: "an image-file camera has no audio track".into(),
            });
        }
        self.facing_mode = constraints.facing_mode;
        self.live = true;
        info!("File camera started ({:?})", constraints.facing_mode);
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live
    }

    async fn grab_frame(&mut self) -> Result<CapturedImage, CaptureError> {
        if !self.live {
            return Err(CaptureError::NoLiveFeed);
        }
        let path = self
            .in_view
            .clone()
            .ok_or_else(|| CaptureError::CameraUnavailable {
                reason: "nothing in view; aim the camera at an image first".into(),
            })?;

        let bytes = read_frame(&path).await?;
        let image = tokio::task::spawn_blocking(move || CapturedImage::from_bytes(&bytes))
            .await
            .map_err(|e| CaptureError::Internal(format!("Frame decode task panicked: {e}")))?
            .map_err(|e| match e {
                CaptureError::InvalidImage { detail, .. } => CaptureError::InvalidImage {
                    label: None,
                    detail: format!("{}: {detail}", path.display()),
                },
                other => other,
            })?;

        debug!(
            "Grabbed {}x{} frame from {}",
            image.width(),
            image.height(),
            path.display()
        );
        Ok(image)
    }
}

async fn read_frame(path: &Path) -> Result<Vec<u8>, CaptureError> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            CaptureError::CameraPermissionDenied {
                source_name: path.display().to_string(),
            }
        } else {
            CaptureError::CameraUnavailable {
                reason: format!("{}: {e}", path.display()),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([0, 128, 255])))
            .save(&path)
            .unwrap();
        path
    }

    #[tokio::test]
    async fn grab_requires_start() {
        let mut cam = FileCamera::new();
        assert!(!cam.is_live());
        let err = cam.grab_frame().await.unwrap_err();
        assert!(matches!(err, CaptureError::NoLiveFeed));
    }

    #[tokio::test]
    async fn grab_requires_something_in_view() {
        let mut cam = FileCamera::new();
        cam.start(&CameraConstraints::default()).await.unwrap();
        let err = cam.grab_frame().await.unwrap_err();
        assert!(matches!(err, CaptureError::CameraUnavailable { .. }));
    }

    #[tokio::test]
    async fn grab_reads_the_file_in_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "front.png");

        let mut cam = FileCamera::new();
        cam.start(&CameraConstraints::default()).await.unwrap();
        cam.aim_at(&path);
        let frame = cam.grab_frame().await.unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 3));
    }

    #[tokio::test]
    async fn missing_file_is_a_device_error() {
        let mut cam = FileCamera::new();
        cam.start(&CameraConstraints::default()).await.unwrap();
        cam.aim_at("/definitely/not/here.png");
        let err = cam.grab_frame().await.unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Device);
    }

    #[tokio::test]
    async fn stop_drops_the_feed() {
        let mut cam = FileCamera::new();
        cam.start(&CameraConstraints::default()).await.unwrap();
        cam.stop();
        assert!(!cam.is_live());
    }

    #[tokio::test]
    async fn audio_is_refused() {
        let mut cam = FileCamera::new();
        let err = cam
            .start(&CameraConstraints {
                facing_mode: FacingMode::User,
                audio: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::CameraUnavailable { .. }));
        assert!(!cam.is_live());
    }
}
