//! Image encoding: camera frames → PNG [`CapturedImage`], PNG → JPEG for the PDF.
//!
//! A captured frame is stored the way a canvas hands it out: as PNG, which is
//! lossless, so a re-capture or a data-URL round trip never degrades it.
//! PDF has no PNG filter, so when the document is assembled each image is
//! re-encoded as baseline JPEG and embedded with `DCTDecode`, which every PDF
//! reader understands without any further decoding on our side.

use crate::error::CaptureError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fmt;
use std::io::Cursor;
use tracing::debug;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// One frozen camera frame, PNG-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_len", &self.png.len())
            .finish()
    }
}

impl CapturedImage {
    /// Encode a decoded frame as PNG.
    pub fn from_image(img: &DynamicImage) -> Result<Self, CaptureError> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| CaptureError::InvalidImage {
                label: None,
                detail: format!("PNG encoding failed: {e}"),
            })?;
        debug!(
            "Encoded {}x{} frame → {} bytes PNG",
            img.width(),
            img.height(),
            buf.len()
        );
        Ok(Self {
            png: buf,
            width: img.width(),
            height: img.height(),
        })
    }

    /// Accept already-encoded image bytes of any supported format.
    ///
    /// PNG input is kept byte-for-byte; anything else (JPEG from a phone) is
    /// decoded and re-encoded as PNG.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CaptureError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| invalid(format!("unreadable image: {e}")))?;

        if reader.format() == Some(ImageFormat::Png) {
            let (width, height) = reader
                .into_dimensions()
                .map_err(|e| invalid(format!("corrupt PNG: {e}")))?;
            return Ok(Self {
                png: bytes.to_vec(),
                width,
                height,
            });
        }

        let img = reader
            .decode()
            .map_err(|e| invalid(format!("cannot decode image: {e}")))?;
        Self::from_image(&img)
    }

    /// Parse a `data:image/png;base64,…` URL, as produced by a canvas.
    pub fn from_data_url(url: &str) -> Result<Self, CaptureError> {
        let b64 = url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or_else(|| invalid("expected a data:image/png;base64 URL".to_string()))?;
        let bytes = STANDARD
            .decode(b64.trim())
            .map_err(|e| invalid(format!("bad base64 payload: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Render as a `data:image/png;base64,…` URL.
    pub fn to_data_url(&self) -> String {
        format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(&self.png))
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Decode back to pixels.
    pub fn decode(&self) -> Result<DynamicImage, CaptureError> {
        image::load_from_memory_with_format(&self.png, ImageFormat::Png)
            .map_err(|e| invalid(format!("cannot decode stored PNG: {e}")))
    }
}

/// A JPEG ready to be embedded as a PDF image XObject.
#[derive(Debug, Clone)]
pub struct PdfImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Re-encode a captured frame as an RGB JPEG for embedding.
///
/// Alpha is dropped: JPEG has no alpha channel and a camera frame is opaque.
pub fn encode_for_pdf(
    label: &str,
    image: &CapturedImage,
    quality: u8,
) -> Result<PdfImage, CaptureError> {
    let rgb = image
        .decode()
        .map_err(|e| CaptureError::ImageEncodingFailed {
            label: label.to_string(),
            detail: e.to_string(),
        })?
        .to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(&rgb)
        .map_err(|e| CaptureError::ImageEncodingFailed {
            label: label.to_string(),
            detail: e.to_string(),
        })?;

    debug!(
        "'{}': {}x{} → {} bytes JPEG (q={})",
        label,
        rgb.width(),
        rgb.height(),
        jpeg.len(),
        quality
    );

    Ok(PdfImage {
        jpeg,
        width: rgb.width(),
        height: rgb.height(),
    })
}

fn invalid(detail: String) -> CaptureError {
    CaptureError::InvalidImage {
        label: None,
        detail,
    }
}
