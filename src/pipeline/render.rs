//! PDF assembly: lay captured documents out on A4 pages via lopdf.
//!
//! [`PdfComposer`] is a small page-oriented writer. Coordinates are in
//! millimetres with the origin at the top-left of an A4 portrait page, and
//! text is placed by its baseline, so layouts read the same as they would in
//! a browser PDF library. Only at [`PdfComposer::to_bytes`] are they flipped
//! into PDF user space (points, origin bottom-left).
//!
//! ## Why spawn_blocking?
//!
//! Decoding the PNG captures and re-encoding them as JPEG is CPU-bound and
//! can take a noticeable fraction of a second for a 12-megapixel phone
//! frame. [`render_pdf`] moves the whole assembly onto the blocking pool so
//! the async executor keeps serving the upload and UI events.

use crate::config::PageLayout;
use crate::error::CaptureError;
use crate::id_number::IdNumber;
use crate::pipeline::encode::{encode_for_pdf, CapturedImage, PdfImage};
use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;
const PT_PER_MM: f32 = 72.0 / 25.4;

/// Font size used for all text, in points.
pub const FONT_SIZE_PT: f32 = 16.0;

/// Left margin used by both layouts.
const MARGIN_MM: f32 = 10.0;
/// Size every document photo is scaled to.
const IMAGE_W_MM: f32 = 180.0;
const IMAGE_H_MM: f32 = 160.0;

#[derive(Debug, Clone)]
enum PageItem {
    Text { x: f32, y: f32, text: String },
    Image { x: f32, y: f32, w: f32, h: f32, image: PdfImage },
}

/// An in-memory PDF under construction.
///
/// Starts with one blank page, like a freshly created browser PDF document.
#[derive(Debug, Clone)]
pub struct PdfComposer {
    pages: Vec<Vec<PageItem>>,
    title: Option<String>,
}

impl Default for PdfComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfComposer {
    pub fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            title: None,
        }
    }

    /// Set the document title stored in the PDF info dictionary.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Append a blank page and make it current.
    pub fn add_page(&mut self) {
        self.pages.push(Vec::new());
    }

    /// Place `text` on the current page with its baseline at (x, y) mm.
    pub fn text(&mut self, text: impl Into<String>, x: f32, y: f32) {
        self.current().push(PageItem::Text {
            x,
            y,
            text: text.into(),
        });
    }

    /// Draw `image` on the current page, top-left corner at (x, y), scaled to w × h mm.
    pub fn image(&mut self, image: PdfImage, x: f32, y: f32, w: f32, h: f32) {
        self.current().push(PageItem::Image { x, y, w, h, image });
    }

    /// Remove page `page_num` (1-indexed).
    pub fn delete_page(&mut self, page_num: usize) -> Result<(), CaptureError> {
        if page_num == 0 || page_num > self.pages.len() {
            return Err(CaptureError::PdfRenderFailed {
                detail: format!(
                    "cannot delete page {page_num}: document has {} pages",
                    self.pages.len()
                ),
            });
        }
        self.pages.remove(page_num - 1);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn current(&mut self) -> &mut Vec<PageItem> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Serialise to PDF bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CaptureError> {
        if self.pages.is_empty() {
            return Err(CaptureError::PdfRenderFailed {
                detail: "document has no pages".into(),
            });
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        let font_id = doc.add_object(Object::Dictionary(font));

        let mut kids = Vec::with_capacity(self.pages.len());
        for (idx, items) in self.pages.iter().enumerate() {
            let page_id = write_page(&mut doc, pages_id, font_id, items).map_err(|e| {
                CaptureError::PdfRenderFailed {
                    detail: format!("page {}: {e}", idx + 1),
                }
            })?;
            kids.push(Object::Reference(page_id));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(kids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut info = Dictionary::new();
        info.set(
            "Producer",
            Object::string_literal(concat!("edgequake-doccapture ", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(ref title) = self.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }
        let info_id = doc.add_object(Object::Dictionary(info));
        doc.trailer.set("Info", Object::Reference(info_id));

        let mut buf = Vec::new();
        doc.save_to(&mut buf)
            .map_err(|e| CaptureError::PdfRenderFailed {
                detail: format!("failed to serialise PDF: {e}"),
            })?;
        Ok(buf)
    }
}

fn mm(v: f32) -> f32 {
    v * PT_PER_MM
}

/// Flip a top-origin y (mm) into PDF user space (pt).
fn flip_y(y_mm: f32) -> f32 {
    mm(A4_HEIGHT_MM - y_mm)
}

fn write_page(
    doc: &mut Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    items: &[PageItem],
) -> Result<ObjectId, lopdf::Error> {
    let mut ops = Vec::new();
    let mut xobjects = Dictionary::new();
    let mut image_count = 0usize;

    for item in items {
        match item {
            PageItem::Text { x, y, text } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Real(FONT_SIZE_PT)],
                ));
                ops.push(Operation::new(
                    "Td",
                    vec![Object::Real(mm(*x)), Object::Real(flip_y(*y))],
                ));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(win_ansi(text))],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            PageItem::Image { x, y, w, h, image } => {
                let name = format!("Im{image_count}");
                image_count += 1;
                let image_id = doc.add_object(Object::Stream(image_stream(image)));
                xobjects.set(name.as_bytes(), Object::Reference(image_id));

                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![
                        Object::Real(mm(*w)),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(mm(*h)),
                        Object::Real(mm(*x)),
                        Object::Real(flip_y(*y + *h)),
                    ],
                ));
                ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }

    let content = Content { operations: ops }.encode()?;
    let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content)));

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    if image_count > 0 {
        resources.set("XObject", Object::Dictionary(xobjects));
    }

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(mm(A4_WIDTH_MM)),
            Object::Real(mm(A4_HEIGHT_MM)),
        ]),
    );
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));
    Ok(doc.add_object(Object::Dictionary(page)))
}

fn image_stream(image: &PdfImage) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(image.width as i64));
    dict.set("Height", Object::Integer(image.height as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    // Already compressed; keep lopdf from deflating it again.
    Stream::new(dict, image.jpeg.clone()).with_compression(false)
}

/// Map text onto WinAnsiEncoding for the standard font. Characters the
/// encoding lacks become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\u{00}'..='\u{7F}' | '\u{A0}'..='\u{FF}' => c as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '•' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => b'?',
    }
}

// ── Layouts ──────────────────────────────────────────────────────────────

/// Lay out `docs` according to `layout`.
pub fn compose(
    layout: PageLayout,
    id: &IdNumber,
    date: NaiveDate,
    docs: Vec<(String, PdfImage)>,
) -> Result<PdfComposer, CaptureError> {
    let mut pdf = PdfComposer::new();
    match layout {
        PageLayout::PerDocument => {
            let had_docs = !docs.is_empty();
            for (label, image) in docs {
                pdf.add_page();
                pdf.text(label, MARGIN_MM, 10.0);
                pdf.image(image, MARGIN_MM, 20.0, IMAGE_W_MM, IMAGE_H_MM);
            }
            // Drop the blank first page, unless it is the only one.
            if had_docs && pdf.page_count() > 1 {
                pdf.delete_page(1)?;
            }
        }
        PageLayout::Continuous => {
            pdf.text(format!("ID Number: {}", id.formatted()), MARGIN_MM, 10.0);
            pdf.text(format!("Date: {}", date.format("%d/%m/%Y")), MARGIN_MM, 20.0);

            const LABEL_GAP_MM: f32 = 5.0;
            const BLOCK_GAP_MM: f32 = 10.0;
            const BOTTOM_LIMIT_MM: f32 = A4_HEIGHT_MM - 10.0;

            let mut y = 30.0;
            for (label, image) in docs {
                if y + LABEL_GAP_MM + IMAGE_H_MM > BOTTOM_LIMIT_MM {
                    pdf.add_page();
                    y = 10.0;
                }
                pdf.text(label, MARGIN_MM, y);
                y += LABEL_GAP_MM;
                pdf.image(image, MARGIN_MM, y, IMAGE_W_MM, IMAGE_H_MM);
                y += IMAGE_H_MM + BLOCK_GAP_MM;
            }
        }
    }
    Ok(pdf)
}

/// Output of [`render_pdf`].
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Re-encode every capture and assemble the final PDF.
///
/// Runs inside `spawn_blocking`.
pub async fn render_pdf(
    layout: PageLayout,
    id: IdNumber,
    date: NaiveDate,
    title: String,
    docs: Vec<(String, CapturedImage)>,
    jpeg_quality: u8,
) -> Result<RenderedPdf, CaptureError> {
    tokio::task::spawn_blocking(move || {
        render_pdf_blocking(layout, &id, date, title, docs, jpeg_quality)
    })
    .await
    .map_err(|e| CaptureError::Internal(format!("Render task panicked: {e}")))?
}

/// Blocking implementation of PDF assembly.
fn render_pdf_blocking(
    layout: PageLayout,
    id: &IdNumber,
    date: NaiveDate,
    title: String,
    docs: Vec<(String, CapturedImage)>,
    jpeg_quality: u8,
) -> Result<RenderedPdf, CaptureError> {
    let encoded = docs
        .into_iter()
        .map(|(label, img)| {
            let pdf_img = encode_for_pdf(&label, &img, jpeg_quality)?;
            Ok((label, pdf_img))
        })
        .collect::<Result<Vec<_>, CaptureError>>()?;
    debug!("Encoded {} captures for embedding", encoded.len());

    let mut pdf = compose(layout, id, date, encoded)?;
    pdf.set_title(title);
    let bytes = pdf.to_bytes()?;
    info!(
        "Assembled PDF: {} pages, {} bytes ({:?})",
        pdf.page_count(),
        bytes.len(),
        layout
    );
    Ok(RenderedPdf {
        page_count: pdf.page_count(),
        bytes,
    })
}
