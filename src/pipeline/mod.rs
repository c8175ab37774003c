//! Image and PDF stages of the generate request.
//!
//! ## Data Flow
//!
//! ```text
//! camera frame ──▶ encode ──▶ render
//!   (any format)    (PNG, then JPEG)   (lopdf, A4 pages)
//! ```
//!
//! 1. [`encode`]: hold each capture as PNG; re-encode to JPEG for embedding
//! 2. [`render`]: lay the captures out on A4 pages and serialise the PDF;
//!    runs in `spawn_blocking` because encoding and assembly are CPU-bound

pub mod encode;
pub mod render;
