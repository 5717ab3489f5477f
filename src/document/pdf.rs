// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PDF text layer access and page rasterization

use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

use super::types::DocumentError;

/// PDF points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Backend able to read a PDF's text layer and rasterize its pages
pub trait PdfBackend: Send + Sync {
    /// Text layer of every page, in page order (empty string for image-only pages)
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, DocumentError>;

    /// Render every page to an RGB image at `dpi`, in page order
    fn render_pages(&self, bytes: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, DocumentError>;

    /// Number of pages
    fn page_count(&self, bytes: &[u8]) -> Result<usize, DocumentError> {
        Ok(self.page_texts(bytes)?.len())
    }
}

/// PDFium-backed implementation
///
/// The shared library is bound per call, so the backend holds no
/// library state and can be shared freely across threads.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library_dir: Option<PathBuf>,
}

impl PdfiumBackend {
    /// Bind to the system PDFium library
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for the PDFium library in `dir` before falling back to the system one
    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: Some(dir.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, DocumentError> {
        let bindings = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                .or_else(|_| Pdfium::bind_to_system_library()),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| {
            DocumentError::PdfBackend(format!("Could not find PDFium library: {}", e))
        })?;

        Ok(Pdfium::new(bindings))
    }
}

fn load<'a>(pdfium: &'a Pdfium, bytes: &'a [u8]) -> Result<PdfDocument<'a>, DocumentError> {
    pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| DocumentError::Decode(format!("invalid PDF: {}", e)))
}

impl PdfBackend for PdfiumBackend {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
        let pdfium = self.bind()?;
        let document = load(&pdfium, bytes)?;

        document
            .pages()
            .iter()
            .enumerate()
            .map(|(index, page)| {
                page.text().map(|text| text.all()).map_err(|e| {
                    DocumentError::Decode(format!("text layer of page {}: {}", index + 1, e))
                })
            })
            .collect()
    }

    fn render_pages(&self, bytes: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, DocumentError> {
        let pdfium = self.bind()?;
        let document = load(&pdfium, bytes)?;
        let scale = dpi as f32 / POINTS_PER_INCH;

        let mut images = Vec::with_capacity(document.pages().len() as usize);
        for (index, page) in document.pages().iter().enumerate() {
            let width_px = (page.width().value * scale).round().max(1.0) as i32;
            let height_px = (page.height().value * scale).round().max(1.0) as i32;

            let render_config = PdfRenderConfig::new()
                .set_target_width(width_px)
                .set_target_height(height_px)
                .render_form_data(true)
                .render_annotations(true);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                DocumentError::PdfBackend(format!("Failed to render page {}: {}", index + 1, e))
            })?;

            debug!("Rendered PDF page {} at {}x{}", index + 1, width_px, height_px);
            images.push(DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8()));
        }

        Ok(images)
    }

    fn page_count(&self, bytes: &[u8]) -> Result<usize, DocumentError> {
        let pdfium = self.bind()?;
        let document = load(&pdfium, bytes)?;
        Ok(document.pages().len() as usize)
    }
}
