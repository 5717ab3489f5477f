// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Conversion of any supported document into an ordered page sequence

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat};
use std::io::{Cursor, Read, Seek};
use std::sync::Arc;
use tiff::decoder::{Decoder as TiffDecoder, DecodingResult};
use tiff::{ColorType, TiffError, TiffFormatError};
use tracing::debug;

use super::handle::{DocumentHandle, LoadedDocument, SourceKind};
use super::pdf::{PdfBackend, PdfiumBackend};
use super::types::{DocumentError, PageImage};

/// Default rasterization resolution for PDF pages
pub const DEFAULT_PDF_DPI: u32 = 300;

/// Turns document handles into page images
#[derive(Clone)]
pub struct FileNormalizer {
    pdf: Arc<dyn PdfBackend>,
    dpi: u32,
}

impl std::fmt::Debug for FileNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileNormalizer")
            .field("dpi", &self.dpi)
            .finish_non_exhaustive()
    }
}

impl Default for FileNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(PdfiumBackend::new()))
    }
}

impl FileNormalizer {
    pub fn new(pdf: Arc<dyn PdfBackend>) -> Self {
        Self {
            pdf,
            dpi: DEFAULT_PDF_DPI,
        }
    }

    /// Override the PDF rasterization resolution
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Backend used for PDF text layers and rendering
    pub fn pdf_backend(&self) -> &dyn PdfBackend {
        self.pdf.as_ref()
    }

    /// Load a handle and convert it to page images
    pub fn normalize(
        &self,
        handle: impl Into<DocumentHandle>,
    ) -> Result<Vec<PageImage>, DocumentError> {
        let document = LoadedDocument::load(handle.into())?;
        self.normalize_loaded(&document)
    }

    /// Convert an already loaded document to page images
    ///
    /// PDFs yield one RGB page per PDF page; multi-frame rasters (TIFF,
    /// animated GIF) yield one page per frame; other rasters yield one page.
    pub fn normalize_loaded(
        &self,
        document: &LoadedDocument,
    ) -> Result<Vec<PageImage>, DocumentError> {
        let pages = match document.kind() {
            SourceKind::Pdf => self
                .pdf
                .render_pages(document.bytes(), self.dpi)?
                .into_iter()
                .map(PageImage::new)
                .collect(),
            SourceKind::Text => {
                return Err(DocumentError::Decode(
                    "text documents have no page images".to_string(),
                ))
            }
            SourceKind::Raster(Some(ImageFormat::Gif)) => decode_gif_frames(document.bytes())?,
            SourceKind::Raster(Some(ImageFormat::Tiff)) => decode_tiff_pages(document.bytes())?,
            SourceKind::Raster(format) => vec![decode_single(document.bytes(), format)?],
        };

        debug!(
            "Normalized {} into {} page(s)",
            document.name().unwrap_or("document"),
            pages.len()
        );
        Ok(pages)
    }

    /// Number of pages a document normalizes to
    pub fn page_count(&self, handle: impl Into<DocumentHandle>) -> Result<usize, DocumentError> {
        let document = LoadedDocument::load(handle.into())?;
        match document.kind() {
            SourceKind::Pdf => self.pdf.page_count(document.bytes()),
            _ => Ok(self.normalize_loaded(&document)?.len()),
        }
    }
}

fn decode_single(bytes: &[u8], format: Option<ImageFormat>) -> Result<PageImage, DocumentError> {
    let decoded = match format {
        Some(format) => image::load_from_memory_with_format(bytes, format),
        None => image::load_from_memory(bytes),
    }
    .map_err(|e| DocumentError::Decode(e.to_string()))?;

    let format = format.or_else(|| image::guess_format(bytes).ok());
    Ok(match format {
        Some(format) => PageImage::with_format(decoded, format),
        None => PageImage::new(decoded),
    })
}

/// Every frame of a GIF
///
/// The frame iterator ending is the only end-of-pages signal; a frame that
/// fails to decode is an error.
fn decode_gif_frames(bytes: &[u8]) -> Result<Vec<PageImage>, DocumentError> {
    let decoder =
        GifDecoder::new(Cursor::new(bytes)).map_err(|e| DocumentError::Decode(e.to_string()))?;

    let mut pages = Vec::new();
    for frame in decoder.into_frames() {
        let frame = frame.map_err(|e| {
            DocumentError::Decode(format!("GIF frame {}: {}", pages.len() + 1, e))
        })?;
        pages.push(PageImage::with_format(
            DynamicImage::ImageRgba8(frame.into_buffer()),
            ImageFormat::Gif,
        ));
    }

    if pages.is_empty() {
        return Err(DocumentError::Decode("GIF contains no frames".to_string()));
    }
    Ok(pages)
}

/// Every directory of a TIFF file
///
/// Iteration ends when there is no further directory or the next one cannot
/// be located. A page that fails to decode is an error.
fn decode_tiff_pages(bytes: &[u8]) -> Result<Vec<PageImage>, DocumentError> {
    let mut decoder =
        TiffDecoder::new(Cursor::new(bytes)).map_err(|e| DocumentError::Decode(e.to_string()))?;

    let mut pages = Vec::new();
    loop {
        let image = read_tiff_page(&mut decoder).map_err(|e| {
            DocumentError::Decode(format!("TIFF page {}: {}", pages.len() + 1, e))
        })?;
        pages.push(PageImage::with_format(image, ImageFormat::Tiff));

        if !decoder.more_images() {
            break;
        }
        match decoder.next_image() {
            Ok(()) => {}
            Err(
                e @ (TiffError::IoError(_)
                | TiffError::FormatError(
                    TiffFormatError::ImageFileDirectoryNotFound | TiffFormatError::CycleInOffsets,
                )),
            ) => {
                debug!("Stopping TIFF iteration after {} page(s): {}", pages.len(), e);
                break;
            }
            Err(e) => {
                return Err(DocumentError::Decode(format!(
                    "TIFF page {}: {}",
                    pages.len() + 1,
                    e
                )))
            }
        }
    }

    Ok(pages)
}

fn read_tiff_page<R: Read + Seek>(decoder: &mut TiffDecoder<R>) -> Result<DynamicImage, String> {
    let (width, height) = decoder.dimensions().map_err(|e| e.to_string())?;
    let color = decoder.colortype().map_err(|e| e.to_string())?;
    let data = decoder.read_image().map_err(|e| e.to_string())?;

    let image = match (color, data) {
        (ColorType::Gray(bits @ (1 | 2 | 4)), DecodingResult::U8(buf)) => {
            image::GrayImage::from_raw(width, height, unpack_gray(&buf, width, bits))
                .map(DynamicImage::ImageLuma8)
        }
        (ColorType::Gray(8), DecodingResult::U8(buf)) => {
            image::GrayImage::from_raw(width, height, buf).map(DynamicImage::ImageLuma8)
        }
        (
            ColorType::GrayA(8)
            | ColorType::Multiband {
                bit_depth: 8,
                num_samples: 2,
            },
            DecodingResult::U8(buf),
        ) => image::GrayAlphaImage::from_raw(width, height, buf).map(DynamicImage::ImageLumaA8),
        (ColorType::RGB(8), DecodingResult::U8(buf)) => {
            image::RgbImage::from_raw(width, height, buf).map(DynamicImage::ImageRgb8)
        }
        (ColorType::RGBA(8), DecodingResult::U8(buf)) => {
            image::RgbaImage::from_raw(width, height, buf).map(DynamicImage::ImageRgba8)
        }
        (ColorType::CMYK(8), DecodingResult::U8(buf)) => {
            let rgb = buf.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            image::RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        (ColorType::Gray(16), DecodingResult::U16(buf)) => {
            image::ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageLuma16)
        }
        (
            ColorType::GrayA(16)
            | ColorType::Multiband {
                bit_depth: 16,
                num_samples: 2,
            },
            DecodingResult::U16(buf),
        ) => image::ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageLumaA16),
        (ColorType::RGB(16), DecodingResult::U16(buf)) => {
            image::ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageRgb16)
        }
        (ColorType::RGBA(16), DecodingResult::U16(buf)) => {
            image::ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageRgba16)
        }
        (other, _) => return Err(format!("unsupported TIFF color type {:?}", other)),
    };

    image.ok_or_else(|| "TIFF buffer does not match its dimensions".to_string())
}

/// Expand packed 1, 2 or 4 bit gray rows to one byte per pixel
///
/// Rows start on byte boundaries. Values are scaled to 0..=255; the tiff
/// decoder has already flipped WhiteIsZero data to black-is-zero.
fn unpack_gray(packed: &[u8], width: u32, bits: u8) -> Vec<u8> {
    let width = width as usize;
    let bits = usize::from(bits);
    let row_bytes = (width * bits).div_ceil(8).max(1);
    let mask = ((1u16 << bits) - 1) as u8;
    let scale = 255 / mask;

    let mut out = Vec::with_capacity(width * (packed.len() / row_bytes));
    for row in packed.chunks_exact(row_bytes) {
        for x in 0..width {
            let bit = x * bits;
            let shift = 8 - bits - bit % 8;
            out.push(((row[bit / 8] >> shift) & mask) * scale);
        }
    }
    out
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 1.0 - f32::from(cmyk[3]) / 255.0;
    [
        ((255.0 - f32::from(cmyk[0])) * k) as u8,
        ((255.0 - f32::from(cmyk[1])) * k) as u8,
        ((255.0 - f32::from(cmyk[2])) * k) as u8,
    ]
}
