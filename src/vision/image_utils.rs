// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image format sniffing and transport encoding helpers

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::document::PageImage;

/// Formats re-encoded as-is when a page is shipped to a remote backend.
/// Anything else (including crops, which carry no format) goes out as PNG.
const TRANSPORT_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::Gif,
];

/// Detect image format from magic bytes
///
/// Recognises every signature the `image` decoders know (PNG, JPEG, GIF,
/// WebP, TIFF, BMP, PNM, QOI, ...). TGA has no signature and is never
/// detected.
///
/// # Returns
/// * `Some(ImageFormat)` - Detected format
/// * `None` - If the leading bytes match no supported raster format
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Check if bytes start with the PDF magic header
pub fn is_pdf_bytes(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Get the format extension as a string
pub fn format_to_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        _ => "unknown",
    }
}

/// Encode a page for transport, keeping its native encoding when known
///
/// # Returns
/// The encoded bytes and the format actually used.
pub fn encode_page(page: &PageImage) -> Result<(Vec<u8>, ImageFormat), image::ImageError> {
    let format = page
        .format()
        .filter(|f| TRANSPORT_FORMATS.contains(f))
        .unwrap_or(ImageFormat::Png);

    // JPEG has no alpha channel; the encoder rejects RGBA input
    let encodable = match (format, page.image()) {
        (ImageFormat::Jpeg, img) if img.color().has_alpha() => {
            DynamicImage::ImageRgb8(img.to_rgb8())
        }
        (_, img) => img.clone(),
    };

    let mut buffer = Cursor::new(Vec::new());
    encodable.write_to(&mut buffer, format)?;
    Ok((buffer.into_inner(), format))
}
