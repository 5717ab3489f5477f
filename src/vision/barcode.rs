// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! QR code detection and decoding
//!
//! Detection runs on a luminance copy of the page, so the page's own
//! channel order never changes; crops are cut from the original page.
//! A white quiet zone is added around the luminance copy because tight
//! crops (code edge touching image edge) are otherwise not found.

use image::{GrayImage, Luma};
use tracing::{debug, warn};

use crate::document::{PageImage, PixelRect};

/// Minimum quiet zone, in pixels, added on every side before detection
const MIN_QUIET_ZONE: u32 = 16;

/// A code located on a page
#[derive(Debug, Clone)]
pub struct DetectedCode {
    /// Axis-aligned bounds of the code's outline, in page pixels
    pub bounds: PixelRect,
    /// Decoded payload, `None` when the grid was found but could not be read
    pub payload: Option<String>,
}

/// Finds and reads QR codes on page images
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeScanner;

impl CodeScanner {
    pub fn new() -> Self {
        Self
    }

    /// Payload of the first code that decodes, if any
    pub fn decode(&self, image: &PageImage) -> Option<String> {
        self.scan(image)
            .into_iter()
            .find_map(|code| code.payload)
    }

    /// One crop per detected code, bounded by the min/max of its outline
    pub fn detect_and_crop(&self, image: &PageImage) -> Vec<PageImage> {
        self.scan(image)
            .into_iter()
            .filter(|code| !code.bounds.is_empty())
            .map(|code| image.crop_rect(code.bounds))
            .collect()
    }

    /// Locate every code on the page, decoding each where possible
    pub fn scan(&self, image: &PageImage) -> Vec<DetectedCode> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let margin = MIN_QUIET_ZONE.max(width.min(height) / 10);
        let padded = with_quiet_zone(&image.image().to_luma8(), margin);

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            padded.width() as usize,
            padded.height() as usize,
            |x, y| padded.get_pixel(x as u32, y as u32).0[0],
        );

        let codes: Vec<DetectedCode> = prepared
            .detect_grids()
            .into_iter()
            .map(|grid| {
                let bounds = outline_bounds(&grid.bounds, margin, width, height);
                let payload = match grid.decode() {
                    Ok((_, content)) => Some(content),
                    Err(e) => {
                        warn!("QR grid found but could not be decoded: {:?}", e);
                        None
                    }
                };
                DetectedCode { bounds, payload }
            })
            .collect();

        debug!("Found {} QR code(s) on {}x{} page", codes.len(), width, height);
        codes
    }
}

fn with_quiet_zone(luma: &GrayImage, margin: u32) -> GrayImage {
    let mut padded = GrayImage::from_pixel(
        luma.width() + 2 * margin,
        luma.height() + 2 * margin,
        Luma([255]),
    );
    image::imageops::replace(&mut padded, luma, margin as i64, margin as i64);
    padded
}

/// Axis-aligned box over the outline's corners, shifted back to page
/// coordinates and clamped to the page
fn outline_bounds(corners: &[rqrr::Point; 4], margin: u32, width: u32, height: u32) -> PixelRect {
    let shift = |v: i32, limit: u32| -> u32 { (v - margin as i32).clamp(0, limit as i32) as u32 };

    let xs = corners.iter().map(|p| shift(p.x, width));
    let ys = corners.iter().map(|p| shift(p.y, height));

    let left = xs.clone().min().unwrap_or(0);
    let right = xs.max().unwrap_or(0);
    let top = ys.clone().min().unwrap_or(0);
    let bottom = ys.max().unwrap_or(0);

    PixelRect {
        left,
        top,
        right,
        bottom,
    }
}
