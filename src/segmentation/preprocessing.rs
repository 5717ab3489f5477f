// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Letterbox preprocessing for YOLO-family layout detectors

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size for layout detectors
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Padding colour used by ultralytics letterboxing
const PAD_VALUE: u8 = 114;

/// Geometry of a letterbox transform, used to map boxes back to the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Resize factor applied to the page
    pub scale: f32,
    /// Horizontal padding on the left, in input pixels
    pub pad_x: f32,
    /// Vertical padding on the top, in input pixels
    pub pad_y: f32,
    /// Original page width
    pub page_width: u32,
    /// Original page height
    pub page_height: u32,
}

impl Letterbox {
    /// Map an input-space x coordinate to a fraction of page width
    pub fn normalize_x(&self, x: f32) -> f32 {
        (((x - self.pad_x) / self.scale) / self.page_width.max(1) as f32).clamp(0.0, 1.0)
    }

    /// Map an input-space y coordinate to a fraction of page height
    pub fn normalize_y(&self, y: f32) -> f32 {
        (((y - self.pad_y) / self.scale) / self.page_height.max(1) as f32).clamp(0.0, 1.0)
    }
}

/// Preprocess a page for detection
///
/// Steps:
/// 1. Resize with aspect ratio preservation to fit `input_size`
/// 2. Pad to square with gray (114), page centred
/// 3. Scale pixels to [0, 1]
/// 4. Convert to NCHW tensor format [1, 3, S, S]
pub fn letterbox(image: &DynamicImage, input_size: u32) -> (Array4<f32>, Letterbox) {
    let (page_width, page_height) = image.dimensions();
    let size = input_size as usize;

    let scale = if page_width == 0 || page_height == 0 {
        1.0
    } else {
        (input_size as f32 / page_width as f32).min(input_size as f32 / page_height as f32)
    };

    let new_w = ((page_width as f32 * scale).round() as u32).clamp(1, input_size);
    let new_h = ((page_height as f32 * scale).round() as u32).clamp(1, input_size);
    let offset_x = (input_size - new_w) / 2;
    let offset_y = (input_size - new_h) / 2;

    let mut canvas = RgbImage::from_pixel(input_size, input_size, Rgb([PAD_VALUE; 3]));
    if page_width > 0 && page_height > 0 {
        let resized = image
            .resize_exact(new_w, new_h, image::imageops::FilterType::Triangle)
            .to_rgb8();
        image::imageops::replace(&mut canvas, &resized, offset_x as i64, offset_y as i64);
    }

    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    let geometry = Letterbox {
        scale,
        pad_x: offset_x as f32,
        pad_y: offset_y as f32,
        page_width,
        page_height,
    };

    (tensor, geometry)
}
