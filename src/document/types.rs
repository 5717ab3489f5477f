// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types shared by the document pipeline

use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while turning a document handle into pages or text
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The handle does not name something the pipeline can read
    #[error("Unsupported input kind: {kind}")]
    UnsupportedInputKind {
        /// Description of the rejected input (extension, path type, ...)
        kind: String,
    },

    /// Content is neither a valid PDF nor a decodable raster image
    #[error("Failed to decode document: {0}")]
    Decode(String),

    /// The PDF backend could not be initialised or failed mid-render
    #[error("PDF backend error: {0}")]
    PdfBackend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One rasterized page or frame of a document
///
/// Pages are never mutated after creation; cropping produces a new
/// `PageImage` that carries no source format.
#[derive(Debug, Clone)]
pub struct PageImage {
    image: DynamicImage,
    format: Option<ImageFormat>,
}

impl PageImage {
    /// Wrap a decoded image whose source encoding is unknown
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            format: None,
        }
    }

    /// Wrap a decoded image and remember the format it was decoded from
    pub fn with_format(image: DynamicImage, format: ImageFormat) -> Self {
        Self {
            image,
            format: Some(format),
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    /// Encoding the page was decoded from, if known
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Copy out a pixel rectangle; the caller guarantees it lies inside the page
    pub(crate) fn crop_rect(&self, rect: PixelRect) -> PageImage {
        PageImage::new(
            self.image
                .crop_imm(rect.left, rect.top, rect.width(), rect.height()),
        )
    }
}

impl From<DynamicImage> for PageImage {
    fn from(image: DynamicImage) -> Self {
        PageImage::new(image)
    }
}

/// Bounding box in fractional coordinates relative to page width/height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl NormalizedBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box clamped into the unit square with ordered corners
    pub fn clamped(&self) -> Self {
        let x1 = self.x1.clamp(0.0, 1.0);
        let y1 = self.y1.clamp(0.0, 1.0);
        Self {
            x1,
            y1,
            x2: self.x2.clamp(0.0, 1.0).max(x1),
            y2: self.y2.clamp(0.0, 1.0).max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Convert to absolute pixel coordinates on a `width` x `height` page
    ///
    /// Every coordinate is clamped into `[0, dimension]`, then `right >= left`
    /// and `bottom >= top` are enforced, so degenerate or out-of-range boxes
    /// collapse to zero-area rectangles instead of failing.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> PixelRect {
        let (w, h) = (width as f32, height as f32);

        let left = scale_and_clamp(self.x1, w);
        let top = scale_and_clamp(self.y1, h);
        let right = scale_and_clamp(self.x2, w).max(left);
        let bottom = scale_and_clamp(self.y2, h).max(top);

        PixelRect {
            left,
            top,
            right,
            bottom,
        }
    }
}

impl From<[f32; 4]> for NormalizedBox {
    fn from(coords: [f32; 4]) -> Self {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }
}

fn scale_and_clamp(fraction: f32, dimension: f32) -> u32 {
    // f32::max/min drop NaN operands, so a NaN coordinate lands on a bound
    let pixels = (fraction * dimension).round().min(dimension).max(0.0);
    pixels as u32
}

/// Pixel rectangle with `left <= right` and `top <= bottom`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}
