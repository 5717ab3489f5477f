// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pixel crops from normalized boxes

use crate::document::{NormalizedBox, PageImage};

/// Crops page regions described by normalized boxes
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionCropper;

impl RegionCropper {
    pub fn new() -> Self {
        Self
    }

    /// One crop per box, in input order
    ///
    /// Out-of-range and inverted boxes are clamped to the page and may
    /// produce zero-area crops; this never fails.
    pub fn crop(&self, page: &PageImage, boxes: &[NormalizedBox]) -> Vec<PageImage> {
        let (width, height) = page.dimensions();
        boxes
            .iter()
            .map(|bbox| page.crop_rect(bbox.to_pixel_rect(width, height)))
            .collect()
    }

    /// Crop a single box
    pub fn crop_one(&self, page: &PageImage, bbox: &NormalizedBox) -> PageImage {
        let (width, height) = page.dimensions();
        page.crop_rect(bbox.to_pixel_rect(width, height))
    }
}
