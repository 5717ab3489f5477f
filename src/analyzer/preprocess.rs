// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caller-supplied page preprocessing

use crate::document::PageImage;

/// Transforms normalized pages before segmentation and OCR
///
/// Closures `Fn(Vec<PageImage>) -> Vec<PageImage>` implement this too.
pub trait ImagePreprocessor: Send + Sync {
    fn preprocess(&self, pages: Vec<PageImage>) -> Vec<PageImage>;
}

/// Returns pages unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPreprocessor;

impl ImagePreprocessor for IdentityPreprocessor {
    fn preprocess(&self, pages: Vec<PageImage>) -> Vec<PageImage> {
        pages
    }
}

impl<F> ImagePreprocessor for F
where
    F: Fn(Vec<PageImage>) -> Vec<PageImage> + Send + Sync,
{
    fn preprocess(&self, pages: Vec<PageImage>) -> Vec<PageImage> {
        self(pages)
    }
}
