// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text extraction backends (OCR and document intelligence)

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::types::ExtractionError;
use crate::document::PageImage;

/// Trait for implementing text extraction backends
///
/// One call may receive several images (typically the frames of one page)
/// and returns their joined text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from a batch of images
    ///
    /// # Arguments
    /// * `images` - Page images to read, in order
    ///
    /// # Returns
    /// The joined text (empty when nothing was read) or a backend error
    async fn extract_text(&self, images: &[PageImage]) -> Result<String, ExtractionError>;

    /// Get the backend name for logging
    fn name(&self) -> &'static str;
}

/// In-process OCR model
///
/// Calls are synchronous; [`LocalOcrExtractor`] moves them onto the
/// blocking thread pool.
pub trait OcrModel: Send + Sync + 'static {
    fn recognize(&self, image: &PageImage) -> Result<String, ExtractionError>;
}

/// Text extractor passing each image straight to a local OCR model
pub struct LocalOcrExtractor<M> {
    model: Arc<M>,
}

impl<M: OcrModel> LocalOcrExtractor<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

#[async_trait]
impl<M: OcrModel> TextExtractor for LocalOcrExtractor<M> {
    async fn extract_text(&self, images: &[PageImage]) -> Result<String, ExtractionError> {
        let mut texts = Vec::with_capacity(images.len());

        for image in images {
            let model = Arc::clone(&self.model);
            let image = image.clone();
            let text = tokio::task::spawn_blocking(move || model.recognize(&image))
                .await
                .map_err(|e| ExtractionError::backend("local-ocr", e))??;
            texts.push(text);
        }

        debug!("Local OCR read {} image(s)", texts.len());
        Ok(texts.join("\n"))
    }

    fn name(&self) -> &'static str {
        "local-ocr"
    }
}
