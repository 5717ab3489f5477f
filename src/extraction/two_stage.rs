// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Two-stage extraction: OCR/document intelligence, then a language model

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::fields::{parse_field_response, FieldExtractor};
use super::language_model::LanguageModel;
use super::prompt::{DefaultExtractionPrompt, ExtractionPrompt};
use super::text::TextExtractor;
use super::types::{ExtractionError, FieldResult, ModelSettings};
use crate::document::PageImage;

/// Composes a text extractor and a language model
///
/// Text extraction is delegated as-is. Field extraction is one model call
/// per request; a failed call or unusable answer yields all-`None` fields.
pub struct TwoStageExtractor {
    text: Arc<dyn TextExtractor>,
    model: Arc<dyn LanguageModel>,
    prompt: Arc<dyn ExtractionPrompt>,
    settings: ModelSettings,
}

impl TwoStageExtractor {
    pub fn new(text: Arc<dyn TextExtractor>, model: Arc<dyn LanguageModel>) -> Self {
        info!(
            "Two-stage extractor: {} + {}",
            text.name(),
            model.name()
        );
        Self {
            text,
            model,
            prompt: Arc::new(DefaultExtractionPrompt),
            settings: ModelSettings::default(),
        }
    }

    /// Replace the instruction prompt
    pub fn with_prompt(mut self, prompt: Arc<dyn ExtractionPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Replace the decoding settings
    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }
}

#[async_trait]
impl TextExtractor for TwoStageExtractor {
    async fn extract_text(&self, images: &[PageImage]) -> Result<String, ExtractionError> {
        self.text.extract_text(images).await
    }

    fn name(&self) -> &'static str {
        self.text.name()
    }
}

#[async_trait]
impl FieldExtractor for TwoStageExtractor {
    async fn extract_fields(
        &self,
        text: &str,
        fields: &[String],
    ) -> Result<FieldResult, ExtractionError> {
        let messages = self.prompt.messages(fields, Some(text));
        debug!(
            "Requesting {} field(s) from {} ({} characters of text)",
            fields.len(),
            self.model.name(),
            text.len()
        );

        match self.model.complete(&messages, &self.settings).await {
            Ok(response) => Ok(parse_field_response(response, fields)),
            Err(e) => {
                warn!("Field extraction model call failed: {}", e);
                Ok(FieldResult::all_null(fields))
            }
        }
    }
}
