// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text and structured field extraction
//!
//! Provides:
//! - `TextExtractor` backends: local OCR models (in-process or an external
//!   program) and a remote document-intelligence service
//! - `FieldExtractor` backends turning free text into requested fields
//!   through a language model, tolerant of malformed model output
//! - `TwoStageExtractor` composing both stages

pub mod command_ocr;
pub mod document_intelligence;
pub mod fields;
pub mod language_model;
pub mod prompt;
pub mod text;
pub mod two_stage;
pub mod types;

pub use command_ocr::CommandOcrModel;
pub use document_intelligence::{
    DocumentIntelligenceClient, DocumentIntelligenceConfig, DocumentIntelligenceExtractor,
};
pub use fields::{parse_field_response, strip_code_fence, FieldExtractor};
pub use language_model::{ChatCompletionsModel, LanguageModel, LanguageModelConfig};
pub use prompt::{DefaultExtractionPrompt, ExtractionPrompt};
pub use text::{LocalOcrExtractor, OcrModel, TextExtractor};
pub use two_stage::TwoStageExtractor;
pub use types::{
    ChatMessage, ExtractionError, FieldResult, FieldValue, ModelResponse, ModelSettings,
};
