// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document analysis pipeline
//!
//! `DocumentAnalyzer` ties the stages together:
//! - file kind detection (native PDF text, scanned PDF, text, image)
//! - text assembly with per-page concurrent OCR fallback
//! - structured field extraction
//! - segmentation and region lookup by class id or label
//! - barcode crops and payloads

pub mod codes;
pub mod file_kind;
pub mod pipeline;
pub mod preprocess;
pub mod types;

pub use codes::{extract_codes, extract_codes_decoded};
pub use file_kind::{classify, Classification, FileKind};
pub use pipeline::DocumentAnalyzer;
pub use preprocess::{IdentityPreprocessor, ImagePreprocessor};
pub use types::AnalyzerError;
