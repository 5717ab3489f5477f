// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod document;
pub mod extraction;
pub mod segmentation;
pub mod vision;

// Re-export the pipeline surface
pub use analyzer::{AnalyzerError, DocumentAnalyzer, FileKind, ImagePreprocessor};
pub use config::DocflowConfig;
pub use document::{
    DocumentError, DocumentHandle, FileNormalizer, NormalizedBox, PageImage, PdfBackend,
};
pub use extraction::{
    ExtractionError, FieldExtractor, FieldResult, FieldValue, LanguageModel, TextExtractor,
    TwoStageExtractor,
};
pub use segmentation::{
    ClassId, LabelTable, SegmentationError, SegmentationModel, SegmentationResult,
};
pub use vision::{CodeScanner, RegionCropper};
