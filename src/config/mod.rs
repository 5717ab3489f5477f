// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide configuration assembled from environment variables

use std::env;
use std::sync::Arc;

use crate::document::{FileNormalizer, PdfiumBackend, DEFAULT_PDF_DPI};
use crate::extraction::{CommandOcrModel, DocumentIntelligenceConfig, LanguageModelConfig};
use crate::segmentation::SegmentationConfig;

/// Configuration for every pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub struct DocflowConfig {
    /// PDF rasterization resolution
    pub pdf_dpi: u32,
    /// Directory holding the PDFium shared library; system search path when unset
    pub pdfium_library_path: Option<String>,
    /// Local OCR command line, `{image}` marks the input path
    pub ocr_command: String,
    pub segmentation: SegmentationConfig,
    pub document_intelligence: DocumentIntelligenceConfig,
    pub llm: LanguageModelConfig,
}

impl DocflowConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            pdf_dpi: env::var("DOCFLOW_PDF_DPI")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.pdf_dpi),
            pdfium_library_path: env::var("PDFIUM_LIBRARY_PATH").ok(),
            ocr_command: env::var("DOCFLOW_OCR_COMMAND").unwrap_or(defaults.ocr_command),
            segmentation: SegmentationConfig::from_env(),
            document_intelligence: DocumentIntelligenceConfig::from_env(),
            llm: LanguageModelConfig::from_env(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.pdf_dpi == 0 {
            return Err("DOCFLOW_PDF_DPI must be greater than 0".to_string());
        }
        if self.ocr_command.trim().is_empty() {
            return Err("DOCFLOW_OCR_COMMAND must not be empty".to_string());
        }
        self.segmentation.validate()?;
        self.document_intelligence.validate()?;
        self.llm.validate()?;
        Ok(())
    }

    /// Normalizer bound to the configured PDFium location and DPI
    pub fn normalizer(&self) -> FileNormalizer {
        let backend = match &self.pdfium_library_path {
            Some(dir) => PdfiumBackend::with_library_dir(dir),
            None => PdfiumBackend::new(),
        };
        FileNormalizer::new(Arc::new(backend)).with_dpi(self.pdf_dpi)
    }

    /// Local OCR program from `ocr_command`
    pub fn ocr_model(&self) -> Option<CommandOcrModel> {
        CommandOcrModel::from_command_line(&self.ocr_command)
    }
}

impl Default for DocflowConfig {
    fn default() -> Self {
        Self {
            pdf_dpi: DEFAULT_PDF_DPI,
            pdfium_library_path: None,
            ocr_command: "tesseract".to_string(),
            segmentation: SegmentationConfig::default(),
            document_intelligence: DocumentIntelligenceConfig::default(),
            llm: LanguageModelConfig::default(),
        }
    }
}
