// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use thiserror::Error;

use crate::document::DocumentError;
use crate::extraction::ExtractionError;
use crate::segmentation::SegmentationError;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Segmentation(#[from] SegmentationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Page extraction task failed: {0}")]
    TaskFailed(String),
}

impl AnalyzerError {
    /// True for inputs the pipeline cannot read at all
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AnalyzerError::Document(
                DocumentError::UnsupportedInputKind { .. } | DocumentError::Decode(_)
            )
        )
    }
}
