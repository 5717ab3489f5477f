// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-document text strategy selection

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::{DocumentError, LoadedDocument, PdfBackend, SourceKind};

/// How a document's text is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// PDF where at least one page has a non-empty text layer
    PdfWithText,
    /// PDF without any usable text layer
    PdfScanned,
    /// Plain UTF-8 text
    TextFile,
    /// Raster image or anything else read through OCR
    ImageOrOther,
}

impl FileKind {
    /// True when text comes from OCR over page images
    pub fn needs_ocr(&self) -> bool {
        matches!(self, FileKind::PdfScanned | FileKind::ImageOrOther)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::PdfWithText => "pdf_with_text",
            FileKind::PdfScanned => "pdf_scanned",
            FileKind::TextFile => "text_file",
            FileKind::ImageOrOther => "image_or_other",
        };
        f.write_str(name)
    }
}

/// File kind plus the PDF text layer read while deciding it
#[derive(Debug, Clone)]
pub struct Classification {
    pub kind: FileKind,
    /// Page texts in page order, present for PDFs
    pub text_layer: Option<Vec<String>>,
}

impl Classification {
    /// Native text of a PDF with a text layer, newline-joined in page order
    pub fn native_text(&self) -> Option<String> {
        match (self.kind, &self.text_layer) {
            (FileKind::PdfWithText, Some(pages)) => Some(pages.join("\n")),
            _ => None,
        }
    }
}

/// Classify a loaded document
///
/// PDFs are opened and count as having text when any page's text layer
/// holds something other than whitespace.
pub fn classify(
    document: &LoadedDocument,
    pdf: &dyn PdfBackend,
) -> Result<Classification, DocumentError> {
    match document.kind() {
        SourceKind::Pdf => {
            let pages = pdf.page_texts(document.bytes())?;
            let kind = if pages.iter().any(|text| !text.trim().is_empty()) {
                FileKind::PdfWithText
            } else {
                FileKind::PdfScanned
            };
            Ok(Classification {
                kind,
                text_layer: Some(pages),
            })
        }
        SourceKind::Text => Ok(Classification {
            kind: FileKind::TextFile,
            text_layer: None,
        }),
        SourceKind::Raster(_) => Ok(Classification {
            kind: FileKind::ImageOrOther,
            text_layer: None,
        }),
    }
}
