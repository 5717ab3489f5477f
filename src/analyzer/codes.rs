// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document-level barcode helpers

use tracing::debug;

use crate::document::{DocumentError, DocumentHandle, FileNormalizer, PageImage};
use crate::vision::CodeScanner;

/// Every barcode crop across all pages, in page order
pub fn extract_codes(
    normalizer: &FileNormalizer,
    handle: impl Into<DocumentHandle>,
) -> Result<Vec<PageImage>, DocumentError> {
    let scanner = CodeScanner::new();
    let crops: Vec<PageImage> = normalizer
        .normalize(handle)?
        .iter()
        .flat_map(|page| scanner.detect_and_crop(page))
        .collect();

    debug!("Found {} barcode region(s)", crops.len());
    Ok(crops)
}

/// Decoded payload of each barcode crop, skipping crops that do not decode
///
/// Crops first so every code on a page is read, not only the first one.
pub fn extract_codes_decoded(
    normalizer: &FileNormalizer,
    handle: impl Into<DocumentHandle>,
) -> Result<Vec<String>, DocumentError> {
    let scanner = CodeScanner::new();
    Ok(extract_codes(normalizer, handle)?
        .iter()
        .filter_map(|crop| scanner.decode(crop))
        .collect())
}
