// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document-level barcode helpers over multi-page input

use docflow::analyzer::{extract_codes, extract_codes_decoded};
use docflow::document::{DocumentError, FileNormalizer, PdfBackend};
use image::{imageops, DynamicImage, GrayImage, Luma};
use qrcode::QrCode;
use std::io::Cursor;
use std::sync::Arc;
use tiff::encoder::{colortype, TiffEncoder};

struct NoPdf;

impl PdfBackend for NoPdf {
    fn page_texts(&self, _bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
        Err(DocumentError::PdfBackend("not expected".to_string()))
    }

    fn render_pages(&self, _bytes: &[u8], _dpi: u32) -> Result<Vec<DynamicImage>, DocumentError> {
        Err(DocumentError::PdfBackend("not expected".to_string()))
    }
}

/// White page with one QR code per payload, laid out left to right
fn page(payloads: &[&str]) -> GrayImage {
    let codes: Vec<GrayImage> = payloads
        .iter()
        .map(|p| QrCode::new(p.as_bytes()).unwrap().render::<Luma<u8>>().build())
        .collect();
    let width = codes.iter().map(|c| c.width() + 40).sum::<u32>().max(200);
    let height = codes.iter().map(|c| c.height()).max().unwrap_or(0) + 80;

    let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));
    let mut x = 20i64;
    for code in &codes {
        imageops::overlay(&mut canvas, code, x, 40);
        x += code.width() as i64 + 40;
    }
    canvas
}

fn tiff(pages: &[GrayImage]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut out).unwrap();
        for page in pages {
            encoder
                .write_image::<colortype::Gray8>(page.width(), page.height(), page.as_raw())
                .unwrap();
        }
    }
    out.into_inner()
}

fn normalizer() -> FileNormalizer {
    FileNormalizer::new(Arc::new(NoPdf))
}

#[test]
fn test_codes_across_pages_in_page_order() {
    let bytes = tiff(&[page(&["page-1"]), page(&[]), page(&["page-3"])]);

    let crops = extract_codes(&normalizer(), bytes.clone()).unwrap();
    assert_eq!(crops.len(), 2);

    let payloads = extract_codes_decoded(&normalizer(), bytes).unwrap();
    assert_eq!(payloads, vec!["page-1", "page-3"]);
}

#[test]
fn test_every_code_on_a_page_is_decoded() {
    let bytes = tiff(&[page(&["left", "right"])]);

    let mut payloads = extract_codes_decoded(&normalizer(), bytes).unwrap();
    payloads.sort();
    assert_eq!(payloads, vec!["left", "right"]);
}

#[test]
fn test_document_without_codes() {
    let bytes = tiff(&[page(&[]), page(&[])]);
    assert!(extract_codes(&normalizer(), bytes.clone()).unwrap().is_empty());
    assert!(extract_codes_decoded(&normalizer(), bytes).unwrap().is_empty());
}
