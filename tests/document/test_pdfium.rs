// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PDFium-backed text layers and rendering
//!
//! Needs the PDFium shared library (PDFIUM_LIBRARY_PATH or the system
//! search path). Run with `cargo test -- --ignored`.

use docflow::document::{DocumentError, PdfBackend, PdfiumBackend};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One US-letter page per entry; empty entries produce pages without text
fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn backend() -> PdfiumBackend {
    match std::env::var("PDFIUM_LIBRARY_PATH") {
        Ok(dir) => PdfiumBackend::with_library_dir(dir),
        Err(_) => PdfiumBackend::new(),
    }
}

#[test]
#[ignore = "requires the PDFium shared library"]
fn test_text_layer_per_page() {
    let bytes = text_pdf(&["Invoice Total: $42.00", ""]);
    let texts = backend().page_texts(&bytes).unwrap();

    assert_eq!(texts.len(), 2);
    assert!(texts[0].contains("Invoice Total: $42.00"));
    assert!(texts[1].trim().is_empty());
}

#[test]
#[ignore = "requires the PDFium shared library"]
fn test_render_scales_with_dpi() {
    let bytes = text_pdf(&["page one", "page two", "page three"]);
    let backend = backend();

    let pages = backend.render_pages(&bytes, 72).unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!((pages[0].width(), pages[0].height()), (612, 792));

    let pages = backend.render_pages(&bytes, 144).unwrap();
    assert_eq!((pages[0].width(), pages[0].height()), (1224, 1584));

    assert_eq!(backend.page_count(&bytes).unwrap(), 3);
}

#[test]
#[ignore = "requires the PDFium shared library"]
fn test_invalid_pdf_is_decode_error() {
    let err = backend().page_texts(b"%PDF-1.7 truncated").unwrap_err();
    assert!(matches!(err, DocumentError::Decode(_)));
}
