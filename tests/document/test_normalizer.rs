// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page normalization for rasters, multi-page TIFFs and PDFs

use docflow::document::{DocumentError, DocumentHandle, FileNormalizer, PdfBackend};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use tiff::encoder::{colortype, TiffEncoder};

/// PDF backend rendering `pages` blank pages sized by the requested DPI
struct FakePdf {
    pages: usize,
    seen_dpi: Mutex<Vec<u32>>,
}

impl FakePdf {
    fn new(pages: usize) -> Self {
        Self {
            pages,
            seen_dpi: Mutex::new(Vec::new()),
        }
    }
}

impl PdfBackend for FakePdf {
    fn page_texts(&self, _bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
        Ok(vec![String::new(); self.pages])
    }

    fn render_pages(&self, _bytes: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, DocumentError> {
        self.seen_dpi.lock().unwrap().push(dpi);
        // US letter at the requested resolution
        let (w, h) = (85 * dpi / 10, 11 * dpi);
        Ok((0..self.pages)
            .map(|_| DynamicImage::new_rgb8(w, h))
            .collect())
    }
}

fn normalizer() -> FileNormalizer {
    FileNormalizer::new(Arc::new(FakePdf::new(0)))
}

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 10, 10])));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

fn tiff_pages(sizes: &[(u32, u32)]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut out).unwrap();
        for (index, (w, h)) in sizes.iter().enumerate() {
            let shade = (index as u8).wrapping_mul(40);
            let data = vec![shade; (*w * *h * 3) as usize];
            encoder
                .write_image::<colortype::RGB8>(*w, *h, &data)
                .unwrap();
        }
    }
    out.into_inner()
}

/// One uncompressed single-strip gray directory
struct RawPage {
    width: u32,
    height: u32,
    bits: u16,
    /// 0 = WhiteIsZero, 1 = BlackIsZero
    photometric: u16,
    data: Vec<u8>,
    /// Strip offset override, for pages whose data cannot be read
    strip_offset: Option<u32>,
}

impl RawPage {
    fn gray(width: u32, height: u32, bits: u16, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            bits,
            photometric: 1,
            data,
            strip_offset: None,
        }
    }
}

/// Little-endian TIFF with one directory per page
fn raw_tiff(pages: &[RawPage]) -> Vec<u8> {
    let mut out = vec![b'I', b'I', 42, 0, 0, 0, 0, 0];
    let mut link = 4;

    for page in pages {
        let data_offset = out.len() as u32;
        out.extend_from_slice(&page.data);
        if out.len() % 2 == 1 {
            out.push(0);
        }

        let ifd_offset = out.len() as u32;
        out[link..link + 4].copy_from_slice(&ifd_offset.to_le_bytes());

        // (tag, type, value); type 3 = SHORT, 4 = LONG
        let entries: [(u16, u16, u32); 9] = [
            (256, 4, page.width),
            (257, 4, page.height),
            (258, 3, u32::from(page.bits)),
            (259, 3, 1),
            (262, 3, u32::from(page.photometric)),
            (273, 4, page.strip_offset.unwrap_or(data_offset)),
            (277, 3, 1),
            (278, 4, page.height),
            (279, 4, page.data.len() as u32),
        ];
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, kind, value) in entries {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&kind.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes());
            if kind == 3 {
                out.extend_from_slice(&(value as u16).to_le_bytes());
                out.extend_from_slice(&[0, 0]);
            } else {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }

        link = out.len();
        out.extend_from_slice(&0u32.to_le_bytes());
    }
    out
}

fn luma(page: &docflow::PageImage, x: u32, y: u32) -> u8 {
    page.image().to_luma8().get_pixel(x, y).0[0]
}

#[test]
fn test_single_frame_formats_keep_size_and_format() {
    for format in [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Bmp,
        ImageFormat::WebP,
    ] {
        let pages = normalizer()
            .normalize(encoded(64, 40, format))
            .unwrap_or_else(|e| panic!("{:?}: {}", format, e));

        assert_eq!(pages.len(), 1, "{:?}", format);
        assert_eq!(pages[0].dimensions(), (64, 40), "{:?}", format);
        assert_eq!(pages[0].format(), Some(format));
    }
}

#[test]
fn test_multi_page_tiff_yields_every_page() {
    let bytes = tiff_pages(&[(30, 20), (40, 25), (50, 30)]);
    let pages = normalizer().normalize(bytes.clone()).unwrap();

    let sizes: Vec<(u32, u32)> = pages.iter().map(|p| p.dimensions()).collect();
    assert_eq!(sizes, vec![(30, 20), (40, 25), (50, 30)]);
    assert!(pages.iter().all(|p| p.format() == Some(ImageFormat::Tiff)));
    assert_eq!(normalizer().page_count(bytes).unwrap(), 3);
}

#[test]
fn test_tiff_from_path_and_stream() {
    let bytes = tiff_pages(&[(10, 10), (12, 12)]);

    let mut file = tempfile::Builder::new().suffix(".tif").tempfile().unwrap();
    file.write_all(&bytes).unwrap();
    assert_eq!(normalizer().normalize(file.path()).unwrap().len(), 2);

    let mut cursor = Cursor::new(bytes);
    cursor.set_position(7);
    let pages = normalizer()
        .normalize(DocumentHandle::from_reader(cursor))
        .unwrap();
    assert_eq!(pages.len(), 2);
}

#[test]
fn test_pdf_pages_rendered_at_configured_dpi() {
    let backend = Arc::new(FakePdf::new(4));
    let normalizer = FileNormalizer::new(backend.clone()).with_dpi(72);

    let pages = normalizer.normalize(b"%PDF-1.7\n".to_vec()).unwrap();
    assert_eq!(pages.len(), 4);
    assert_eq!(pages[0].dimensions(), (612, 792));
    assert!(pages[0].format().is_none());
    assert_eq!(*backend.seen_dpi.lock().unwrap(), vec![72]);

    assert_eq!(normalizer.page_count(b"%PDF-1.7\n".to_vec()).unwrap(), 4);
}

#[test]
fn test_pdf_extension_wins_over_content() {
    let mut file = tempfile::Builder::new().suffix(".PDF").tempfile().unwrap();
    file.write_all(b"not really a pdf").unwrap();

    let normalizer = FileNormalizer::new(Arc::new(FakePdf::new(2)));
    assert_eq!(normalizer.normalize(file.path()).unwrap().len(), 2);
}

#[test]
fn test_unsupported_extension_and_directory() {
    let mut file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
    file.write_all(b"PK\x03\x04").unwrap();
    assert!(matches!(
        normalizer().normalize(file.path()),
        Err(DocumentError::UnsupportedInputKind { .. })
    ));

    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        normalizer().normalize(dir.path()),
        Err(DocumentError::UnsupportedInputKind { .. })
    ));
}

#[test]
fn test_undecodable_bytes_fail_with_decode_error() {
    let mut bytes = encoded(8, 8, ImageFormat::Png);
    bytes.truncate(24);
    assert!(matches!(
        normalizer().normalize(bytes),
        Err(DocumentError::Decode(_))
    ));

    assert!(matches!(
        normalizer().normalize(vec![0u8, 159, 146, 150, 0, 1]),
        Err(DocumentError::Decode(_))
    ));
}

#[test]
fn test_text_documents_have_no_pages() {
    assert!(matches!(
        normalizer().normalize(b"Invoice Total: $42.00".to_vec()),
        Err(DocumentError::Decode(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        normalizer().normalize(dir.path().join("missing.png")),
        Err(DocumentError::Io(_))
    ));
}

#[test]
fn test_bilevel_multi_page_tiff_yields_every_page() {
    // 10 px wide: each 1-bit row is padded to two bytes
    let pages: Vec<RawPage> = (0..3)
        .map(|_| RawPage::gray(10, 2, 1, vec![0b1010_1010, 0b1100_0000, 0x00, 0x00]))
        .collect();
    let bytes = raw_tiff(&pages);

    let pages = normalizer().normalize(bytes.clone()).unwrap();
    assert_eq!(pages.len(), 3);
    assert!(pages.iter().all(|p| p.dimensions() == (10, 2)));

    let first = &pages[0];
    assert_eq!(luma(first, 0, 0), 255);
    assert_eq!(luma(first, 1, 0), 0);
    assert_eq!(luma(first, 8, 0), 255);
    assert_eq!(luma(first, 9, 0), 255);
    assert_eq!(luma(first, 9, 1), 0);

    assert_eq!(normalizer().page_count(bytes).unwrap(), 3);
}

#[test]
fn test_white_is_zero_bilevel_page_is_inverted() {
    let mut page = RawPage::gray(8, 2, 1, vec![0x00, 0xFF]);
    page.photometric = 0;

    let pages = normalizer().normalize(raw_tiff(&[page])).unwrap();
    assert_eq!(luma(&pages[0], 3, 0), 255);
    assert_eq!(luma(&pages[0], 3, 1), 0);
}

#[test]
fn test_four_bit_gray_is_scaled() {
    let pages = normalizer()
        .normalize(raw_tiff(&[RawPage::gray(3, 1, 4, vec![0xF0, 0x80])]))
        .unwrap();

    assert_eq!(luma(&pages[0], 0, 0), 255);
    assert_eq!(luma(&pages[0], 1, 0), 0);
    assert_eq!(luma(&pages[0], 2, 0), 136);
}

#[test]
fn test_mixed_depth_tiff_keeps_later_bilevel_pages() {
    let bytes = raw_tiff(&[
        RawPage::gray(8, 2, 8, vec![128; 16]),
        RawPage::gray(8, 2, 1, vec![0xFF, 0x00]),
        RawPage::gray(8, 2, 1, vec![0x00, 0xFF]),
    ]);

    let pages = normalizer().normalize(bytes).unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(luma(&pages[0], 0, 0), 128);
    assert_eq!(luma(&pages[1], 0, 0), 255);
    assert_eq!(luma(&pages[2], 0, 0), 0);
}

#[test]
fn test_unreadable_later_tiff_page_is_decode_error() {
    let mut broken = RawPage::gray(8, 2, 8, vec![7; 16]);
    broken.strip_offset = Some(1 << 20);
    let bytes = raw_tiff(&[RawPage::gray(8, 2, 8, vec![128; 16]), broken]);

    match normalizer().normalize(bytes) {
        Err(DocumentError::Decode(message)) => assert!(message.contains("page 2"), "{}", message),
        other => panic!("expected decode error, got {:?}", other.map(|p| p.len())),
    }
}

#[test]
fn test_ascii_pnm_bytes_are_an_image() {
    let pages = normalizer()
        .normalize(b"P3\n2 1\n255\n255 0 0 0 0 255\n".to_vec())
        .unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].dimensions(), (2, 1));
    assert_eq!(pages[0].format(), Some(ImageFormat::Pnm));
}

#[test]
fn test_cmyk_tiff_pages_convert_to_rgb() {
    let mut out = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut out).unwrap();
        // pure cyan, then full black
        encoder
            .write_image::<colortype::CMYK8>(2, 2, &[255, 0, 0, 0].repeat(4))
            .unwrap();
        encoder
            .write_image::<colortype::CMYK8>(2, 2, &[0, 0, 0, 255].repeat(4))
            .unwrap();
    }

    let pages = normalizer().normalize(out.into_inner()).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].image().to_rgb8().get_pixel(1, 1).0, [0, 255, 255]);
    assert_eq!(pages[1].image().to_rgb8().get_pixel(0, 0).0, [0, 0, 0]);
}
