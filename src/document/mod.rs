// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document intake
//!
//! Accepts paths, byte buffers and seekable streams, and turns them into:
//! - an ordered sequence of page images (PDF pages, TIFF/GIF frames, single rasters)
//! - the native text layer of PDFs, without rasterizing
//! - the UTF-8 content of plain text files

pub mod handle;
pub mod normalizer;
pub mod pdf;
pub mod types;

pub use handle::{DocumentHandle, LoadedDocument, ReadSeek, SourceKind};
pub use normalizer::{FileNormalizer, DEFAULT_PDF_DPI};
pub use pdf::{PdfBackend, PdfiumBackend};
pub use types::{DocumentError, NormalizedBox, PageImage, PixelRect};
