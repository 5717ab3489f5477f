// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document handles and their one-time normalization into memory
//!
//! A [`DocumentHandle`] is read exactly once into a [`LoadedDocument`].
//! The source kind is decided at that point (extension for paths, magic
//! bytes otherwise) and every later stage branches on the stored kind.

use image::ImageFormat;
use std::fmt;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::DocumentError;
use crate::vision::image_utils::{detect_format, is_pdf_bytes};

/// Extensions read as plain UTF-8 text
const TEXT_EXTENSIONS: [&str; 4] = ["txt", "text", "md", "csv"];

/// A seekable byte source
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Reference to "a file" in one of three equivalent forms
pub enum DocumentHandle {
    /// Filesystem path; the extension decides the kind
    Path(PathBuf),
    /// In-memory buffer; content is sniffed
    Bytes(Vec<u8>),
    /// Seekable stream at any position; rewound and sniffed
    Stream(Box<dyn ReadSeek + Send>),
}

impl DocumentHandle {
    /// Wrap any seekable reader
    pub fn from_reader<R: Read + Seek + Send + 'static>(reader: R) -> Self {
        DocumentHandle::Stream(Box::new(reader))
    }
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentHandle::Path(path) => f.debug_tuple("Path").field(path).finish(),
            DocumentHandle::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            DocumentHandle::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<PathBuf> for DocumentHandle {
    fn from(path: PathBuf) -> Self {
        DocumentHandle::Path(path)
    }
}

impl From<&Path> for DocumentHandle {
    fn from(path: &Path) -> Self {
        DocumentHandle::Path(path.to_path_buf())
    }
}

impl From<&str> for DocumentHandle {
    fn from(path: &str) -> Self {
        DocumentHandle::Path(PathBuf::from(path))
    }
}

impl From<String> for DocumentHandle {
    fn from(path: String) -> Self {
        DocumentHandle::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for DocumentHandle {
    fn from(bytes: Vec<u8>) -> Self {
        DocumentHandle::Bytes(bytes)
    }
}

impl From<&[u8]> for DocumentHandle {
    fn from(bytes: &[u8]) -> Self {
        DocumentHandle::Bytes(bytes.to_vec())
    }
}

/// What the loaded bytes are, decided once at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Text,
    /// Raster image; format is `None` when neither extension nor magic bytes identify it
    Raster(Option<ImageFormat>),
}

/// A document read fully into memory
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    bytes: Vec<u8>,
    kind: SourceKind,
    name: Option<String>,
}

impl LoadedDocument {
    /// Read a handle into memory and classify it
    ///
    /// Files are opened and streams consumed inside this call only; the
    /// handle is dropped before returning on every path, including errors.
    pub fn load(handle: DocumentHandle) -> Result<Self, DocumentError> {
        match handle {
            DocumentHandle::Path(path) => Self::load_path(&path),
            DocumentHandle::Bytes(bytes) => Ok(Self::from_bytes(bytes, None)),
            DocumentHandle::Stream(mut stream) => {
                stream.seek(SeekFrom::Start(0))?;
                let mut bytes = Vec::new();
                stream.read_to_end(&mut bytes)?;
                Ok(Self::from_bytes(bytes, None))
            }
        }
    }

    fn load_path(path: &Path) -> Result<Self, DocumentError> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(DocumentError::UnsupportedInputKind {
                kind: format!("{} is not a regular file", path.display()),
            });
        }

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

        let kind = match extension.as_deref() {
            None => None,
            Some(ext) => Some(kind_from_extension(ext)?),
        };

        let bytes = fs::read(path)?;
        debug!("Loaded {} ({} bytes)", path.display(), bytes.len());

        let kind = kind.unwrap_or_else(|| sniff_kind(&bytes));
        Ok(Self { bytes, kind, name })
    }

    /// Classify an in-memory buffer by content
    pub fn from_bytes(bytes: Vec<u8>, name: Option<String>) -> Self {
        let kind = sniff_kind(&bytes);
        Self { bytes, kind, name }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// File name for path handles
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Decode the content as UTF-8 text
    pub fn text(&self) -> Result<String, DocumentError> {
        String::from_utf8(self.bytes.clone())
            .map_err(|e| DocumentError::Decode(format!("document is not valid UTF-8: {}", e)))
    }
}

fn kind_from_extension(ext: &str) -> Result<SourceKind, DocumentError> {
    if ext == "pdf" {
        return Ok(SourceKind::Pdf);
    }
    if TEXT_EXTENSIONS.contains(&ext) {
        return Ok(SourceKind::Text);
    }
    ImageFormat::from_extension(ext)
        .map(|format| SourceKind::Raster(Some(format)))
        .ok_or_else(|| DocumentError::UnsupportedInputKind {
            kind: format!("unrecognised file extension '.{}'", ext),
        })
}

/// Sniff the content: PDF magic, then any image signature, then UTF-8 text
///
/// UTF-8 content that happens to start with an image signature ("BM...",
/// "P1"...) is only an image if it actually decodes.
fn sniff_kind(bytes: &[u8]) -> SourceKind {
    if is_pdf_bytes(bytes) {
        return SourceKind::Pdf;
    }

    let is_text = !bytes.is_empty() && !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok();
    match detect_format(bytes) {
        Some(format) if !is_text => SourceKind::Raster(Some(format)),
        Some(format) if image::load_from_memory_with_format(bytes, format).is_ok() => {
            SourceKind::Raster(Some(format))
        }
        _ if is_text => SourceKind::Text,
        _ => SourceKind::Raster(None),
    }
}
