// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR through an external program (tesseract by default)

use image::ImageFormat;
use std::process::Command;
use tracing::debug;

use super::text::OcrModel;
use super::types::ExtractionError;
use crate::document::PageImage;

/// Placeholder replaced by the temporary image path in the argument list
pub const IMAGE_PLACEHOLDER: &str = "{image}";

/// Runs an OCR program on a temporary PNG of each image and reads stdout
#[derive(Debug, Clone)]
pub struct CommandOcrModel {
    program: String,
    args: Vec<String>,
}

impl CommandOcrModel {
    /// Program plus arguments; `{image}` marks where the image path goes
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `tesseract {image} stdout`
    pub fn tesseract() -> Self {
        Self::new(
            "tesseract",
            vec![IMAGE_PLACEHOLDER.to_string(), "stdout".to_string()],
        )
    }

    /// Parse a whitespace-separated command line such as `tesseract {image} stdout -l eng`
    ///
    /// A command line without `{image}` gets the path appended.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next()?;
        let mut args: Vec<String> = parts.collect();
        if args.is_empty() && program == "tesseract" {
            return Some(Self::tesseract());
        }
        if !args.iter().any(|a| a == IMAGE_PLACEHOLDER) {
            args.push(IMAGE_PLACEHOLDER.to_string());
        }
        Some(Self::new(program, args))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl OcrModel for CommandOcrModel {
    fn recognize(&self, image: &PageImage) -> Result<String, ExtractionError> {
        let file = tempfile::Builder::new()
            .prefix("docflow-ocr-")
            .suffix(".png")
            .tempfile()?;
        image
            .image()
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|e| ExtractionError::backend(&self.program, e))?;

        let path = file.path().to_string_lossy().into_owned();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(IMAGE_PLACEHOLDER, &path))
            .collect();

        debug!("Running OCR command: {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| ExtractionError::backend(&self.program, format!("failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::backend(
                &self.program,
                format!("exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
