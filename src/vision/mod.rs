// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page-level image operations
//!
//! This module provides:
//! - Region crops from normalized bounding boxes
//! - QR code detection, cropping and decoding
//! - Image format sniffing and transport encoding

pub mod barcode;
pub mod cropper;
pub mod image_utils;

pub use barcode::{CodeScanner, DetectedCode};
pub use cropper::RegionCropper;
pub use image_utils::{detect_format, encode_page};
