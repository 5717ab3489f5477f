// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Layout segmentation
//!
//! A segmentation backend maps a page image to labelled regions:
//! class id -> normalized boxes, plus a label table fixed for the
//! lifetime of the backend instance.
//!
//! Key features:
//! - `SegmentationModel` trait for custom backends
//! - Detector adapter grouping per-detection output by class
//! - YOLO-family ONNX detector (letterbox, decode, per-class NMS)
//! - Backend factory by name

pub mod config;
pub mod labels;
pub mod model;
pub mod postprocess;
pub mod preprocessing;
pub mod types;
pub mod yolo;

pub use config::SegmentationConfig;
pub use labels::{load_labels_file, parse_labels};
pub use model::{Detector, DetectorSegmentation, SegmentationModel};
pub use types::{ClassId, Detection, LabelTable, SegmentationError, SegmentationResult};
pub use yolo::YoloDetector;

use std::sync::Arc;
use tracing::info;

/// Backend names understood by [`load_segmentation_model`]
pub const AVAILABLE_MODELS: [&str; 1] = ["yolo"];

/// Build a segmentation backend by registered name
pub fn load_segmentation_model(
    name: &str,
    config: &SegmentationConfig,
) -> Result<Arc<dyn SegmentationModel>, SegmentationError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "yolo" => {
            let model = DetectorSegmentation::new(YoloDetector::from_config(config)?)?;
            info!("Segmentation backend ready: yolo ({} labels)", model.labels().len());
            Ok(Arc::new(model))
        }
        other => Err(SegmentationError::UnknownModel {
            name: other.to_string(),
            available: AVAILABLE_MODELS.join(", "),
        }),
    }
}
