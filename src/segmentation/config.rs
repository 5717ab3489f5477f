// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for layout segmentation

use std::env;

use super::preprocessing::DEFAULT_INPUT_SIZE;

/// Configuration for the segmentation backend
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationConfig {
    /// Registered backend name
    pub model: String,
    /// Path to the ONNX model file
    pub model_path: Option<String>,
    /// Class names in id order
    pub labels: Vec<String>,
    /// File holding class names (used when `labels` is empty)
    pub labels_path: Option<String>,
    /// Minimum class score for a detection
    pub confidence_threshold: f32,
    /// IoU above which same-class boxes are suppressed
    pub iou_threshold: f32,
    /// Square model input size in pixels
    pub input_size: u32,
}

impl SegmentationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: env::var("DOCFLOW_SEGMENTATION_MODEL").unwrap_or(defaults.model),
            model_path: env::var("DOCFLOW_SEGMENTATION_MODEL_PATH").ok(),
            labels: env::var("DOCFLOW_SEGMENTATION_LABELS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            labels_path: env::var("DOCFLOW_SEGMENTATION_LABELS_PATH").ok(),
            confidence_threshold: env::var("DOCFLOW_SEGMENTATION_CONFIDENCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.confidence_threshold),
            iou_threshold: env::var("DOCFLOW_SEGMENTATION_IOU")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.iou_threshold),
            input_size: env::var("DOCFLOW_SEGMENTATION_INPUT_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.input_size),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("Segmentation confidence must be within [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err("Segmentation IoU threshold must be within [0, 1]".to_string());
        }
        if self.input_size == 0 {
            return Err("Segmentation input size must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            model: "yolo".to_string(),
            model_path: None,
            labels: Vec::new(),
            labels_path: None,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            input_size: DEFAULT_INPUT_SIZE,
        }
    }
}
