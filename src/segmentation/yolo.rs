// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO-family layout detector on ONNX Runtime
//!
//! Works with ultralytics exports of document layout models (DocLayNet
//! and similar) whose single output is `[1, 4 + C, N]`.

use anyhow::{Context, Result};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::config::SegmentationConfig;
use super::labels::{load_labels_file, parse_labels};
use super::model::Detector;
use super::postprocess::{apply_nms, decode_predictions};
use super::preprocessing::letterbox;
use super::types::{Detection, LabelTable, SegmentationError};
use crate::document::PageImage;

/// Layout detector backed by an ONNX session
///
/// Runs on CPU only.
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Class names in id order
    class_names: Vec<String>,
    confidence_threshold: f32,
    iou_threshold: f32,
    input_size: u32,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("classes", &self.class_names.len())
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load a detector from an ONNX file with the given class names
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - `class_names` is empty
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        class_names: Vec<String>,
    ) -> Result<Self, SegmentationError> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            return Err(SegmentationError::ModelNotFound {
                path: model_path.display().to_string(),
            });
        }
        if class_names.is_empty() {
            return Err(SegmentationError::Labels(
                "a detector needs at least one class name".to_string(),
            ));
        }

        info!("Loading layout detector from {}", model_path.display());

        let session = build_session(model_path)
            .map_err(|e| SegmentationError::Inference(format!("{:#}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("Layout detector input: {}", input_name);
        info!(
            "✅ Layout detector loaded with {} classes (CPU-only)",
            class_names.len()
        );

        let defaults = SegmentationConfig::default();
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            class_names,
            confidence_threshold: defaults.confidence_threshold,
            iou_threshold: defaults.iou_threshold,
            input_size: defaults.input_size,
        })
    }

    /// Load a detector as described by a segmentation config
    pub fn from_config(config: &SegmentationConfig) -> Result<Self, SegmentationError> {
        let model_path = config.model_path.as_deref().ok_or_else(|| {
            SegmentationError::ModelNotFound {
                path: "<DOCFLOW_SEGMENTATION_MODEL_PATH not set>".to_string(),
            }
        })?;

        let table = if !config.labels.is_empty() {
            LabelTable::from_names(config.labels.iter().cloned())?
        } else if let Some(path) = &config.labels_path {
            load_labels_file(Path::new(path))?
        } else {
            return Err(SegmentationError::Labels(
                "set DOCFLOW_SEGMENTATION_LABELS or DOCFLOW_SEGMENTATION_LABELS_PATH".to_string(),
            ));
        };

        Ok(Self::load(model_path, class_names_from_table(&table)?)?
            .with_confidence_threshold(config.confidence_threshold)
            .with_iou_threshold(config.iou_threshold)
            .with_input_size(config.input_size))
    }

    /// Set the confidence threshold for detections
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the IoU threshold for non-maximum suppression
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the square model input size
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size.max(32);
        self
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }
}

fn build_session(model_path: &Path) -> Result<Session> {
    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load layout model from {}",
            model_path.display()
        ))
}

/// Class names must be contiguous from id 0 for an index-based detector
fn class_names_from_table(table: &LabelTable) -> Result<Vec<String>, SegmentationError> {
    table
        .iter()
        .enumerate()
        .map(|(position, (id, label))| {
            if id as usize == position {
                Ok(label.to_string())
            } else {
                Err(SegmentationError::Labels(format!(
                    "class ids must be contiguous from 0, missing id {}",
                    position
                )))
            }
        })
        .collect()
}

impl Detector for YoloDetector {
    fn class_names(&self) -> Vec<String> {
        self.class_names.clone()
    }

    fn detect(&self, image: &PageImage) -> Result<Vec<Detection>, SegmentationError> {
        let (input, geometry) = letterbox(image.image(), self.input_size);

        let mut session = self
            .session
            .lock()
            .map_err(|_| SegmentationError::Inference("session lock poisoned".to_string()))?;

        let input_value = Value::from_array(input)
            .map_err(|e| SegmentationError::Inference(format!("input tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| SegmentationError::Inference(e.to_string()))?;

        let predictions = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| SegmentationError::Inference(format!("output tensor: {}", e)))?;

        debug!("Layout detector output shape: {:?}", predictions.shape());

        let detections = decode_predictions(
            predictions.view(),
            self.class_names.len(),
            &geometry,
            self.confidence_threshold,
        )?;
        let kept = apply_nms(detections, self.iou_threshold);

        debug!("Detected {} layout regions", kept.len());
        Ok(kept)
    }

    fn name(&self) -> &str {
        "yolo"
    }
}
