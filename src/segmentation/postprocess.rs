// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of raw detector output into normalized detections

use ndarray::{ArrayViewD, Ix3};
use std::cmp::Ordering;

use super::preprocessing::Letterbox;
use super::types::{ClassId, Detection, SegmentationError};
use crate::document::NormalizedBox;

/// Decode a YOLO-style prediction tensor
///
/// Accepts `[1, 4 + C, N]` (ultralytics export layout) or the transposed
/// `[1, N, 4 + C]`. Each anchor holds `cx, cy, w, h` in input pixels
/// followed by per-class scores; the best class above `confidence` wins.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    num_classes: usize,
    geometry: &Letterbox,
    confidence: f32,
) -> Result<Vec<Detection>, SegmentationError> {
    let output = output.into_dimensionality::<Ix3>().map_err(|_| {
        SegmentationError::Inference("expected a 3-dimensional prediction tensor".to_string())
    })?;

    let channels = 4 + num_classes;
    let (dim1, dim2) = (output.shape()[1], output.shape()[2]);
    let channels_first = if dim1 == channels {
        true
    } else if dim2 == channels {
        false
    } else {
        return Err(SegmentationError::Inference(format!(
            "prediction shape {:?} does not match {} classes",
            output.shape(),
            num_classes
        )));
    };

    let anchors = if channels_first { dim2 } else { dim1 };
    let value = |anchor: usize, channel: usize| -> f32 {
        if channels_first {
            output[[0, channel, anchor]]
        } else {
            output[[0, anchor, channel]]
        }
    };

    let mut detections = Vec::new();
    for anchor in 0..anchors {
        let best = (0..num_classes)
            .map(|class| (class, value(anchor, 4 + class)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let Some((class, score)) = best else { continue };
        if score < confidence {
            continue;
        }

        let (cx, cy) = (value(anchor, 0), value(anchor, 1));
        let (w, h) = (value(anchor, 2), value(anchor, 3));

        detections.push(Detection {
            class_id: class as ClassId,
            confidence: score,
            bbox: NormalizedBox::new(
                geometry.normalize_x(cx - w / 2.0),
                geometry.normalize_y(cy - h / 2.0),
                geometry.normalize_x(cx + w / 2.0),
                geometry.normalize_y(cy + h / 2.0),
            ),
        });
    }

    Ok(detections)
}

/// Per-class non-maximum suppression, highest confidence first
pub fn apply_nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let overlaps = kept.iter().any(|k| {
            k.class_id == candidate.class_id && calculate_iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection over union of two boxes
pub fn calculate_iou(a: &NormalizedBox, b: &NormalizedBox) -> f32 {
    let x_min = a.x1.max(b.x1);
    let y_min = a.y1.max(b.y1);
    let x_max = a.x2.min(b.x2);
    let y_max = a.y2.min(b.y2);

    if x_max <= x_min || y_max <= y_min {
        return 0.0;
    }

    let intersection = (x_max - x_min) * (y_max - y_min);
    let union = a.width() * a.height() + b.width() * b.height() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
