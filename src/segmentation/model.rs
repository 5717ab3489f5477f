// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Segmentation backend traits and the detector-backed adapter

use tracing::debug;

use super::types::{Detection, LabelTable, SegmentationError, SegmentationResult};
use crate::document::PageImage;

/// Trait for implementing layout segmentation backends
///
/// Implement this directly to plug in any region detector. Boxes must
/// already be normalized to the page; callers apply no further transform.
pub trait SegmentationModel: Send + Sync {
    /// Stable class id -> label mapping for this instance
    fn labels(&self) -> &LabelTable;

    /// Regions on one page, or `None` when nothing was found
    fn segment(&self, image: &PageImage) -> Result<Option<SegmentationResult>, SegmentationError>;

    /// Backend name for logging
    fn name(&self) -> &str {
        "custom"
    }
}

/// Object detector producing per-detection class + box pairs
pub trait Detector: Send + Sync {
    /// Class names indexed by class id
    fn class_names(&self) -> Vec<String>;

    /// Detections on one page, boxes normalized to the page
    fn detect(&self, image: &PageImage) -> Result<Vec<Detection>, SegmentationError>;

    fn name(&self) -> &str {
        "detector"
    }
}

/// Segmentation adapter over a [`Detector`]
///
/// Each detection is one region; regions are grouped by class. The label
/// table is built once from the detector's class names at construction.
#[derive(Debug)]
pub struct DetectorSegmentation<D> {
    detector: D,
    labels: LabelTable,
}

impl<D: Detector> DetectorSegmentation<D> {
    pub fn new(detector: D) -> Result<Self, SegmentationError> {
        let labels = LabelTable::from_names(detector.class_names())?;
        Ok(Self { detector, labels })
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }
}

impl<D: Detector> SegmentationModel for DetectorSegmentation<D> {
    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn segment(&self, image: &PageImage) -> Result<Option<SegmentationResult>, SegmentationError> {
        let detections = self.detector.detect(image)?;
        debug!(
            "{} produced {} detection(s)",
            self.detector.name(),
            detections.len()
        );

        if detections.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            detections
                .into_iter()
                .map(|d| (d.class_id, d.bbox))
                .collect(),
        ))
    }

    fn name(&self) -> &str {
        self.detector.name()
    }
}
