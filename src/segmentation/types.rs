// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for layout segmentation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::document::NormalizedBox;

/// Integer class id assigned by a segmentation backend
pub type ClassId = u32;

/// Errors that can occur during segmentation
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// Model file does not exist
    #[error("Segmentation model not found: {path}")]
    ModelNotFound {
        /// Path that was checked
        path: String,
    },

    /// Requested backend name is not registered
    #[error("Unknown segmentation model '{name}', available: {available}")]
    UnknownModel {
        /// Name that was requested
        name: String,
        /// Comma-separated registered names
        available: String,
    },

    /// Label table could not be built
    #[error("Invalid segmentation labels: {0}")]
    Labels(String),

    /// Backend inference failed
    #[error("Segmentation inference failed: {0}")]
    Inference(String),
}

/// Injective class id -> label mapping of one segmentation backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTable {
    labels: BTreeMap<ClassId, String>,
}

impl LabelTable {
    /// Build from explicit pairs; a repeated label is rejected
    pub fn new(
        pairs: impl IntoIterator<Item = (ClassId, String)>,
    ) -> Result<Self, SegmentationError> {
        let mut labels = BTreeMap::new();
        for (id, label) in pairs {
            if labels.values().any(|existing| existing == &label) {
                return Err(SegmentationError::Labels(format!(
                    "label '{}' is assigned to more than one class id",
                    label
                )));
            }
            labels.insert(id, label);
        }
        Ok(Self { labels })
    }

    /// Build from class names indexed by position
    pub fn from_names<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
    ) -> Result<Self, SegmentationError> {
        Self::new(
            names
                .into_iter()
                .enumerate()
                .map(|(id, name)| (id as ClassId, name.into())),
        )
    }

    /// Label of a class id
    pub fn label(&self, id: ClassId) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    /// Class id of a label (exact match)
    pub fn id_for(&self, label: &str) -> Option<ClassId> {
        self.labels
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .map(|(id, _)| *id)
    }

    /// label -> class id mapping
    pub fn inverse(&self) -> BTreeMap<String, ClassId> {
        self.labels
            .iter()
            .map(|(id, label)| (label.clone(), *id))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &str)> {
        self.labels.iter().map(|(id, label)| (*id, label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Regions found on one page: class id -> boxes of that class
///
/// Classes enumerate in ascending id order; boxes keep backend order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    regions: BTreeMap<ClassId, Vec<NormalizedBox>>,
}

impl SegmentationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a box to its class
    pub fn push(&mut self, class_id: ClassId, bbox: NormalizedBox) {
        self.regions.entry(class_id).or_default().push(bbox);
    }

    pub fn boxes(&self, class_id: ClassId) -> Option<&[NormalizedBox]> {
        self.regions.get(&class_id).map(Vec::as_slice)
    }

    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.regions.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &[NormalizedBox])> {
        self.regions.iter().map(|(id, boxes)| (*id, boxes.as_slice()))
    }

    /// Total number of boxes over all classes
    pub fn region_count(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl FromIterator<(ClassId, NormalizedBox)> for SegmentationResult {
    fn from_iter<I: IntoIterator<Item = (ClassId, NormalizedBox)>>(iter: I) -> Self {
        let mut result = SegmentationResult::new();
        for (class_id, bbox) in iter {
            result.push(class_id, bbox);
        }
        result
    }
}

/// Single detection produced by a neural detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: ClassId,
    pub confidence: f32,
    pub bbox: NormalizedBox,
}
