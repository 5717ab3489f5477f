// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class name loading for detector models
//!
//! Accepted forms:
//! - JSON array: `["Caption", "Footnote"]`
//! - JSON object of id -> name: `{"0": "Caption", "1": "Footnote"}`
//! - ultralytics metadata string: `{0: 'Caption', 1: 'Footnote'}`
//! - one name per line

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use super::types::{ClassId, LabelTable, SegmentationError};

fn ultralytics_entry() -> &'static Regex {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    ENTRY.get_or_init(|| {
        Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#).expect("static regex is valid")
    })
}

/// Parse class names from any supported textual form
pub fn parse_labels(source: &str) -> Result<LabelTable, SegmentationError> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err(SegmentationError::Labels("label source is empty".to_string()));
    }

    if let Ok(names) = serde_json::from_str::<Vec<String>>(trimmed) {
        return LabelTable::from_names(names);
    }

    if let Ok(map) = serde_json::from_str::<BTreeMap<String, String>>(trimmed) {
        let pairs = map
            .into_iter()
            .map(|(id, name)| {
                id.trim()
                    .parse::<ClassId>()
                    .map(|id| (id, name))
                    .map_err(|_| SegmentationError::Labels(format!("invalid class id '{}'", id)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return LabelTable::new(pairs);
    }

    if trimmed.starts_with('{') {
        let pairs: Vec<(ClassId, String)> = ultralytics_entry()
            .captures_iter(trimmed)
            .filter_map(|caps| {
                let id = caps.get(1)?.as_str().parse().ok()?;
                let name = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
                Some((id, name))
            })
            .collect();
        if pairs.is_empty() {
            return Err(SegmentationError::Labels(
                "no 'id: name' entries found".to_string(),
            ));
        }
        return LabelTable::new(pairs);
    }

    LabelTable::from_names(
        trimmed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty()),
    )
}

/// Read and parse a labels file
pub fn load_labels_file(path: &Path) -> Result<LabelTable, SegmentationError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SegmentationError::Labels(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_labels(&content)
}
