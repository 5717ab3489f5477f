// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for text and field extraction

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by extraction backends
///
/// Every variant is a backend failure; none is retried here.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Backend call failed before producing a response
    #[error("{backend} request failed: {message}")]
    Backend {
        /// Backend name (e.g. "document-intelligence", "chat-completions")
        backend: String,
        /// Error message
        message: String,
    },

    /// Backend answered with a non-success status
    #[error("{backend} API error: {status} - {message}")]
    Api {
        /// Backend name
        backend: String,
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Backend did not finish in time
    #[error("{backend} timed out after {timeout_ms}ms")]
    Timeout {
        /// Backend name
        backend: String,
        /// Time waited in milliseconds
        timeout_ms: u64,
    },

    /// Backend response could not be interpreted
    #[error("Invalid {backend} response: {reason}")]
    InvalidResponse {
        /// Backend name
        backend: String,
        /// What was wrong with it
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    pub(crate) fn backend(backend: &str, message: impl ToString) -> Self {
        ExtractionError::Backend {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid(backend: &str, reason: impl ToString) -> Self {
        ExtractionError::InvalidResponse {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// One chat message sent to a language model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Fixed decoding parameters for field extraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 1000,
        }
    }
}

/// Raw answer from a language model
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// Backend already returned a JSON object
    Structured(Map<String, Value>),
    /// Free text, expected to hold JSON
    Text(String),
}

/// Value extracted for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Table or list field; every element is a record
    Records(Vec<Map<String, Value>>),
    /// Single value, passed through as returned
    Scalar(Value),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(value) => value.as_str(),
            FieldValue::Records(_) => None,
        }
    }

    pub fn as_records(&self) -> Option<&[Map<String, Value>]> {
        match self {
            FieldValue::Records(records) => Some(records),
            FieldValue::Scalar(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Scalar(value) => value.clone(),
            FieldValue::Records(records) => {
                Value::Array(records.iter().cloned().map(Value::Object).collect())
            }
        }
    }
}

/// Requested field -> extracted value, `None` meaning "not found"
///
/// Holds exactly the requested fields, in request order. Serializes as a
/// JSON object with `null` for missing fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldResult {
    entries: Vec<(String, Option<FieldValue>)>,
}

impl FieldResult {
    /// Result with every field missing
    pub fn all_null<S: AsRef<str>>(fields: &[S]) -> Self {
        let mut result = Self::default();
        for field in fields {
            result.insert(field.as_ref(), None);
        }
        result
    }

    /// Set a field; the first occurrence of a name keeps its position
    pub fn insert(&mut self, field: &str, value: Option<FieldValue>) {
        match self.entries.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field.to_string(), value)),
        }
    }

    /// Value of a field; `None` if missing or not requested
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == field)
    }

    /// Field names in request order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FieldValue>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no field has a value
    pub fn is_all_null(&self) -> bool {
        self.entries.iter().all(|(_, value)| value.is_none())
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(name, value)| {
                    (
                        name.clone(),
                        value.as_ref().map(FieldValue::to_json).unwrap_or(Value::Null),
                    )
                })
                .collect(),
        )
    }
}

impl Serialize for FieldResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
