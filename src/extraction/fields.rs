// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Structured field extraction and model response parsing

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;

use super::types::{ExtractionError, FieldResult, FieldValue, ModelResponse};

/// Trait for implementing structured field extraction backends
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extract the requested fields from free text
    ///
    /// # Returns
    /// A result holding exactly the requested fields, `None` for the ones
    /// not found
    async fn extract_fields(
        &self,
        text: &str,
        fields: &[String],
    ) -> Result<FieldResult, ExtractionError>;
}

/// Strip one layer of fenced-code markup
///
/// Takes the content after the first ```` ```json ```` marker (or, failing
/// that, the first ```` ``` ````) up to the next fence. Text without a fence
/// is returned unchanged.
pub fn strip_code_fence(text: &str) -> &str {
    let inner = if let Some((_, rest)) = text.split_once("```json") {
        rest
    } else if let Some((_, rest)) = text.split_once("```") {
        rest
    } else {
        return text;
    };

    inner
        .split_once("```")
        .map_or(inner, |(body, _)| body)
        .trim()
}

/// Turn a raw model response into a field result
///
/// Unparsable text (truncated, prose, non-object JSON) maps every field to
/// `None`; this never fails.
pub fn parse_field_response(response: ModelResponse, fields: &[String]) -> FieldResult {
    let object = match response {
        ModelResponse::Structured(object) => object,
        ModelResponse::Text(text) => {
            let payload = strip_code_fence(&text);
            match serde_json::from_str::<Value>(payload) {
                Ok(Value::Object(object)) => object,
                Ok(other) => {
                    warn!(
                        "Field extraction returned JSON {} instead of an object",
                        json_kind(&other)
                    );
                    return FieldResult::all_null(fields);
                }
                Err(e) => {
                    warn!("Field extraction returned malformed JSON: {}", e);
                    return FieldResult::all_null(fields);
                }
            }
        }
    };

    let mut result = FieldResult::default();
    for field in fields {
        result.insert(field, object.get(field).cloned().and_then(normalize_value));
    }
    result
}

/// Absent/null -> None, lists -> records, scalars as-is
fn normalize_value(value: Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(FieldValue::Records(
            items.into_iter().map(into_record).collect(),
        )),
        other => Some(FieldValue::Scalar(other)),
    }
}

fn into_record(item: Value) -> Map<String, Value> {
    match item {
        Value::Object(record) => record,
        scalar => {
            let mut record = Map::new();
            record.insert("value".to_string(), scalar);
            record
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
