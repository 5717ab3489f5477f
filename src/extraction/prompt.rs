// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Instruction prompts for structured field extraction

use super::types::ChatMessage;

/// Builds the messages sent to the language model
pub trait ExtractionPrompt: Send + Sync {
    /// Messages for a field list and, optionally, the document content
    ///
    /// Without content only the instruction message is produced, for
    /// callers that attach the document themselves.
    fn messages(&self, fields: &[String], content: Option<&str>) -> Vec<ChatMessage>;
}

/// Default JSON-only extraction prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractionPrompt;

impl DefaultExtractionPrompt {
    /// Instruction text for a field list
    pub fn instructions(fields: &[String]) -> String {
        format!(
            r#"You are a data extraction system. Extract these fields from the document: {fields}.

Rules:
- Respond with a single JSON object and nothing else. No explanations, no prose, no markdown.
- Use exactly the field names listed above as the JSON keys.
- Use null for any field that is not present in the document.
- When a field has several values (a list or a table), return a list of objects. Each object has a "value" key and may have a "details" object with further attributes (for example percentage or date).
- When a field has one value, return that value directly.

Example:
{{
  "single_value_field": "<value>",
  "list_or_table_field": [
    {{"value": "<value 1>", "details": {{"percentage": "<percentage>", "date": "<date>"}}}},
    {{"value": "<value 2>", "details": {{"percentage": "<percentage>", "date": "<date>"}}}}
  ]
}}"#,
            fields = fields.join(", ")
        )
    }
}

impl ExtractionPrompt for DefaultExtractionPrompt {
    fn messages(&self, fields: &[String], content: Option<&str>) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(Self::instructions(fields))];
        if let Some(content) = content {
            messages.push(ChatMessage::user(format!("DOCUMENT CONTENT:\n{}", content)));
        }
        messages
    }
}
