//! Response normalization.
//!
//! Turns the assistant message of a chat completion into a narrative text plus an
//! optional structured object. The model is asked for strict JSON but may wrap it
//! in prose or ignore the instruction entirely, so parsing is best effort and a
//! non-JSON reply degrades to narrative-only.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::AnalysisEnvelope;

/// Content of an assistant message as returned by the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
    Other(Value),
}

/// One element of an array-shaped message content.
///
/// Variant order matters: a part carrying both `text` and `content` strings is
/// read through `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Plain(String),
    Text { text: String },
    Content { content: String },
    Other(Value),
}

impl ContentPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Plain(text) | Self::Text { text } | Self::Content { content: text } => {
                Some(text)
            }
            Self::Other(_) => None,
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAnalysis {
    /// Narrative text shown when no structured object is available.
    pub raw: String,
    /// Structured sections, always a JSON object when present.
    pub structured: Option<Value>,
}

impl NormalizedAnalysis {
    pub fn into_envelope(self) -> AnalysisEnvelope {
        AnalysisEnvelope::success(self.raw, self.structured)
    }
}

/// Flattens message content into one text value.
///
/// Text parts are joined with `\n`; parts without text and empty parts are
/// dropped. Unknown shapes are serialized as JSON.
pub fn flatten_content(content: Option<&MessageContent>) -> String {
    match content {
        None => String::new(),
        Some(MessageContent::Text(text)) => text.clone(),
        Some(MessageContent::Parts(parts)) => parts
            .iter()
            .filter_map(ContentPart::as_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Some(MessageContent::Other(Value::Null)) => String::new(),
        Some(MessageContent::Other(value)) => value.to_string(),
    }
}

/// Parses `text` as JSON, falling back to the span from the first `{` to the
/// last `}`.
///
/// The fallback is greedy on purpose: it can mis-extract when the text holds
/// several brace groups, and then the whole reply is treated as narrative.
pub fn parse_lenient(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("No parseable JSON span in model reply: {}", e);
            None
        }
    }
}

/// Full normalization of an assistant message.
pub fn normalize_content(content: Option<&MessageContent>) -> NormalizedAnalysis {
    let text = flatten_content(content);

    let Some(parsed) = parse_lenient(&text).filter(Value::is_object) else {
        return NormalizedAnalysis {
            raw: text,
            structured: None,
        };
    };

    let raw = parsed
        .get("raw_text")
        .and_then(Value::as_str)
        .filter(|narrative| !narrative.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| text.clone());

    let structured = match parsed.get("structured") {
        Some(section) if section.is_object() => section.clone(),
        _ => parsed,
    };

    NormalizedAnalysis {
        raw,
        structured: Some(structured),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(value: Value) -> MessageContent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn flattens_text_parts_with_newlines() {
        let parts = content(json!(["a", "b"]));
        assert_eq!(flatten_content(Some(&parts)), "a\nb");
    }

    #[test]
    fn flattens_mixed_part_shapes() {
        let parts = content(json!([
            {"type": "text", "text": "first"},
            "second",
            {"content": "third"},
            {"type": "image_url", "image_url": {"url": "x"}},
            {"text": ""},
            {"text": 5, "content": "fourth"}
        ]));

        assert_eq!(flatten_content(Some(&parts)), "first\nsecond\nthird\nfourth");
    }

    #[test]
    fn plain_string_content_is_used_directly() {
        let text = content(json!("hello"));
        assert_eq!(flatten_content(Some(&text)), "hello");
    }

    #[test]
    fn object_content_is_serialized() {
        let other = content(json!({"answer": 1}));
        assert!(matches!(other, MessageContent::Other(_)));
        assert_eq!(flatten_content(Some(&other)), r#"{"answer":1}"#);
    }

    #[test]
    fn missing_content_flattens_to_empty() {
        assert_eq!(flatten_content(None), "");
        let result = normalize_content(None);
        assert_eq!(result.raw, "");
        assert!(result.structured.is_none());
    }

    #[test]
    fn strict_json_uses_narrative_and_structured_fields() {
        let text = MessageContent::from(r#"{"raw_text":"x","structured":{"personality":{}}}"#);

        let result = normalize_content(Some(&text));

        assert_eq!(result.raw, "x");
        assert_eq!(result.structured, Some(json!({"personality": {}})));
    }

    #[test]
    fn extracts_json_embedded_in_prose() {
        let text = MessageContent::from(r#"Here is the result: {"a":1} thanks"#);

        let result = normalize_content(Some(&text));

        assert_eq!(result.structured, Some(json!({"a": 1})));
        assert_eq!(result.raw, r#"Here is the result: {"a":1} thanks"#);
    }

    #[test]
    fn free_text_becomes_narrative_only() {
        let text = MessageContent::from("just some thoughts, no json here");

        let result = normalize_content(Some(&text));

        assert_eq!(result.raw, "just some thoughts, no json here");
        assert!(result.structured.is_none());
    }

    #[test]
    fn greedy_span_across_two_objects_fails_gracefully() {
        let text = MessageContent::from(r#"first {"a":1} and then {"b":2}"#);

        let result = normalize_content(Some(&text));

        assert!(result.structured.is_none());
        assert_eq!(result.raw, r#"first {"a":1} and then {"b":2}"#);
    }

    #[test]
    fn nested_braces_inside_span_are_kept() {
        let text = MessageContent::from("```json\n{\"structured\":{\"emotion\":{\"state\":\"ok\"}}}\n```");

        let result = normalize_content(Some(&text));

        assert_eq!(
            result.structured,
            Some(json!({"emotion": {"state": "ok"}}))
        );
    }

    #[test]
    fn whole_object_is_structured_when_field_missing_or_not_object() {
        let text = MessageContent::from(r#"{"raw_text":"n","structured":"oops","personality":{}}"#);

        let result = normalize_content(Some(&text));

        assert_eq!(result.raw, "n");
        assert_eq!(
            result.structured,
            Some(json!({"raw_text": "n", "structured": "oops", "personality": {}}))
        );
    }

    #[test]
    fn empty_or_non_string_narrative_falls_back_to_text() {
        let reply = r#"{"raw_text":"","structured":{}}"#;
        let result = normalize_content(Some(&MessageContent::from(reply)));
        assert_eq!(result.raw, reply);

        let reply = r#"{"raw_text":7}"#;
        let result = normalize_content(Some(&MessageContent::from(reply)));
        assert_eq!(result.raw, reply);
    }

    #[test]
    fn non_object_json_is_narrative_only() {
        let result = normalize_content(Some(&MessageContent::from("[1,2]")));
        assert!(result.structured.is_none());
        assert_eq!(result.raw, "[1,2]");

        let result = normalize_content(Some(&MessageContent::from("null")));
        assert!(result.structured.is_none());
    }

    #[test]
    fn json_split_across_parts_is_reassembled() {
        let parts = content(json!([
            {"type": "text", "text": "{\"raw_text\":\"joined\","},
            {"type": "text", "text": "\"structured\":{\"values\":{}}}"}
        ]));

        let result = normalize_content(Some(&parts));

        assert_eq!(result.raw, "joined");
        assert_eq!(result.structured, Some(json!({"values": {}})));
    }

    #[test]
    fn into_envelope_marks_success() {
        let envelope = normalize_content(Some(&MessageContent::from("plain"))).into_envelope();
        assert!(envelope.success);
        assert_eq!(envelope.raw, "plain");
        assert!(envelope.data.is_none());
    }
}
