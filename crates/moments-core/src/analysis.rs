//! Analysis result types.
//!
//! The gateway forwards the structured object as untyped JSON; [`AnalysisReport`]
//! is the typed view used for rendering and export. Every section is optional and
//! a wrongly typed field degrades to "absent" instead of failing the whole view,
//! since the upstream model is asked for a schema but never bound to it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Uniform success body returned by `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    pub success: bool,
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl AnalysisEnvelope {
    pub fn success(raw: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            raw: raw.into(),
            data,
        }
    }

    /// Typed view of `data`, if any was returned.
    pub fn report(&self) -> Option<AnalysisReport> {
        self.data.as_ref().map(AnalysisReport::from_value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisReport {
    #[serde(deserialize_with = "lenient_section")]
    pub personality: Option<Personality>,
    #[serde(deserialize_with = "lenient_interests")]
    pub interests: Vec<Interest>,
    #[serde(deserialize_with = "lenient_section")]
    pub lifestyle: Option<Lifestyle>,
    #[serde(deserialize_with = "lenient_section")]
    pub values: Option<Values>,
    #[serde(deserialize_with = "lenient_section")]
    pub emotion: Option<Emotion>,
    #[serde(deserialize_with = "lenient_section")]
    pub suggestions: Option<Suggestions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Personality {
    #[serde(deserialize_with = "lenient_strings")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interest {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub level: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lifestyle {
    #[serde(deserialize_with = "lenient_strings")]
    pub habits: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Values {
    #[serde(deserialize_with = "lenient_string")]
    pub career: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub relationship: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub family: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub life: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Emotion {
    #[serde(deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Suggestions {
    #[serde(deserialize_with = "lenient_strings")]
    pub topics: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub openings: Vec<String>,
    #[serde(deserialize_with = "lenient_section")]
    pub dating: Option<DatingSuggestions>,
    #[serde(deserialize_with = "lenient_strings")]
    pub warnings: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub strategy: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatingSuggestions {
    #[serde(deserialize_with = "lenient_strings")]
    pub places: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub activities: Vec<String>,
}

impl DatingSuggestions {
    pub fn is_empty(&self) -> bool {
        self.places.is_empty() && self.activities.is_empty()
    }
}

impl AnalysisReport {
    /// Builds the typed view from the gateway's `data` value.
    ///
    /// Anything that is not a JSON object yields an empty report.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        match serde_json::from_value(value.clone()) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("Structured analysis did not match the report layout: {}", e);
                Self::default()
            }
        }
    }

    /// True when no section would be rendered.
    pub fn is_empty(&self) -> bool {
        self.personality.is_none()
            && self.interests.is_empty()
            && self.lifestyle.is_none()
            && self.values.is_none()
            && self.emotion.is_none()
            && self.suggestions.is_none()
    }
}

fn coerce_text(value: Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_text(Value::deserialize(deserializer)?))
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(coerce_text).collect(),
        other => coerce_text(other).into_iter().collect(),
    })
}

fn lenient_section<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

fn lenient_interests<'de, D>(deserializer: D) -> Result<Vec<Interest>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value::<Interest>(item).ok())
        .filter(|interest| interest.name.is_some() || interest.description.is_some())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_structured() -> Value {
        json!({
            "personality": {"tags": ["开朗", "细腻"], "description": "外向"},
            "interests": [{"name": "摄影", "level": "高", "description": "常拍街景"}],
            "lifestyle": {"habits": ["早起"], "description": "规律"},
            "values": {"career": "上进", "relationship": "专一", "family": "重视", "life": "乐观"},
            "emotion": {"state": "稳定", "description": "平和"},
            "suggestions": {
                "topics": ["旅行"],
                "openings": ["你好"],
                "dating": {"places": ["咖啡馆"], "activities": ["看展"]},
                "warnings": ["别太急"],
                "strategy": ["先做朋友"]
            }
        })
    }

    #[test]
    fn from_value_reads_all_sections() {
        let report = AnalysisReport::from_value(&full_structured());

        assert_eq!(
            report.personality.as_ref().map(|p| p.tags.clone()),
            Some(vec!["开朗".to_string(), "细腻".to_string()])
        );
        assert_eq!(report.interests.len(), 1);
        assert_eq!(report.interests[0].level.as_deref(), Some("高"));
        assert_eq!(
            report.values.as_ref().and_then(|v| v.life.clone()),
            Some("乐观".to_string())
        );
        let dating = report
            .suggestions
            .as_ref()
            .and_then(|s| s.dating.clone())
            .unwrap();
        assert_eq!(dating.places, vec!["咖啡馆".to_string()]);
        assert!(!report.is_empty());
    }

    #[test]
    fn wrong_typed_fields_degrade_to_absent() {
        let value = json!({
            "personality": "not an object",
            "interests": {"name": "x"},
            "lifestyle": {"habits": "散步", "description": 42},
            "emotion": null
        });

        let report = AnalysisReport::from_value(&value);

        assert!(report.personality.is_none());
        assert!(report.interests.is_empty());
        assert!(report.emotion.is_none());
        let lifestyle = report.lifestyle.unwrap();
        assert_eq!(lifestyle.habits, vec!["散步".to_string()]);
        assert_eq!(lifestyle.description.as_deref(), Some("42"));
    }

    #[test]
    fn non_object_data_yields_empty_report() {
        assert!(AnalysisReport::from_value(&json!([1, 2, 3])).is_empty());
        assert!(AnalysisReport::from_value(&json!("text")).is_empty());
        assert!(AnalysisReport::from_value(&json!({"a": 1})).is_empty());
    }

    #[test]
    fn blank_strings_are_treated_as_missing() {
        let report = AnalysisReport::from_value(&json!({
            "emotion": {"state": "  ", "description": ""},
            "interests": [{"name": "", "level": "低"}]
        }));

        let emotion = report.emotion.unwrap();
        assert!(emotion.state.is_none());
        assert!(emotion.description.is_none());
        assert!(report.interests.is_empty());
    }

    #[test]
    fn envelope_serializes_null_data() {
        let envelope = AnalysisEnvelope::success("narrative", None);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json, json!({"success": true, "raw": "narrative", "data": null}));
    }

    #[test]
    fn envelope_report_uses_data() {
        let envelope = AnalysisEnvelope::success("x", Some(full_structured()));
        assert!(envelope.report().is_some_and(|r| r.suggestions.is_some()));
        assert!(AnalysisEnvelope::success("x", None).report().is_none());
    }
}
