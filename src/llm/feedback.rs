//! Feedback parsing with field-level fallback.
//!
//! Model output is supposed to be a single JSON object, but it often arrives
//! wrapped in prose or a fenced code block, and sometimes not at all.
//! [`parse_feedback`] never fails: it extracts what it can and fills every
//! missing field with a default, so callers always get a renderable
//! [`Feedback`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Used when the model gives no usable `message`.
pub const DEFAULT_MESSAGE: &str = "伝（つた）わりましたよ！";

/// Used when the model gives no usable `encouragement`.
pub const DEFAULT_ENCOURAGEMENT: &str = "この調子（ちょうし）で頑張（がんば）りましょう！";

/// Structured advice for one attempt.  `message` and `encouragement` are
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub message: String,
    pub good_points: Vec<String>,
    pub improvement_tip: String,
    pub encouragement: String,
}

impl Feedback {
    /// The feedback returned when nothing could be parsed.
    pub fn fallback() -> Self {
        Self {
            message: DEFAULT_MESSAGE.to_string(),
            good_points: Vec::new(),
            improvement_tip: String::new(),
            encouragement: DEFAULT_ENCOURAGEMENT.to_string(),
        }
    }
}

/// The substring from the first `{` to the last `}`, if any.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Turn raw model output into [`Feedback`], applying defaults per field.
pub fn parse_feedback(raw: &str) -> Feedback {
    let parsed = extract_json_object(raw).and_then(|json| serde_json::from_str::<Value>(json).ok());

    let Some(Value::Object(fields)) = parsed else {
        log::warn!(
            "feedback: no JSON object in model output (len={}), using defaults",
            raw.len()
        );
        return Feedback::fallback();
    };

    let text = |key: &str| -> Option<String> {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let good_points = match fields.get("goodPoints") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Feedback {
        message: text("message").unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
        good_points,
        improvement_tip: text("improvementTip").unwrap_or_default(),
        encouragement: text("encouragement").unwrap_or_else(|| DEFAULT_ENCOURAGEMENT.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_is_extracted() {
        let raw = "Here you go: ```json\n{\"message\":\"OK\",\"goodPoints\":[\"a\"],\"improvementTip\":\"\",\"encouragement\":\"Keep going\"}\n```";
        assert_eq!(
            parse_feedback(raw),
            Feedback {
                message: "OK".into(),
                good_points: vec!["a".into()],
                improvement_tip: String::new(),
                encouragement: "Keep going".into(),
            }
        );
    }

    #[test]
    fn refusal_falls_back_to_defaults() {
        let feedback = parse_feedback("I cannot help with that");
        assert!(!feedback.message.is_empty());
        assert!(!feedback.encouragement.is_empty());
        assert!(feedback.good_points.is_empty());
        assert_eq!(feedback.improvement_tip, "");
    }

    #[test]
    fn broken_json_falls_back_to_defaults() {
        assert_eq!(parse_feedback("{\"message\": \"OK\", "), Feedback::fallback());
        assert_eq!(parse_feedback("} backwards {"), Feedback::fallback());
    }

    #[test]
    fn missing_fields_get_defaults() {
        let feedback = parse_feedback(r#"{"improvementTip": "ゆっくり話しましょう"}"#);
        assert_eq!(feedback.message, DEFAULT_MESSAGE);
        assert_eq!(feedback.encouragement, DEFAULT_ENCOURAGEMENT);
        assert!(feedback.good_points.is_empty());
        assert_eq!(feedback.improvement_tip, "ゆっくり話しましょう");
    }

    #[test]
    fn empty_and_mistyped_fields_get_defaults() {
        let feedback = parse_feedback(
            r#"{"message": "  ", "goodPoints": "great", "improvementTip": 3, "encouragement": null}"#,
        );
        assert_eq!(feedback, Feedback::fallback());
    }

    #[test]
    fn non_string_good_points_are_skipped() {
        let feedback = parse_feedback(r#"{"goodPoints": ["はっきり", 1, "", "リズム"]}"#);
        assert_eq!(feedback.good_points, vec!["はっきり", "リズム"]);
    }

    #[test]
    fn prose_around_object_is_ignored() {
        let raw = "Sure!\n{\"message\": \"伝わりましたよ！\", \"goodPoints\": [], \"improvementTip\": \"「す」を弱く\", \"encouragement\": \"がんばって\"}\nHope this helps.";
        let feedback = parse_feedback(raw);
        assert_eq!(feedback.message, "伝わりましたよ！");
        assert_eq!(feedback.improvement_tip, "「す」を弱く");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(Feedback::fallback()).unwrap();
        assert!(json.get("goodPoints").unwrap().is_array());
        assert!(json.get("improvementTip").is_some());
    }
}
