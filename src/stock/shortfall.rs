//! Insufficient-stock shortfalls and their recovery from backend errors

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::supabase::PostgrestError;

const MARKER: &str = "insufficient stock";

/// An ingredient whose required quantity exceeds what is on hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortfall {
    #[serde(default)]
    pub ingredient_id: Option<Uuid>,
    #[serde(alias = "name", alias = "ingredient")]
    pub ingredient_name: String,
    #[serde(default, alias = "needed", alias = "required_quantity")]
    pub required: Option<f64>,
    #[serde(default, alias = "on_hand", alias = "available_quantity")]
    pub available: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl Shortfall {
    /// Quantity missing to satisfy the requirement, when both sides are known
    pub fn missing(&self) -> Option<f64> {
        match (self.required, self.available) {
            (Some(required), Some(available)) => Some((required - available).max(0.0)),
            _ => None,
        }
    }
}

/// Recover shortfalls from an RPC error body.
///
/// A structured `details` array wins; otherwise the message (then a textual `details`)
/// is scanned for "insufficient stock" segments. Unrelated errors yield nothing.
pub fn parse_shortfalls(error: &PostgrestError) -> Vec<Shortfall> {
    if let Some(details) = &error.details {
        if let Some(structured) = structured_details(details) {
            return structured;
        }
    }

    let from_message = scan_message(&error.message);
    if !from_message.is_empty() {
        return from_message;
    }

    match error.details.as_ref().and_then(|d| d.as_str()) {
        Some(text) => scan_message(text),
        None => Vec::new(),
    }
}

fn structured_details(details: &serde_json::Value) -> Option<Vec<Shortfall>> {
    let parsed: Vec<Shortfall> = match details {
        serde_json::Value::Array(_) => serde_json::from_value(details.clone()).ok()?,
        serde_json::Value::String(text) => serde_json::from_str(text).ok()?,
        _ => return None,
    };
    (!parsed.is_empty()).then_some(parsed)
}

/// Scan free text such as
/// `Insufficient stock for Flour: required 2.5 kg, available 1 kg; Insufficient stock for Eggs`
pub fn scan_message(message: &str) -> Vec<Shortfall> {
    message
        .split(|c: char| c == ';' || c == '\n')
        .filter_map(parse_segment)
        .collect()
}

fn parse_segment(segment: &str) -> Option<Shortfall> {
    // ASCII lowering keeps byte offsets aligned with the original text
    let lower = segment.to_ascii_lowercase();
    let start = lower.find(MARKER)? + MARKER.len();

    let (name, tail_start) = match lower[start..].find("for ") {
        Some(offset) => {
            let name_start = start + offset + "for ".len();
            let name_end = lower[name_start..]
                .find(|c: char| c == ':' || c == '(' || c == ',')
                .map(|i| name_start + i)
                .unwrap_or(segment.len());
            let name = segment[name_start..name_end]
                .trim()
                .trim_matches(|c: char| c == '"' || c == '\'')
                .to_string();
            (name, name_end)
        }
        None => (String::new(), start),
    };

    let tail = &segment[tail_start..];
    let tail_lower = &lower[tail_start..];

    let required = number_after(tail, tail_lower, &["required", "needed", "need"]);
    let available = number_after(tail, tail_lower, &["available", "on hand", "have"]);

    Some(Shortfall {
        ingredient_id: None,
        ingredient_name: name,
        required: required.map(|(value, _)| value),
        available: available.map(|(value, _)| value),
        unit: required.and_then(|(_, unit)| unit).map(str::to_string),
    })
}

/// First number following any keyword, plus the unit word right after it
fn number_after<'a>(text: &'a str, lower: &str, keywords: &[&str]) -> Option<(f64, Option<&'a str>)> {
    let after = keywords
        .iter()
        .find_map(|kw| lower.find(*kw).map(|i| i + kw.len()))?;

    let rest = &text[after..];
    let mut begin = rest.find(|c: char| c.is_ascii_digit())?;
    if rest[..begin].ends_with('-') {
        begin -= 1;
    }
    let digits = &rest[begin..];

    // A dot only belongs to the number when a digit follows it ("available 1.5." ends at 1.5)
    let bytes = digits.as_bytes();
    let mut len = 0;
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(len) {
        match b {
            b'0'..=b'9' => {}
            b'-' if len == 0 => {}
            b'.' if !seen_dot && bytes.get(len + 1).is_some_and(u8::is_ascii_digit) => seen_dot = true,
            _ => break,
        }
        len += 1;
    }
    let value: f64 = digits[..len].parse().ok()?;

    let unit = digits[len..]
        .trim_start()
        .split(|c: char| !c.is_alphabetic())
        .next()
        .filter(|word| !word.is_empty());

    Some((value, unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error(message: &str, details: Option<serde_json::Value>) -> PostgrestError {
        PostgrestError {
            code: Some("P0001".to_string()),
            message: message.to_string(),
            details,
            hint: None,
        }
    }

    #[test]
    fn message_with_amounts_and_units() {
        let found = parse_shortfalls(&error(
            "Insufficient stock for Flour: required 2.5 kg, available 1 kg",
            None,
        ));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ingredient_name, "Flour");
        assert_eq!(found[0].required, Some(2.5));
        assert_eq!(found[0].available, Some(1.0));
        assert_eq!(found[0].unit.as_deref(), Some("kg"));
        assert_eq!(found[0].missing(), Some(1.5));
    }

    #[test]
    fn several_segments_and_bare_mentions() {
        let found = scan_message(
            "insufficient stock for \"Mozzarella\" (need 3, have 0.5); Insufficient stock for Basil",
        );
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].ingredient_name, "Mozzarella");
        assert_eq!(found[0].required, Some(3.0));
        assert_eq!(found[0].available, Some(0.5));
        assert_eq!(found[1].ingredient_name, "Basil");
        assert_eq!(found[1].required, None);
        assert_eq!(found[1].missing(), None);
    }

    #[test]
    fn sentence_ending_dot_is_not_part_of_the_number() {
        let found = scan_message("Insufficient stock for Flour: required 2.5, available 1.5.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].required, Some(2.5));
        assert_eq!(found[0].available, Some(1.5));

        let found = scan_message("Insufficient stock for Eggs: need 12. Have 3.");
        assert_eq!(found[0].required, Some(12.0));
        assert_eq!(found[0].available, Some(3.0));
    }

    #[test]
    fn structured_details_take_precedence() {
        let id = Uuid::new_v4();
        let found = parse_shortfalls(&error(
            "Insufficient stock for Salt",
            Some(json!([{ "ingredient_id": id, "name": "Tomatoes", "needed": 4, "on_hand": 1, "unit": "kg" }])),
        ));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ingredient_id, Some(id));
        assert_eq!(found[0].ingredient_name, "Tomatoes");
        assert_eq!(found[0].missing(), Some(3.0));
    }

    #[test]
    fn textual_details_are_scanned_when_message_is_generic() {
        let found = parse_shortfalls(&error(
            "sale rejected",
            Some(json!("Insufficient stock for Rice: needed 10, available 2")),
        ));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ingredient_name, "Rice");
        assert_eq!(found[0].required, Some(10.0));
    }

    #[test]
    fn unrelated_errors_have_no_shortfalls() {
        assert!(parse_shortfalls(&error("duplicate key value violates unique constraint", None)).is_empty());
        assert!(parse_shortfalls(&error("permission denied", Some(json!({"table": "sales"})))).is_empty());
    }
}
