//! JSON extraction from free-form model output
//!
//! Models wrap JSON in prose or markdown fences. Extraction scans from the
//! first `{` and counts brace depth, skipping braces inside string literals,
//! so trailing text after the object is ignored.

use serde_json::Value;

/// Slice of the first balanced `{...}` object in `text`, `None` if unterminated
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extract and parse the first JSON object; non-objects count as absent
pub fn parse_json_object(text: &str) -> Option<Value> {
    let json_str = extract_json_object(text)?;
    match serde_json::from_str::<Value>(json_str) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Brace-matched text is not valid JSON: {}", e);
            None
        }
    }
}

/// String field, or `None` when missing, blank, or not a string
pub fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Array-of-strings field; non-string items are skipped
pub fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Numeric field, accepting numbers encoded as strings
pub fn f64_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_object_with_prose() {
        let text = r#"prefix {"a": {"b": 1}} suffix"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": {"b": 1}}"#));
    }

    #[test]
    fn test_unterminated_is_none() {
        assert_eq!(extract_json_object(r#"here: {"a": {"b": 1}"#), None);
        assert_eq!(extract_json_object("no braces at all"), None);
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"Sure! {"answer": "use {curly} braces \"}\" carefully", "n": 2} done"#;
        let obj = extract_json_object(text).unwrap();
        let value: Value = serde_json::from_str(obj).unwrap();
        assert_eq!(value["n"], 2);
    }

    #[test]
    fn test_markdown_fence() {
        let text = "```json\n{\"answer\": \"ok\"}\n```";
        let value = parse_json_object(text).unwrap();
        assert_eq!(str_field(&value, "answer").as_deref(), Some("ok"));
    }

    #[test]
    fn test_invalid_json_is_none() {
        assert!(parse_json_object("{not: json}").is_none());
    }

    #[test]
    fn test_trailing_second_object_ignored() {
        let text = r#"{"a": 1} and also {"b": 2}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_field_helpers() {
        let value: Value =
            serde_json::from_str(r#"{"s": "  hi ", "blank": " ", "list": ["x", 1, "y"], "n": "0.4"}"#)
                .unwrap();
        assert_eq!(str_field(&value, "s").as_deref(), Some("hi"));
        assert_eq!(str_field(&value, "blank"), None);
        assert_eq!(string_list(&value, "list"), vec!["x", "y"]);
        assert_eq!(f64_field(&value, "n"), Some(0.4));
        assert_eq!(f64_field(&value, "missing"), None);
    }
}
