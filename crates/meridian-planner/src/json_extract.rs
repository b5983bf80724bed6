//! Tolerant JSON-object extraction (spec §4.6 step 2): the LLM planning
//! reply is allowed to wrap its JSON in prose ("Sure, here's the plan:
//! { ... } Let me know if..."), so pull out the first balanced `{...}`
//! span, string- and escape-aware, and parse only that.

use serde_json::Value;

/// Returns the first balanced top-level JSON object substring in `text`,
/// or `None` if no `{` ever closes.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
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

/// Extracts and parses the first balanced JSON object in `text`.
pub fn parse_first_json_object(text: &str) -> Option<Value> {
    extract_first_json_object(text).and_then(|s| serde_json::from_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let text = r#"Sure, here's the plan: {"explanation":"ok","actions":[]} let me know!"#;
        let extracted = extract_first_json_object(text).unwrap();
        assert_eq!(extracted, r#"{"explanation":"ok","actions":[]}"#);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_depth_tracking() {
        let text = r#"{"explanation":"use a { brace } in prose","actions":[]}"#;
        let extracted = extract_first_json_object(text).unwrap();
        assert_eq!(extracted, text);
    }

    #[test]
    fn returns_none_when_no_object_present() {
        assert!(extract_first_json_object("no json here").is_none());
    }

    #[test]
    fn parses_nested_objects() {
        let text = r#"prefix {"a": {"b": 1}} suffix"#;
        let value = parse_first_json_object(text).unwrap();
        assert_eq!(value["a"]["b"], 1);
    }
}
