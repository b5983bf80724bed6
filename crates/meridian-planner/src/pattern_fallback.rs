//! Literal pattern fallback (spec §4.6 step 4): used when the LLM reply is
//! malformed or the LLM host is unreachable during planning. Each pattern
//! is a small, independently testable pure function so the fallback path
//! needs no bus to unit test.

use std::collections::BTreeMap;

use meridian_core::types::{Action, ActionKind, Plan};
use regex::Regex;
use serde_json::json;

/// Builds a one-action Plan from a small set of literal command shapes, or
/// a generic chat reply if nothing matches (spec §4.6 step 4's final
/// clause: "one-action plan of kind `llm_generate` with mode `chat`").
///
/// `resolved_input` should already have passed through the Reference
/// Resolver, so an ordinal selector like "open document 2" has already
/// become a literal path by the time it reaches here.
pub fn fallback_plan(original_input: &str, resolved_input: &str) -> Plan {
    if let Some(query) = match_search(resolved_input) {
        return single("search the web", ActionKind::WebSearch, [("query", json!(query))]);
    }

    if let Some(target) = match_open(resolved_input) {
        if looks_like_url(target) {
            return single("open a link", ActionKind::WebSearch, [("query", json!(target))]);
        }
        return single("open a file", ActionKind::FileRead, [("path", json!(target))]);
    }

    single(
        "fall back to a direct chat reply",
        ActionKind::LlmGenerate,
        [("prompt", json!(original_input)), ("mode", json!("chat"))],
    )
}

fn search_regex() -> Regex {
    Regex::new(r"(?i)^search(?: the web)? for (.+)$").unwrap()
}

fn open_regex() -> Regex {
    Regex::new(r"(?i)^open (.+)$").unwrap()
}

fn match_search(input: &str) -> Option<&str> {
    search_regex().captures(input.trim()).map(|c| c.get(1).unwrap().as_str())
}

fn match_open(input: &str) -> Option<&str> {
    open_regex().captures(input.trim()).map(|c| c.get(1).unwrap().as_str())
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn single<const N: usize>(
    explanation: &str,
    kind: ActionKind,
    parameters: [(&str, serde_json::Value); N],
) -> Plan {
    let parameters: BTreeMap<String, serde_json::Value> =
        parameters.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    Plan::single(explanation, Action::new(kind, parameters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_pattern_produces_web_search_action() {
        let plan = fallback_plan("search the web for rust async", "search the web for rust async");
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].kind, ActionKind::WebSearch);
        assert_eq!(plan.actions[0].parameters["query"], json!("rust async"));
    }

    #[test]
    fn open_local_path_produces_file_read_action() {
        let plan = fallback_plan("open it", "open /tmp/notes.txt");
        assert_eq!(plan.actions[0].kind, ActionKind::FileRead);
        assert_eq!(plan.actions[0].parameters["path"], json!("/tmp/notes.txt"));
    }

    #[test]
    fn open_url_produces_web_search_action() {
        let plan = fallback_plan("open it", "open https://example.com");
        assert_eq!(plan.actions[0].kind, ActionKind::WebSearch);
    }

    #[test]
    fn unmatched_input_falls_back_to_chat() {
        let plan = fallback_plan("tell me a joke", "tell me a joke");
        assert_eq!(plan.actions[0].kind, ActionKind::LlmGenerate);
        assert_eq!(plan.actions[0].parameters["mode"], json!("chat"));
    }
}
