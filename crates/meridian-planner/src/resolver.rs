//! Reference Resolver (C7, spec §4.7): rewrites a closed set of deictic
//! tokens and phrases in the raw user utterance into the literal value a
//! prior action left behind, before the Action Planner ever sees the text.

use meridian_core::error::{MeridianError, Result};
use meridian_core::types::Context;
use regex::Regex;
use serde_json::Value;

const IMAGE_PHRASES: &[&str] = &["the image", "last image", "that image"];
const FILE_PHRASES: &[&str] = &[
    "the document",
    "the file",
    "last file",
    "last document",
    "that document",
    "that file",
];
const TEXT_PHRASES: &[&str] = &["the text", "last text"];
const PRONOUNS: &[&str] = &["it", "this", "that", "these", "those", "them"];

const IMAGE_SOURCES: &[&str] = &["last_generated_image", "last_saved_image"];
const FILE_SOURCES: &[&str] = &["last_created_file", "last_modified_file", "last_moved_file"];
const TEXT_SOURCES: &[&str] = &["last_generated_text", "last_ocr_text"];
const PRONOUN_SOURCES: &[&str] = &[
    "last_generated_image",
    "last_generated_text",
    "last_created_file",
    "last_ocr_text",
];

/// Resolve the first deictic reference found in `input` against `context`,
/// returning the input with that single reference replaced by its literal
/// value. Input with no deictic reference is returned unchanged.
///
/// Ordinal selectors ("open document 2") are checked first since they are
/// the most specific; phrase-class matches next; bare pronouns last, so
/// "that file" is not eaten by the bare pronoun "that".
pub fn resolve_references(input: &str, context: &Context) -> Result<String> {
    if let Some((start, len, resolved)) = resolve_ordinal(input, context)? {
        return Ok(splice(input, start, len, &resolved));
    }

    for (phrases, sources) in [
        (IMAGE_PHRASES, IMAGE_SOURCES),
        (FILE_PHRASES, FILE_SOURCES),
        (TEXT_PHRASES, TEXT_SOURCES),
    ] {
        if let Some((start, len, phrase)) = find_phrase(input, phrases) {
            let resolved = first_present(context, sources)
                .ok_or_else(|| MeridianError::AmbiguousReference(phrase.to_string()))?;
            return Ok(splice(input, start, len, &resolved));
        }
    }

    if let Some((start, len, word)) = find_word(input, PRONOUNS) {
        let resolved = first_present(context, PRONOUN_SOURCES)
            .ok_or_else(|| MeridianError::AmbiguousReference(word.to_string()))?;
        return Ok(splice(input, start, len, &resolved));
    }

    Ok(input.to_string())
}

fn ordinal_regex() -> Regex {
    Regex::new(r"(?i)\b(?:open|show me|visit)\s+(document|link|site)\s+(\d+)\b").unwrap()
}

fn resolve_ordinal(input: &str, context: &Context) -> Result<Option<(usize, usize, String)>> {
    let re = ordinal_regex();
    let Some(caps) = re.captures(input) else {
        return Ok(None);
    };
    let whole = caps.get(0).unwrap();
    let kind = caps.get(1).unwrap().as_str().to_ascii_lowercase();
    let n: usize = caps.get(2).unwrap().as_str().parse().unwrap_or(0);

    let (array_var, field) = match kind.as_str() {
        "document" => ("last_query_results", "path"),
        _ => ("last_search_results", "url"),
    };

    let value = context
        .get_var(array_var)
        .and_then(Value::as_array)
        .and_then(|items| n.checked_sub(1).and_then(|idx| items.get(idx)))
        .and_then(|item| item.get(field))
        .and_then(Value::as_str);

    match value {
        Some(v) => Ok(Some((whole.start(), whole.len(), v.to_string()))),
        None => Err(MeridianError::AmbiguousReference(format!("{kind} {n}"))),
    }
}

fn find_phrase<'a>(input: &str, phrases: &[&'a str]) -> Option<(usize, usize, &'a str)> {
    let lower = input.to_lowercase();
    phrases
        .iter()
        .filter_map(|phrase| lower.find(phrase).map(|start| (start, phrase.len(), *phrase)))
        .min_by_key(|(start, _, _)| *start)
}

fn find_word<'a>(input: &str, words: &[&'a str]) -> Option<(usize, usize, &'a str)> {
    let lower = input.to_lowercase();
    words
        .iter()
        .filter_map(|word| {
            lower
                .match_indices(word)
                .find(|(idx, _)| is_word_boundary(&lower, *idx, word.len()))
                .map(|(idx, _)| (idx, word.len(), *word))
        })
        .min_by_key(|(start, _, _)| *start)
}

fn is_word_boundary(s: &str, start: usize, len: usize) -> bool {
    let before_ok = s[..start].chars().last().map_or(true, |c| !c.is_alphanumeric());
    let after_ok = s[start + len..].chars().next().map_or(true, |c| !c.is_alphanumeric());
    before_ok && after_ok
}

fn splice(input: &str, start: usize, len: usize, replacement: &str) -> String {
    format!("{}{}{}", &input[..start], replacement, &input[start + len..])
}

fn first_present(context: &Context, sources: &[&str]) -> Option<String> {
    sources.iter().find_map(|name| {
        context.get_var(name).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pronoun_with_no_prior_artifact_is_ambiguous() {
        let ctx = Context::default();
        let err = resolve_references("open it", &ctx).unwrap_err();
        assert!(matches!(err, MeridianError::AmbiguousReference(_)));
    }

    #[test]
    fn pronoun_resolves_to_last_generated_image() {
        let mut ctx = Context::default();
        ctx.set_var("last_generated_image", serde_json::json!("/tmp/cat.png"));
        let resolved = resolve_references("save it to desktop", &ctx).unwrap();
        assert_eq!(resolved, "save /tmp/cat.png to desktop");
    }

    #[test]
    fn phrase_match_takes_priority_over_bare_pronoun() {
        let mut ctx = Context::default();
        ctx.set_var("last_created_file", serde_json::json!("/tmp/notes.txt"));
        let resolved = resolve_references("open that file", &ctx).unwrap();
        assert_eq!(resolved, "open /tmp/notes.txt");
    }

    #[test]
    fn ordinal_document_selector_resolves_from_query_results() {
        let mut ctx = Context::default();
        ctx.set_var(
            "last_query_results",
            serde_json::json!([{"path": "/a.pdf"}, {"path": "/b.pdf"}]),
        );
        let resolved = resolve_references("open document 2", &ctx).unwrap();
        assert_eq!(resolved, "/b.pdf");
    }

    #[test]
    fn input_without_any_deictic_is_unchanged() {
        let ctx = Context::default();
        let resolved = resolve_references("generate a picture of a cat", &ctx).unwrap();
        assert_eq!(resolved, "generate a picture of a cat");
    }
}
