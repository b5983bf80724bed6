//! Pattern registry (spec §4.10 strategy 1): typed matchers tried in
//! registration order, each returning at most one Suggestion synchronously.
//! Shaped after the teacher's `HookEngine::emit_before` priority chain —
//! generalized from "intercept and maybe block" to "observe and maybe
//! suggest", so there is no Block/Modify action, just a first hit wins.

use meridian_core::types::Suggestion;
use meridian_timeline::TimelineEvent;
use regex::Regex;

pub trait SuggestionMatcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn try_match(&self, event: &TimelineEvent) -> Option<Suggestion>;
}

/// Suggests inspecting a freshly cloned repository (the example matcher
/// named directly in spec §4.10).
pub struct GitCloneMatcher {
    pattern: Regex,
}

impl GitCloneMatcher {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)\bgit\s+clone\s+\S+").unwrap(),
        }
    }
}

impl Default for GitCloneMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionMatcher for GitCloneMatcher {
    fn name(&self) -> &'static str {
        "git_clone"
    }

    fn try_match(&self, event: &TimelineEvent) -> Option<Suggestion> {
        let command = event.data.get("command")?.as_str()?;
        if !self.pattern.is_match(command) {
            return None;
        }
        Some(
            Suggestion::new(
                "git_clone_inspect",
                "New repository cloned",
                "Want me to open the cloned directory and summarize it?",
            )
            .with_action("Inspect it", "document_query:."),
        )
    }
}

/// Suggests running a package install after a manifest-looking file write
/// (e.g. `package.json`, `Cargo.toml`).
pub struct ManifestWriteMatcher {
    pattern: Regex,
}

impl ManifestWriteMatcher {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)(package\.json|cargo\.toml|requirements\.txt)$").unwrap(),
        }
    }
}

impl Default for ManifestWriteMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionMatcher for ManifestWriteMatcher {
    fn name(&self) -> &'static str {
        "manifest_write"
    }

    fn try_match(&self, event: &TimelineEvent) -> Option<Suggestion> {
        let path = event.data.get("path")?.as_str()?;
        let op = event.data.get("op")?.as_str()?;
        if op != "created" && op != "modified" {
            return None;
        }
        if !self.pattern.is_match(path) {
            return None;
        }
        Some(Suggestion::new(
            "manifest_write_install",
            "Dependency manifest changed",
            "Looks like you edited a dependency manifest — want me to reinstall?",
        ))
    }
}

/// Ordered registry of matchers tried until one returns `Some`.
pub struct MatcherRegistry {
    matchers: Vec<Box<dyn SuggestionMatcher>>,
}

impl MatcherRegistry {
    pub fn new(matchers: Vec<Box<dyn SuggestionMatcher>>) -> Self {
        Self { matchers }
    }

    pub fn with_defaults() -> Self {
        Self::new(vec![Box::new(GitCloneMatcher::new()), Box::new(ManifestWriteMatcher::new())])
    }

    pub fn try_match(&self, event: &TimelineEvent) -> Option<Suggestion> {
        self.matchers.iter().find_map(|m| m.try_match(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_timeline::EventKind;
    use serde_json::json;

    fn event(kind: EventKind, data: serde_json::Value) -> TimelineEvent {
        TimelineEvent::new(kind, "test", data)
    }

    #[test]
    fn git_clone_matcher_fires_on_clone_command() {
        let matcher = GitCloneMatcher::new();
        let e = event(EventKind::Command, json!({"command": "git clone https://example.com/repo.git"}));
        assert!(matcher.try_match(&e).is_some());
    }

    #[test]
    fn git_clone_matcher_ignores_unrelated_commands() {
        let matcher = GitCloneMatcher::new();
        let e = event(EventKind::Command, json!({"command": "ls -la"}));
        assert!(matcher.try_match(&e).is_none());
    }

    #[test]
    fn registry_returns_first_matching_suggestion() {
        let registry = MatcherRegistry::with_defaults();
        let e = event(EventKind::Command, json!({"command": "git clone https://x/y.git"}));
        let suggestion = registry.try_match(&e).unwrap();
        assert_eq!(suggestion.id, "git_clone_inspect");
    }
}
