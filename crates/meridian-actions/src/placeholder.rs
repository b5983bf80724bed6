use std::collections::BTreeMap;

use meridian_core::error::{MeridianError, Result};
use meridian_core::types::{ActionId, Context};
use regex::Regex;
use serde_json::Value;

/// Resolution order for a `{name}`/`{{name}}` placeholder (spec §4.5):
/// prior-action outputs (by `depends_on`) -> `Context.Variables` -> a
/// reserved set. Both brace forms refer to the same name.
pub struct Resolver<'a> {
    prior_outputs: BTreeMap<&'a str, &'a Value>,
    context: &'a Context,
    reserved: BTreeMap<&'static str, String>,
}

impl<'a> Resolver<'a> {
    pub fn new(context: &'a Context, working_directory: &str, user: &str, host: &str) -> Self {
        let mut reserved = BTreeMap::new();
        reserved.insert("working_directory", working_directory.to_string());
        reserved.insert("user", user.to_string());
        reserved.insert("host", host.to_string());
        Self {
            prior_outputs: BTreeMap::new(),
            context,
            reserved,
        }
    }

    /// Make a prior action's output map visible to later placeholder lookups.
    pub fn bind_outputs(&mut self, outputs: &'a BTreeMap<String, Value>) {
        for (k, v) in outputs {
            self.prior_outputs.insert(k.as_str(), v);
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.prior_outputs.get(name) {
            return Some((*v).clone());
        }
        if let Some(v) = self.context.variables.get(name) {
            return Some(v.clone());
        }
        self.reserved.get(name).map(|s| Value::String(s.clone()))
    }

    /// Substitute every placeholder in `raw` and parse the result back into
    /// a JSON value. A parameter that is *exactly* one placeholder resolves
    /// to the referenced value's native type (so a number or object stays a
    /// number or object); placeholders embedded in a longer string are
    /// stringified and spliced in.
    pub fn resolve_value(&self, action_id: &ActionId, raw: &Value) -> Result<Value> {
        match raw {
            Value::String(s) => self.resolve_string(action_id, s),
            Value::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|v| self.resolve_value(action_id, v))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.resolve_value(action_id, v)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&self, action_id: &ActionId, s: &str) -> Result<Value> {
        if let Some(name) = whole_placeholder(s) {
            return self
                .lookup(name)
                .ok_or_else(|| MeridianError::UnboundPlaceholder {
                    action_id: action_id.clone(),
                    name: name.to_string(),
                });
        }

        let re = placeholder_regex();
        let mut err = None;
        let substituted = re.replace_all(s, |caps: &regex::Captures| {
            let name = &caps[1];
            match self.lookup(name) {
                Some(Value::String(s)) => s,
                Some(v) => v.to_string(),
                None => {
                    err = Some(name.to_string());
                    String::new()
                }
            }
        });

        if let Some(name) = err {
            return Err(MeridianError::UnboundPlaceholder {
                action_id: action_id.clone(),
                name,
            });
        }
        Ok(Value::String(substituted.into_owned()))
    }
}

fn placeholder_regex() -> Regex {
    Regex::new(r"\{\{?(\w+)\}?\}").unwrap()
}

/// If `s` is exactly one `{name}` or `{{name}}` placeholder with nothing
/// else around it, return the name — this preserves native types (numbers,
/// objects) instead of stringifying them.
fn whole_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("{{").and_then(|r| r.strip_suffix("}}"));
    let inner = inner.or_else(|| s.strip_prefix('{').and_then(|r| r.strip_suffix('}')));
    inner.filter(|name| !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

/// Substitute placeholders through every parameter of an action's payload.
pub fn resolve_parameters(
    resolver: &Resolver<'_>,
    action_id: &ActionId,
    parameters: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>> {
    parameters
        .iter()
        .map(|(k, v)| Ok((k.clone(), resolver.resolve_value(action_id, v)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::types::Context;

    #[test]
    fn whole_placeholder_preserves_native_type() {
        let mut ctx = Context::default();
        ctx.set_var("count", serde_json::json!(5));
        let resolver = Resolver::new(&ctx, "/home/x", "alice", "desk");
        let out = resolver.resolve_value(&"a1".to_string(), &serde_json::json!("{count}")).unwrap();
        assert_eq!(out, serde_json::json!(5));
    }

    #[test]
    fn double_brace_is_equivalent_to_single() {
        let mut ctx = Context::default();
        ctx.set_var("name", serde_json::json!("world"));
        let resolver = Resolver::new(&ctx, "/home/x", "alice", "desk");
        let a = resolver.resolve_value(&"a1".to_string(), &serde_json::json!("{name}")).unwrap();
        let b = resolver.resolve_value(&"a1".to_string(), &serde_json::json!("{{name}}")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unresolved_placeholder_fails_with_action_id() {
        let ctx = Context::default();
        let resolver = Resolver::new(&ctx, "/home/x", "alice", "desk");
        let err = resolver
            .resolve_value(&"a7".to_string(), &serde_json::json!("{missing}"))
            .unwrap_err();
        match err {
            MeridianError::UnboundPlaceholder { action_id, name } => {
                assert_eq!(action_id, "a7");
                assert_eq!(name, "missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reserved_variables_resolve() {
        let ctx = Context::default();
        let resolver = Resolver::new(&ctx, "/home/alice", "alice", "desk01");
        let out = resolver.resolve_value(&"a1".to_string(), &serde_json::json!("{working_directory}/x")).unwrap();
        assert_eq!(out, serde_json::json!("/home/alice/x"));
    }
}
