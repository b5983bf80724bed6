//! Action Planner (C6, spec §4.6): turns `(user_input, Context)` into a
//! Plan. Never executes anything itself.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use meridian_bus::Bus;
use meridian_core::error::MeridianError;
use meridian_core::types::{Action, ActionKind, Context, Plan};
use meridian_protocol::subjects;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::catalog::{catalog, render_prompt_block};
use crate::json_extract::parse_first_json_object;
use crate::pattern_fallback::fallback_plan;
use crate::resolver::resolve_references;

const PLANNING_TIMEOUT: Duration = Duration::from_secs(30);

/// A planned reply along with whether it came from the pattern fallback
/// because the LLM host was unreachable (spec §4.8's Open Question on
/// signalling planner degradation to the Conversation Engine).
pub struct PlanOutcome {
    pub plan: Plan,
    pub llm_unreachable: bool,
}

pub struct Planner<'a> {
    bus: &'a dyn Bus,
}

impl<'a> Planner<'a> {
    pub fn new(bus: &'a dyn Bus) -> Self {
        Self { bus }
    }

    pub async fn plan(
        &self,
        user_input: &str,
        context: &Context,
        working_directory: &str,
    ) -> PlanOutcome {
        let (resolved_input, ambiguity_hint) = match resolve_references(user_input, context) {
            Ok(resolved) => (resolved, None),
            Err(MeridianError::AmbiguousReference(token)) => (user_input.to_string(), Some(token)),
            Err(_) => (user_input.to_string(), None),
        };

        let system_prompt = build_system_prompt(context, ambiguity_hint.as_deref());
        let payload = json!({
            "mode": "plan",
            "system": system_prompt,
            "prompt": resolved_input,
            "working_directory": working_directory,
        });

        let reply = match self.bus.request(subjects::LLM_REQUEST, payload, PLANNING_TIMEOUT).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "llm host unreachable during planning, using pattern fallback");
                return PlanOutcome {
                    plan: fallback_plan(user_input, &resolved_input),
                    llm_unreachable: true,
                };
            }
        };

        let text = reply.get("text").and_then(Value::as_str).unwrap_or_default();
        let Some(raw_value) = parse_first_json_object(text) else {
            tracing::warn!("planner reply had no extractable JSON object, using pattern fallback");
            return PlanOutcome {
                plan: fallback_plan(user_input, &resolved_input),
                llm_unreachable: false,
            };
        };

        let raw_plan: RawPlan = match serde_json::from_value(raw_value) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "planner reply JSON did not match the plan shape, using pattern fallback");
                return PlanOutcome {
                    plan: fallback_plan(user_input, &resolved_input),
                    llm_unreachable: false,
                };
            }
        };

        match build_plan(raw_plan, context) {
            Ok(plan) => PlanOutcome { plan, llm_unreachable: false },
            Err(e) => {
                tracing::warn!(error = %e, "planner reply failed validation, using pattern fallback");
                PlanOutcome {
                    plan: fallback_plan(user_input, &resolved_input),
                    llm_unreachable: false,
                }
            }
        }
    }
}

fn build_system_prompt(context: &Context, ambiguity_hint: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are a planning engine. Reply with exactly one JSON object \
         shaped {\"explanation\": string, \"actions\": [{\"id\": string, \
         \"kind\": string, \"parameters\": object, \"depends_on\": [string]}]}.\n\n",
    );
    prompt.push_str(&render_prompt_block());
    prompt.push_str("\nCurrent Context.Variables:\n");
    prompt.push_str(&serde_json::to_string(&context.variables).unwrap_or_default());
    if let Some(hint) = ambiguity_hint {
        prompt.push_str(&format!(
            "\n\nThe user's reference '{hint}' could not be resolved from Context. \
             If your plan depends on it, ask a clarifying question instead via a \
             single llm_generate action.",
        ));
    }
    prompt
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    explanation: String,
    actions: Vec<RawAction>,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    #[serde(default)]
    id: Option<String>,
    kind: String,
    #[serde(default)]
    parameters: BTreeMap<String, Value>,
    #[serde(default)]
    depends_on: Vec<String>,
}

/// Validates and converts one LLM plan reply into a real `Plan` (spec §4.6
/// step 3): every kind must be known, and every placeholder must be
/// resolvable from Context or an earlier action's declared output.
/// `needs_approval` is never read from the reply — `Action::new` always
/// recomputes it from the kind.
fn build_plan(raw: RawPlan, context: &Context) -> Result<Plan, MeridianError> {
    let mut local_to_generated: BTreeMap<String, String> = BTreeMap::new();
    let mut actions = Vec::with_capacity(raw.actions.len());

    for (index, raw_action) in raw.actions.iter().enumerate() {
        let kind: ActionKind = raw_action
            .kind
            .parse()
            .map_err(|_| MeridianError::InvalidInput(format!("unknown action kind '{}'", raw_action.kind)))?;
        let action = Action::new(kind, raw_action.parameters.clone());
        let local_id = raw_action.id.clone().unwrap_or_else(|| index.to_string());
        local_to_generated.insert(local_id, action.id.clone());
        actions.push(action);
    }

    for (action, raw_action) in actions.iter_mut().zip(&raw.actions) {
        let mut resolved_deps = Vec::with_capacity(raw_action.depends_on.len());
        for dep in &raw_action.depends_on {
            let generated = local_to_generated
                .get(dep)
                .ok_or_else(|| MeridianError::InvalidInput(format!("depends_on references unknown action id '{dep}'")))?;
            resolved_deps.push(generated.clone());
        }
        action.depends_on = resolved_deps;
    }

    check_placeholders_resolvable(&actions, context)?;

    Ok(Plan {
        explanation: raw.explanation,
        actions,
    })
}

fn placeholder_regex() -> Regex {
    Regex::new(r"\{\{?(\w+)\}?\}").unwrap()
}

fn collect_placeholders(value: &Value, names: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            for caps in placeholder_regex().captures_iter(s) {
                names.insert(caps[1].to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_placeholders(v, names)),
        Value::Object(map) => map.values().for_each(|v| collect_placeholders(v, names)),
        _ => {}
    }
}

const RESERVED_NAMES: &[&str] = &["working_directory", "user", "host"];

fn check_placeholders_resolvable(actions: &[Action], context: &Context) -> Result<(), MeridianError> {
    let mut known: BTreeSet<String> = context.variables.keys().cloned().collect();
    known.extend(RESERVED_NAMES.iter().map(|s| s.to_string()));

    for action in actions {
        let mut referenced = BTreeSet::new();
        for value in action.parameters.values() {
            collect_placeholders(value, &mut referenced);
        }
        for name in &referenced {
            if !known.contains(name) {
                return Err(MeridianError::UnboundPlaceholder {
                    action_id: action.id.clone(),
                    name: name.clone(),
                });
            }
        }
        if let Some(spec) = catalog().iter().find(|spec| spec.kind == action.kind) {
            if let Some(output) = spec.output_variable {
                known.insert(output.to_string());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_action_kind() {
        let raw = RawPlan {
            explanation: "x".into(),
            actions: vec![RawAction {
                id: None,
                kind: "not_a_real_kind".into(),
                parameters: BTreeMap::new(),
                depends_on: vec![],
            }],
        };
        let err = build_plan(raw, &Context::default()).unwrap_err();
        assert!(matches!(err, MeridianError::InvalidInput(_)));
    }

    #[test]
    fn depends_on_remaps_local_ids_to_generated_ids() {
        let raw = RawPlan {
            explanation: "generate then save".into(),
            actions: vec![
                RawAction {
                    id: Some("gen".into()),
                    kind: "image_generate".into(),
                    parameters: BTreeMap::from([("prompt".to_string(), json!("a cat"))]),
                    depends_on: vec![],
                },
                RawAction {
                    id: Some("save".into()),
                    kind: "image_save".into(),
                    parameters: BTreeMap::from([
                        ("source_path".to_string(), json!("{last_generated_image}")),
                        ("destination_path".to_string(), json!("~/Desktop/cat.png")),
                    ]),
                    depends_on: vec!["gen".into()],
                },
            ],
        };
        let plan = build_plan(raw, &Context::default()).unwrap();
        assert_eq!(plan.actions[1].depends_on, vec![plan.actions[0].id.clone()]);
    }

    #[test]
    fn unbound_placeholder_fails_validation() {
        let raw = RawPlan {
            explanation: "x".into(),
            actions: vec![RawAction {
                id: None,
                kind: "file_read".into(),
                parameters: BTreeMap::from([("path".to_string(), json!("{nonexistent}"))]),
                depends_on: vec![],
            }],
        };
        let err = build_plan(raw, &Context::default()).unwrap_err();
        assert!(matches!(err, MeridianError::UnboundPlaceholder { .. }));
    }
}
