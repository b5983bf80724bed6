use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use meridian_core::error::{MeridianError, Result};
use meridian_core::types::{ActionId, ActionResult, Context, Plan};
use tokio_util::sync::CancellationToken;

use crate::handler::{ActionHandler, ExecutionContext};
use crate::placeholder::{resolve_parameters, Resolver};

/// Drives one Plan's Actions through their handlers in order (spec §4.5
/// steps 1-4): substitute placeholders, dispatch, record the result and
/// merge its outputs into Context, then halt any action whose `depends_on`
/// reached a failure while letting independent actions continue.
pub struct Orchestrator<'a> {
    registry: &'a BTreeMap<&'static str, Box<dyn ActionHandler>>,
    bus: &'a dyn meridian_bus::Bus,
    user: String,
    host: String,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        registry: &'a BTreeMap<&'static str, Box<dyn ActionHandler>>,
        bus: &'a dyn meridian_bus::Bus,
        user: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            bus,
            user: user.into(),
            host: host.into(),
        }
    }

    /// Executes every Action in `plan` against `context`, mutating it in
    /// place with each action's `ActionResult`. Returns
    /// `Err(ApprovalRequired)` before touching anything if the plan has an
    /// unapproved action that needs approval and `approved` is false.
    pub async fn execute_plan(
        &self,
        plan: &Plan,
        context: &mut Context,
        working_directory: PathBuf,
        approved: bool,
        cancellation: CancellationToken,
    ) -> Result<Vec<ActionResult>> {
        if plan.needs_approval() && !approved {
            return Err(MeridianError::ApprovalRequired);
        }

        let mut results = Vec::with_capacity(plan.actions.len());
        let mut failed: BTreeSet<ActionId> = BTreeSet::new();

        for action in &plan.actions {
            if cancellation.is_cancelled() {
                results.push(ActionResult::cancelled(action.id.clone(), chrono::Utc::now()));
                continue;
            }

            if action.depends_on.iter().any(|dep| failed.contains(dep)) {
                let result = ActionResult::failed(
                    action.id.clone(),
                    "skipped: a dependency failed",
                    chrono::Utc::now(),
                );
                failed.insert(action.id.clone());
                results.push(result);
                continue;
            }

            let handler = match self.registry.get(action.kind.as_str()) {
                Some(h) => h,
                None => {
                    let result = ActionResult::failed(
                        action.id.clone(),
                        format!("no handler registered for {}", action.kind),
                        chrono::Utc::now(),
                    );
                    failed.insert(action.id.clone());
                    results.push(result);
                    continue;
                }
            };

            let mut resolver = Resolver::new(
                context,
                &working_directory.to_string_lossy(),
                &self.user,
                &self.host,
            );
            for dep in &action.depends_on {
                if let Some(result) = context.results.get(dep) {
                    resolver.bind_outputs(&result.outputs);
                }
            }

            let started_at = chrono::Utc::now();
            let outcome = match resolve_parameters(&resolver, &action.id, &action.parameters) {
                Ok(parameters) => {
                    let exec_ctx = ExecutionContext {
                        bus: self.bus,
                        working_directory: working_directory.clone(),
                        cancellation: cancellation.clone(),
                    };
                    self.dispatch_with_retry(handler.as_ref(), &parameters, &exec_ctx, action.kind.is_idempotent())
                        .await
                }
                Err(e) => Err(e),
            };

            let result = match outcome {
                Ok(handler_outcome) => {
                    // `context_updates` is the subset of outputs that become
                    // Context.Variables (spec §4.5); `merge_result` only reads
                    // `ActionResult.outputs`, so fold both into one map here.
                    let mut outputs = handler_outcome.outputs;
                    outputs.extend(handler_outcome.context_updates);
                    ActionResult::ok(action.id.clone(), outputs, started_at)
                }
                Err(MeridianError::Cancelled) => ActionResult::cancelled(action.id.clone(), started_at),
                Err(e) => {
                    failed.insert(action.id.clone());
                    ActionResult::failed(action.id.clone(), e.to_string(), started_at)
                }
            };

            context.merge_result(result.clone());
            results.push(result);
        }

        Ok(results)
    }

    async fn dispatch_with_retry(
        &self,
        handler: &dyn ActionHandler,
        parameters: &BTreeMap<String, serde_json::Value>,
        ctx: &ExecutionContext<'_>,
        idempotent: bool,
    ) -> Result<crate::handler::HandlerOutcome> {
        match handler.execute(parameters, ctx).await {
            Err(MeridianError::Timeout { .. }) if idempotent => handler.execute(parameters, ctx).await,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use meridian_bus::LoopbackBus;
    use meridian_core::types::{Action, ActionKind};
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl ActionHandler for EchoHandler {
        fn kind(&self) -> &'static str {
            "llm_generate"
        }

        async fn execute(
            &self,
            parameters: &BTreeMap<String, serde_json::Value>,
            _ctx: &ExecutionContext<'_>,
        ) -> Result<crate::handler::HandlerOutcome> {
            let prompt = parameters.get("prompt").cloned().unwrap_or(json!(""));
            Ok(crate::handler::HandlerOutcome::new()
                .with_output("text", prompt.clone())
                .with_context_var("last_generated_text", prompt))
        }
    }

    struct AlwaysFailHandler;

    #[async_trait]
    impl ActionHandler for AlwaysFailHandler {
        fn kind(&self) -> &'static str {
            "file_delete"
        }

        async fn execute(
            &self,
            _parameters: &BTreeMap<String, serde_json::Value>,
            _ctx: &ExecutionContext<'_>,
        ) -> Result<crate::handler::HandlerOutcome> {
            Err(MeridianError::BackendError("boom".into()))
        }
    }

    fn registry() -> BTreeMap<&'static str, Box<dyn ActionHandler>> {
        let mut r: BTreeMap<&'static str, Box<dyn ActionHandler>> = BTreeMap::new();
        r.insert("llm_generate", Box::new(EchoHandler));
        r.insert("file_delete", Box::new(AlwaysFailHandler));
        r
    }

    #[tokio::test]
    async fn plan_needing_approval_is_rejected_when_unapproved() {
        let bus = LoopbackBus::default();
        let reg = registry();
        let orch = Orchestrator::new(&reg, &bus, "alice", "desk01");
        let mut ctx = Context::default();
        let action = Action::new(ActionKind::FileDelete, BTreeMap::from([("path".into(), json!("/tmp/x"))]));
        let plan = Plan::single("delete a file", action);

        let err = orch
            .execute_plan(&plan, &mut ctx, PathBuf::from("/tmp"), false, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MeridianError::ApprovalRequired));
    }

    #[tokio::test]
    async fn successful_action_merges_outputs_into_context() {
        let bus = LoopbackBus::default();
        let reg = registry();
        let orch = Orchestrator::new(&reg, &bus, "alice", "desk01");
        let mut ctx = Context::default();
        let action = Action::new(ActionKind::LlmGenerate, BTreeMap::from([("prompt".into(), json!("hi"))]));
        let plan = Plan::single("say hi", action);

        let results = orch
            .execute_plan(&plan, &mut ctx, PathBuf::from("/tmp"), true, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(ctx.get_var_str("last_generated_text").unwrap(), "hi");
    }

    #[tokio::test]
    async fn dependent_action_is_skipped_after_failure() {
        let bus = LoopbackBus::default();
        let reg = registry();
        let orch = Orchestrator::new(&reg, &bus, "alice", "desk01");
        let mut ctx = Context::default();

        let first = Action::new(ActionKind::FileDelete, BTreeMap::from([("path".into(), json!("/tmp/a"))]));
        let first_id = first.id.clone();
        let second = Action::new(ActionKind::LlmGenerate, BTreeMap::from([("prompt".into(), json!("hi"))]))
            .depending_on(vec![first_id]);
        let plan = Plan {
            explanation: "delete then generate".into(),
            actions: vec![first, second],
        };

        let results = orch
            .execute_plan(&plan, &mut ctx, PathBuf::from("/tmp"), true, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[1].error.as_deref().unwrap().contains("dependency failed"));
    }
}
