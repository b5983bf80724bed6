use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Surface a session originates from. Disambiguates sessions sharing a
/// user/host (e.g. the same person in the CLI and in the overlay at once).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Cli,
    Overlay,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Cli => write!(f, "cli"),
            Surface::Overlay => write!(f, "overlay"),
        }
    }
}

impl std::str::FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cli" => Ok(Surface::Cli),
            "overlay" => Ok(Surface::Overlay),
            other => Err(format!("unknown surface: {other}")),
        }
    }
}

/// Session identifier: `{user}@{host}:{surface}`.
///
/// Each surface gets its own session so two UIs for the same user never
/// race over one Context (see §4.2 concurrency note — the `{surface}`
/// suffix is what keeps last-writer-wins cross-process saves harmless).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(user: &str, host: &str, surface: Surface) -> Self {
        Self(format!("{user}@{host}:{surface}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into `(user, host, surface)`. Returns `None` if the id
    /// does not match the `user@host:surface` shape.
    pub fn parse_parts(&self) -> Option<(&str, &str, Surface)> {
        let (user, rest) = self.0.split_once('@')?;
        let (host, surface) = rest.split_once(':')?;
        let surface: Surface = surface.parse().ok()?;
        Some((user, host, surface))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Role of one utterance inside a Context's turn history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One utterance in a conversation. Append-only once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// A JSON-ish value a Context variable or action parameter can hold.
/// Kept as `serde_json::Value` directly — the data model names
/// string/path/JSON as the variable value space, which JSON already spans.
pub type VarValue = serde_json::Value;

/// Durable per-session conversational state.
///
/// Owned exclusively by the Conversation Engine while a message is being
/// processed, and by the Context Store between messages (see spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    pub turns: Vec<Turn>,
    pub variables: BTreeMap<String, VarValue>,
    pub results: BTreeMap<String, ActionResult>,
    pub created_files: Vec<String>,
}

impl Context {
    pub fn push_turn(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn::new(role, content));
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: VarValue) {
        self.variables.insert(name.into(), value);
    }

    pub fn get_var(&self, name: &str) -> Option<&VarValue> {
        self.variables.get(name)
    }

    pub fn get_var_str(&self, name: &str) -> Option<String> {
        self.get_var(name).map(|v| match v {
            VarValue::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Merge an action's declared outputs into Variables and record its
    /// result. Called by the Orchestrator after every completed action.
    pub fn merge_result(&mut self, result: ActionResult) {
        for (k, v) in &result.outputs {
            self.variables.insert(k.clone(), v.clone());
        }
        self.results.insert(result.action_id.clone(), result);
    }
}

/// The closed set of action kinds the Orchestrator knows how to dispatch.
///
/// `file_delete` is not itemized in the kind/subject table of spec §4.5 but
/// is named by the approval set in the same section, so it must exist as a
/// dispatchable kind — see SPEC_FULL.md §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    LlmGenerate,
    ImageGenerate,
    ImageSave,
    OcrCapture,
    DocumentQuery,
    WebSearch,
    FileCreate,
    FileWrite,
    FileRead,
    FileMove,
    FileDelete,
    CommandExecute,
}

impl ActionKind {
    /// Actions in this set require user approval before the Orchestrator
    /// may execute them (spec §4.5 approval policy).
    pub fn needs_approval(self) -> bool {
        matches!(
            self,
            ActionKind::FileCreate
                | ActionKind::FileWrite
                | ActionKind::FileMove
                | ActionKind::FileDelete
                | ActionKind::CommandExecute
                | ActionKind::ImageSave
        )
    }

    /// Read-only kinds may be retried once on `Timeout` (spec §4.5 step 4).
    pub fn is_idempotent(self) -> bool {
        matches!(
            self,
            ActionKind::DocumentQuery
                | ActionKind::WebSearch
                | ActionKind::FileRead
                | ActionKind::OcrCapture
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::LlmGenerate => "llm_generate",
            ActionKind::ImageGenerate => "image_generate",
            ActionKind::ImageSave => "image_save",
            ActionKind::OcrCapture => "ocr_capture",
            ActionKind::DocumentQuery => "document_query",
            ActionKind::WebSearch => "web_search",
            ActionKind::FileCreate => "file_create",
            ActionKind::FileWrite => "file_write",
            ActionKind::FileRead => "file_read",
            ActionKind::FileMove => "file_move",
            ActionKind::FileDelete => "file_delete",
            ActionKind::CommandExecute => "command_execute",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "llm_generate" => Ok(ActionKind::LlmGenerate),
            "image_generate" => Ok(ActionKind::ImageGenerate),
            "image_save" => Ok(ActionKind::ImageSave),
            "ocr_capture" => Ok(ActionKind::OcrCapture),
            "document_query" => Ok(ActionKind::DocumentQuery),
            "web_search" => Ok(ActionKind::WebSearch),
            "file_create" => Ok(ActionKind::FileCreate),
            "file_write" => Ok(ActionKind::FileWrite),
            "file_read" => Ok(ActionKind::FileRead),
            "file_move" => Ok(ActionKind::FileMove),
            "file_delete" => Ok(ActionKind::FileDelete),
            "command_execute" => Ok(ActionKind::CommandExecute),
            other => Err(format!("unknown action kind: {other}")),
        }
    }
}

/// A unique action identifier within one Plan.
pub type ActionId = String;

pub fn new_action_id() -> ActionId {
    Uuid::now_v7().to_string()
}

/// One atomic unit of work inside a Plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub kind: ActionKind,
    pub parameters: BTreeMap<String, VarValue>,
    pub needs_approval: bool,
    pub depends_on: Vec<ActionId>,
}

impl Action {
    pub fn new(kind: ActionKind, parameters: BTreeMap<String, VarValue>) -> Self {
        Self {
            id: new_action_id(),
            needs_approval: kind.needs_approval(),
            kind,
            parameters,
            depends_on: Vec::new(),
        }
    }

    pub fn depending_on(mut self, deps: Vec<ActionId>) -> Self {
        self.depends_on = deps;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Ok,
    Failed,
    Cancelled,
}

/// Outcome of dispatching one Action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: ActionId,
    pub status: ActionStatus,
    pub outputs: BTreeMap<String, VarValue>,
    pub error: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl ActionResult {
    pub fn ok(
        action_id: ActionId,
        outputs: BTreeMap<String, VarValue>,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            action_id,
            status: ActionStatus::Ok,
            outputs,
            error: None,
            started_at,
            finished_at: chrono::Utc::now(),
        }
    }

    pub fn failed(
        action_id: ActionId,
        error: impl Into<String>,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            action_id,
            status: ActionStatus::Failed,
            outputs: BTreeMap::new(),
            error: Some(error.into()),
            started_at,
            finished_at: chrono::Utc::now(),
        }
    }

    pub fn cancelled(action_id: ActionId, started_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            action_id,
            status: ActionStatus::Cancelled,
            outputs: BTreeMap::new(),
            error: None,
            started_at,
            finished_at: chrono::Utc::now(),
        }
    }
}

/// One clickable action offered alongside a Suggestion (spec §3). `command`
/// may be an opaque token the UI interprets itself or a direct shell
/// string — either way, running it still goes through the normal approval
/// path, the Suggestion itself never executes anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionAction {
    pub label: String,
    pub command: String,
}

/// A proactive recommendation emitted on `agent.suggestion` (spec §3, §4.10).
/// Never stored — it is fire-and-forget UI signal, not Context state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub message: String,
    pub actions: Vec<SuggestionAction>,
}

impl Suggestion {
    pub fn new(id: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, label: impl Into<String>, command: impl Into<String>) -> Self {
        self.actions.push(SuggestionAction {
            label: label.into(),
            command: command.into(),
        });
        self
    }
}

/// Ordered list of Actions plus a natural-language explanation of the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub explanation: String,
    pub actions: Vec<Action>,
}

impl Plan {
    pub fn single(explanation: impl Into<String>, action: Action) -> Self {
        Self {
            explanation: explanation.into(),
            actions: vec![action],
        }
    }

    pub fn needs_approval(&self) -> bool {
        self.actions.iter().any(|a| a.needs_approval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_round_trips_parts() {
        let id = SessionId::new("alice", "desktop", Surface::Cli);
        assert_eq!(id.as_str(), "alice@desktop:cli");
        let (user, host, surface) = id.parse_parts().unwrap();
        assert_eq!(user, "alice");
        assert_eq!(host, "desktop");
        assert_eq!(surface, Surface::Cli);
    }

    #[test]
    fn action_kind_round_trips_through_str() {
        for kind in [
            ActionKind::LlmGenerate,
            ActionKind::ImageGenerate,
            ActionKind::ImageSave,
            ActionKind::OcrCapture,
            ActionKind::DocumentQuery,
            ActionKind::WebSearch,
            ActionKind::FileCreate,
            ActionKind::FileWrite,
            ActionKind::FileRead,
            ActionKind::FileMove,
            ActionKind::FileDelete,
            ActionKind::CommandExecute,
        ] {
            let parsed: ActionKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn approval_set_matches_spec() {
        assert!(ActionKind::FileCreate.needs_approval());
        assert!(ActionKind::FileWrite.needs_approval());
        assert!(ActionKind::FileMove.needs_approval());
        assert!(ActionKind::FileDelete.needs_approval());
        assert!(ActionKind::CommandExecute.needs_approval());
        assert!(ActionKind::ImageSave.needs_approval());
        assert!(!ActionKind::LlmGenerate.needs_approval());
        assert!(!ActionKind::DocumentQuery.needs_approval());
    }

    #[test]
    fn context_merge_result_sets_variables() {
        let mut ctx = Context::default();
        let mut outputs = BTreeMap::new();
        outputs.insert(
            "last_created_file".to_string(),
            VarValue::String("/home/alice/notes.txt".to_string()),
        );
        let result = ActionResult::ok("a1".to_string(), outputs, chrono::Utc::now());
        ctx.merge_result(result);
        assert_eq!(
            ctx.get_var_str("last_created_file").as_deref(),
            Some("/home/alice/notes.txt")
        );
        assert!(ctx.results.contains_key("a1"));
    }
}
