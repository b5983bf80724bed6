//! Static description of every dispatchable action kind, used to build the
//! planning system prompt (spec §4.6 step 2) and to know which Context
//! variable name each kind's output lands under for placeholder validation
//! (spec §4.6 step 3). Grounded on the teacher's `tool_catalog()` static
//! list in `tools/mod.rs`, generalized from "LLM tool" to "plan action".

use meridian_core::types::ActionKind;

pub struct ActionSpec {
    pub kind: ActionKind,
    pub parameters: &'static [&'static str],
    pub description: &'static str,
    pub output_variable: Option<&'static str>,
}

pub fn catalog() -> &'static [ActionSpec] {
    &[
        ActionSpec {
            kind: ActionKind::LlmGenerate,
            parameters: &["prompt", "mode"],
            description: "Generate text from a prompt; mode defaults to 'chat'.",
            output_variable: Some("last_generated_text"),
        },
        ActionSpec {
            kind: ActionKind::ImageGenerate,
            parameters: &["prompt"],
            description: "Generate an image from a prompt.",
            output_variable: Some("last_generated_image"),
        },
        ActionSpec {
            kind: ActionKind::ImageSave,
            parameters: &["source_path", "destination_path"],
            description: "Copy a generated or fetched image to a destination path.",
            output_variable: Some("last_saved_image"),
        },
        ActionSpec {
            kind: ActionKind::OcrCapture,
            parameters: &["image_path"],
            description: "Extract text from an image via OCR.",
            output_variable: Some("last_ocr_text"),
        },
        ActionSpec {
            kind: ActionKind::DocumentQuery,
            parameters: &["query", "working_directory"],
            description: "Search local files matching a query.",
            output_variable: Some("last_query_results"),
        },
        ActionSpec {
            kind: ActionKind::WebSearch,
            parameters: &["query"],
            description: "Search the open web.",
            output_variable: Some("last_search_results"),
        },
        ActionSpec {
            kind: ActionKind::FileCreate,
            parameters: &["path", "content"],
            description: "Create a new file, optionally with content.",
            output_variable: Some("last_created_file"),
        },
        ActionSpec {
            kind: ActionKind::FileWrite,
            parameters: &["path", "content"],
            description: "Overwrite an existing file's content.",
            output_variable: Some("last_modified_file"),
        },
        ActionSpec {
            kind: ActionKind::FileRead,
            parameters: &["path"],
            description: "Read a file's content.",
            output_variable: Some("last_read_file_content"),
        },
        ActionSpec {
            kind: ActionKind::FileMove,
            parameters: &["source_path", "destination_path"],
            description: "Move or rename a file.",
            output_variable: Some("last_moved_file"),
        },
        ActionSpec {
            kind: ActionKind::FileDelete,
            parameters: &["path"],
            description: "Delete a file.",
            output_variable: None,
        },
        ActionSpec {
            kind: ActionKind::CommandExecute,
            parameters: &["command", "args"],
            description: "Run a local shell command and capture its output.",
            output_variable: Some("last_command_output"),
        },
    ]
}

/// Renders the catalog into the enumerated-action-kinds block of the
/// planning system prompt (spec §4.6 step 2).
pub fn render_prompt_block() -> String {
    let mut out = String::from("Allowed action kinds:\n");
    for spec in catalog() {
        out.push_str(&format!(
            "- {} (parameters: {}): {}\n",
            spec.kind.as_str(),
            spec.parameters.join(", "),
            spec.description
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_action_kind() {
        let kinds: Vec<ActionKind> = catalog().iter().map(|s| s.kind).collect();
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
            assert!(kinds.contains(&kind), "catalog missing {}", kind.as_str());
        }
    }
}
