use std::collections::BTreeMap;

use meridian_protocol::subjects;

use crate::handler::ActionHandler;
use crate::handlers::{BusDelegateHandler, CommandExecuteHandler, ImageSaveHandler, WebSearchHandler};

/// Web-search provider wiring, read from config at startup (spec §6 has no
/// bus subject for "the open web" — there is no host to reach).
pub struct WebSearchConfig {
    pub api_url: String,
    pub api_key: Option<String>,
}

/// Builds the fixed kind -> handler table the Orchestrator dispatches
/// through, one entry per row of the action-kind table (spec §4.5).
pub fn build_registry(web_search: WebSearchConfig) -> BTreeMap<&'static str, Box<dyn ActionHandler>> {
    let mut registry: BTreeMap<&'static str, Box<dyn ActionHandler>> = BTreeMap::new();

    let bus_delegates: Vec<Box<dyn ActionHandler>> = vec![
        Box::new(BusDelegateHandler::new(
            "llm_generate",
            subjects::LLM_REQUEST,
            "text",
            Some("last_generated_text"),
        )),
        Box::new(BusDelegateHandler::new(
            "image_generate",
            subjects::VISION_IMAGEGEN_REQUEST,
            "path",
            Some("last_generated_image"),
        )),
        Box::new(BusDelegateHandler::new(
            "ocr_capture",
            subjects::VISION_OCR_REQUEST,
            "text",
            Some("last_ocr_text"),
        )),
        Box::new(BusDelegateHandler::new(
            "document_query",
            subjects::FILE_SEARCH,
            "results",
            Some("last_query_results"),
        )),
        Box::new(BusDelegateHandler::new(
            "file_create",
            subjects::FILE_CREATE,
            "path",
            Some("last_created_file"),
        )),
        Box::new(BusDelegateHandler::new(
            "file_write",
            subjects::FILE_WRITE,
            "path",
            Some("last_modified_file"),
        )),
        Box::new(BusDelegateHandler::new(
            "file_read",
            subjects::FILE_READ,
            "content",
            Some("last_read_file_content"),
        )),
        Box::new(BusDelegateHandler::new(
            "file_move",
            subjects::FILE_MOVE,
            "path",
            Some("last_moved_file"),
        )),
        Box::new(BusDelegateHandler::new(
            "file_delete",
            subjects::FILE_DELETE,
            "path",
            None,
        )),
    ];
    for handler in bus_delegates {
        registry.insert(handler.kind(), handler);
    }

    registry.insert("image_save", Box::new(ImageSaveHandler));
    registry.insert("command_execute", Box::new(CommandExecuteHandler));
    registry.insert(
        "web_search",
        Box::new(WebSearchHandler::new(web_search.api_url, web_search.api_key)),
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::types::ActionKind;

    #[test]
    fn every_action_kind_has_a_registered_handler() {
        let registry = build_registry(WebSearchConfig {
            api_url: "https://example.invalid/search".into(),
            api_key: None,
        });
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
            assert!(
                registry.contains_key(kind.as_str()),
                "missing handler for {}",
                kind.as_str()
            );
        }
    }
}
