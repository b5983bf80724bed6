//! Bus subject catalog (spec §6). Every constant here is the exact NATS
//! subject string a Service Host subscribes to or an orchestrator
//! publishes/requests against. Kept as constants rather than an enum
//! because hosts register subscriptions by string at startup and new
//! subjects are additive, never renamed.

// ai.llm.*
pub const LLM_REQUEST: &str = "ai.llm.request";
pub const LLM_EMBED: &str = "ai.llm.embed";
pub const LLM_RELOAD_EVENTS: &str = "ai.llm.reload.events";

// ai.vision.*
pub const VISION_OCR_REQUEST: &str = "ai.vision.ocr.request";
pub const VISION_OCR_RESULT: &str = "ai.vision.ocr.result";
pub const VISION_IMAGEGEN_REQUEST: &str = "ai.vision.imagegen.request";
pub const VISION_IMAGEGEN_MODEL_INFO: &str = "ai.vision.imagegen.model_info";
pub const VISION_IMAGEGEN_PROGRESS: &str = "ai.vision.imagegen.progress";

// ai.audio.*
pub const AUDIO_STT: &str = "ai.audio.stt";
pub const AUDIO_TTS: &str = "ai.audio.tts";
pub const AUDIO_VAD: &str = "ai.audio.vad";
pub const AUDIO_INFO: &str = "ai.audio.info";
pub const AUDIO_RELOAD_EVENTS: &str = "ai.audio.reload.events";

// system.file.*
pub const FILE_SEARCH: &str = "system.file.search";
pub const FILE_READ: &str = "system.file.read";
pub const FILE_WRITE: &str = "system.file.write";
pub const FILE_CREATE: &str = "system.file.create";
pub const FILE_MOVE: &str = "system.file.move";
pub const FILE_DELETE: &str = "system.file.delete";

// system.health.*
pub const HEALTH_CURRENT: &str = "system.health.current";
pub const HEALTH_SUMMARY: &str = "system.health.summary";
pub const HEALTH_HISTORY: &str = "system.health.history";
pub const HEALTH_ALERTS: &str = "system.health.alerts";

// system.action.*
pub const ACTION_PROCESS_LIST: &str = "system.action.process.list";
pub const ACTION_PROCESS_KILL: &str = "system.action.process.kill";

// ui.overlay.*
pub const OVERLAY_TOGGLE: &str = "ui.overlay.toggle";
pub const OVERLAY_SHOW: &str = "ui.overlay.show";
pub const OVERLAY_HIDE: &str = "ui.overlay.hide";
pub const OVERLAY_QUIT: &str = "ui.overlay.quit";

// temporal.*
pub const TEMPORAL_COMMAND_NEW: &str = "temporal.command.new";
pub const TEMPORAL_EVENT_COMMAND: &str = "temporal.event.command";
pub const TEMPORAL_EVENT_FILE: &str = "temporal.event.file";
pub const TEMPORAL_EVENT_APP_FOCUS: &str = "temporal.event.app_focus";
pub const TEMPORAL_EVENT_SYSTEM_SNAPSHOT: &str = "temporal.event.system_snapshot";

// agent.*
pub const AGENT_SUGGESTION: &str = "agent.suggestion";

/// All subjects a Service Host may need to subscribe to, grouped by family,
/// for a catalog print or a readiness check that every expected responder
/// answered a probe.
pub fn all_request_subjects() -> &'static [&'static str] {
    &[
        LLM_REQUEST,
        LLM_EMBED,
        VISION_OCR_REQUEST,
        VISION_IMAGEGEN_REQUEST,
        AUDIO_STT,
        AUDIO_TTS,
        AUDIO_VAD,
        AUDIO_INFO,
        FILE_SEARCH,
        FILE_READ,
        FILE_WRITE,
        FILE_CREATE,
        FILE_MOVE,
        FILE_DELETE,
        HEALTH_CURRENT,
        HEALTH_SUMMARY,
        HEALTH_HISTORY,
        HEALTH_ALERTS,
        ACTION_PROCESS_LIST,
        ACTION_PROCESS_KILL,
        OVERLAY_TOGGLE,
        OVERLAY_SHOW,
        OVERLAY_HIDE,
        OVERLAY_QUIT,
        TEMPORAL_COMMAND_NEW,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_subjects_are_unique() {
        let subjects = all_request_subjects();
        let mut sorted = subjects.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), subjects.len());
    }

    #[test]
    fn file_subjects_share_system_file_prefix() {
        for s in [FILE_SEARCH, FILE_READ, FILE_WRITE, FILE_CREATE, FILE_MOVE, FILE_DELETE] {
            assert!(s.starts_with("system.file."));
        }
    }
}
