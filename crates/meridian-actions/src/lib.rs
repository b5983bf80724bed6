pub mod handler;
pub mod handlers;
pub mod orchestrator;
pub mod placeholder;
pub mod registry;

pub use handler::{ActionHandler, ExecutionContext, HandlerOutcome};
pub use orchestrator::Orchestrator;
pub use registry::{build_registry, WebSearchConfig};
