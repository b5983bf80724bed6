pub mod agent;
pub mod matcher;
pub mod rate_limiter;

pub use agent::ProactiveAgent;
pub use matcher::{MatcherRegistry, SuggestionMatcher};
pub use rate_limiter::SuggestionRateLimiter;
