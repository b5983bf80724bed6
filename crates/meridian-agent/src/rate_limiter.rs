//! Per-key suggestion throttling (spec §4.10 point 4), shaped after
//! `skynet-memory::MemoryManager`'s bounded cache: a `Mutex<HashMap>`
//! with a time-to-live per entry and oldest-entry eviction once the map
//! is full, rather than a background sweeper.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

const SUGGESTION_TTL_SECS: i64 = 300;
const MAX_TRACKED_KEYS: usize = 256;

/// Key is `(session proxy, suggestion id)`. `TimelineEvent` carries no
/// session id, so the event's `producer` field stands in for it — the
/// producer identifies the collector/surface an event came from, which is
/// the closest available proxy for "who would see this suggestion again".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RateLimitKey {
    session_proxy: String,
    suggestion_id: String,
}

pub struct SuggestionRateLimiter {
    seen: Mutex<HashMap<RateLimitKey, DateTime<Utc>>>,
}

impl SuggestionRateLimiter {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if a suggestion with this id has not been raised for
    /// this session proxy within the last 5 minutes, recording it if so.
    pub fn allow(&self, session_proxy: &str, suggestion_id: &str) -> bool {
        let key = RateLimitKey {
            session_proxy: session_proxy.to_string(),
            suggestion_id: suggestion_id.to_string(),
        };
        let now = Utc::now();
        let mut seen = self.seen.lock().unwrap();

        if let Some(last) = seen.get(&key) {
            if now.signed_duration_since(*last).num_seconds() < SUGGESTION_TTL_SECS {
                return false;
            }
        }

        if seen.len() >= MAX_TRACKED_KEYS && !seen.contains_key(&key) {
            if let Some(oldest) = seen.iter().min_by_key(|(_, t)| **t).map(|(k, _)| k.clone()) {
                seen.remove(&oldest);
            }
        }

        seen.insert(key, now);
        true
    }
}

impl Default for SuggestionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_is_allowed() {
        let limiter = SuggestionRateLimiter::new();
        assert!(limiter.allow("collector-file", "manifest_write_install"));
    }

    #[test]
    fn repeat_within_window_is_suppressed() {
        let limiter = SuggestionRateLimiter::new();
        assert!(limiter.allow("collector-file", "manifest_write_install"));
        assert!(!limiter.allow("collector-file", "manifest_write_install"));
    }

    #[test]
    fn different_session_proxies_are_independent() {
        let limiter = SuggestionRateLimiter::new();
        assert!(limiter.allow("collector-file", "manifest_write_install"));
        assert!(limiter.allow("collector-command", "manifest_write_install"));
    }

    #[test]
    fn evicts_oldest_entry_once_at_capacity() {
        let limiter = SuggestionRateLimiter::new();
        for i in 0..MAX_TRACKED_KEYS {
            assert!(limiter.allow(&format!("proxy-{i}"), "s"));
        }
        // map is full; a brand new key still gets admitted by evicting
        // the oldest tracked entry instead of being rejected outright
        assert!(limiter.allow("proxy-new", "s"));
        assert!(limiter.seen.lock().unwrap().len() <= MAX_TRACKED_KEYS);
    }
}
