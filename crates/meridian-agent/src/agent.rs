//! Proactive Agent (C10, spec §4.10): observes the temporal event stream
//! and publishes at most one rate-limited `Suggestion` per matched event.
//! Pattern matchers run first; an LLM fallback only considers `Command`
//! events with no pattern hit, mirroring the Planner's own
//! pattern-then-LLM ordering but inverted (here the cheap path runs
//! first, and the LLM is the fallback, not the other way round).

use std::sync::Arc;
use std::time::Duration;

use meridian_bus::Bus;
use meridian_core::types::Suggestion;
use meridian_protocol::subjects;
use meridian_timeline::{EventKind, TimelineEvent};
use serde_json::Value;

use crate::matcher::MatcherRegistry;
use crate::rate_limiter::SuggestionRateLimiter;

const LLM_SUGGESTION_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ProactiveAgent {
    bus: Arc<dyn Bus>,
    matchers: MatcherRegistry,
    rate_limiter: SuggestionRateLimiter,
}

impl ProactiveAgent {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self {
            bus,
            matchers: MatcherRegistry::with_defaults(),
            rate_limiter: SuggestionRateLimiter::new(),
        }
    }

    /// Runs until the subscription ends (broker shutdown or drop). Intended
    /// to be spawned as its own task by the composition root.
    pub async fn run(&self) {
        let mut sub = match self.bus.subscribe("temporal.event.>").await {
            Ok(sub) => sub,
            Err(e) => {
                tracing::error!(error = %e, "proactive agent could not subscribe to temporal events");
                return;
            }
        };

        while let Some(msg) = sub.next().await {
            let event: TimelineEvent = match serde_json::from_value(msg.payload) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, subject = %msg.subject, "malformed temporal event, skipping");
                    continue;
                }
            };
            self.handle_event(event).await;
        }
    }

    async fn handle_event(&self, event: TimelineEvent) {
        let suggestion = match self.matchers.try_match(&event) {
            Some(suggestion) => Some(suggestion),
            None if event.kind == EventKind::Command => self.ask_llm(&event).await,
            None => None,
        };

        let Some(suggestion) = suggestion else {
            return;
        };

        if !self.rate_limiter.allow(&event.producer, &suggestion.id) {
            tracing::debug!(suggestion_id = %suggestion.id, producer = %event.producer, "suggestion rate-limited");
            return;
        }

        if let Ok(payload) = serde_json::to_value(&suggestion) {
            if let Err(e) = self.bus.publish(subjects::AGENT_SUGGESTION, payload).await {
                tracing::warn!(error = %e, "failed to publish suggestion");
            }
        }
    }

    /// Falls back to an LLM call only for `Command` events no matcher
    /// recognized. Any failure (unreachable host, bad JSON, empty array)
    /// degrades to "no suggestion" rather than surfacing an error — a
    /// missed proactive nudge is never worth interrupting the user over.
    async fn ask_llm(&self, event: &TimelineEvent) -> Option<Suggestion> {
        let command = event.data.get("command").and_then(Value::as_str)?;
        let prompt = format!(
            "A user just ran this shell command: `{command}`. If there is one \
             genuinely useful follow-up action worth suggesting, reply with a JSON \
             array containing exactly one object shaped \
             {{\"id\": string, \"title\": string, \"message\": string, \"actions\": []}}. \
             If nothing is worth suggesting, reply with an empty JSON array."
        );
        let payload = serde_json::json!({ "mode": "suggest", "prompt": prompt });

        let reply = self
            .bus
            .request(subjects::LLM_REQUEST, payload, LLM_SUGGESTION_TIMEOUT)
            .await
            .ok()?;
        let text = reply.get("text").and_then(Value::as_str)?;
        let suggestions: Vec<Suggestion> = serde_json::from_str(text).ok()?;
        suggestions.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_bus::LoopbackBus;
    use serde_json::json;

    #[tokio::test]
    async fn pattern_match_publishes_suggestion_without_llm_call() {
        let bus = LoopbackBus::new();
        let mut suggestions_sub = bus.subscribe(subjects::AGENT_SUGGESTION).await.unwrap();
        let agent = ProactiveAgent::new(Arc::new(bus.clone()));

        let event = TimelineEvent::new(EventKind::Command, "collector-command", json!({"command": "git clone https://x/y.git"}));
        agent.handle_event(event).await;

        let received = tokio::time::timeout(Duration::from_millis(200), suggestions_sub.next())
            .await
            .expect("suggestion should have been published")
            .expect("subscription should yield a message");
        assert_eq!(received.payload["id"], "git_clone_inspect");
    }

    #[tokio::test]
    async fn repeated_event_is_suppressed_by_rate_limiter() {
        let bus = LoopbackBus::new();
        let mut suggestions_sub = bus.subscribe(subjects::AGENT_SUGGESTION).await.unwrap();
        let agent = ProactiveAgent::new(Arc::new(bus.clone()));

        let make_event = || TimelineEvent::new(EventKind::Command, "collector-command", json!({"command": "git clone https://x/y.git"}));
        agent.handle_event(make_event()).await;
        agent.handle_event(make_event()).await;

        let first = tokio::time::timeout(Duration::from_millis(200), suggestions_sub.next()).await;
        assert!(first.is_ok());
        let second = tokio::time::timeout(Duration::from_millis(200), suggestions_sub.next()).await;
        assert!(second.is_err(), "second suggestion should have been rate-limited");
    }

    #[tokio::test]
    async fn unmatched_non_command_event_produces_no_suggestion() {
        let bus = LoopbackBus::new();
        let mut suggestions_sub = bus.subscribe(subjects::AGENT_SUGGESTION).await.unwrap();
        let agent = ProactiveAgent::new(Arc::new(bus.clone()));

        let event = TimelineEvent::new(EventKind::AppFocus, "collector-focus", json!({"app": "terminal"}));
        agent.handle_event(event).await;

        let result = tokio::time::timeout(Duration::from_millis(100), suggestions_sub.next()).await;
        assert!(result.is_err());
    }
}
