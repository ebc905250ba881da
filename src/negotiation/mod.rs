//! The Killer negotiation protocol (§4.10): request/reply exchanges plus synchronous
//! handling of unsolicited messages from the Killer.

use crate::models::{Negotiation, NegotiationMessage, NegotiationOutcome, NegotiationState, NegotiationType};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Sends a negotiation message to the Killer and blocks for a reply, or `None` on
/// timeout. Kept as a narrow trait so the negotiator is transport-agnostic.
pub trait KillerTransport: Send + Sync {
    fn send(&self, kind: NegotiationType, subject: &str, body: serde_json::Value) -> Option<serde_json::Value>;
}

#[derive(Debug, Clone, Copy)]
pub struct NegotiationConfig {
    pub timeout: Duration,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        NegotiationConfig {
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct KillerNegotiator<T: KillerTransport> {
    transport: T,
    config: NegotiationConfig,
    negotiations: Mutex<HashMap<String, Negotiation>>,
}

impl<T: KillerTransport> KillerNegotiator<T> {
    pub fn new(transport: T, config: NegotiationConfig) -> Self {
        KillerNegotiator {
            transport,
            config,
            negotiations: Mutex::new(HashMap::new()),
        }
    }

    pub fn negotiate(&self, kind: NegotiationType, subject: &str, body: serde_json::Value) -> Negotiation {
        let negotiation_id = Uuid::new_v4().to_string();
        let mut negotiation = Negotiation {
            negotiation_id: negotiation_id.clone(),
            kind,
            state: NegotiationState::Initiated,
            initiated_by: "agent".to_string(),
            subject: subject.to_string(),
            messages: vec![NegotiationMessage {
                from: "agent".to_string(),
                sent_at: Utc::now(),
                body: body.clone(),
            }],
            outcome: None,
        };
        negotiation.state = NegotiationState::AwaitingResponse;

        match self.transport.send(kind, subject, body) {
            Some(reply) => {
                negotiation.messages.push(NegotiationMessage {
                    from: "killer".to_string(),
                    sent_at: Utc::now(),
                    body: reply.clone(),
                });
                let status = reply
                    .get("status")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let outcome = NegotiationOutcome::from_status_str(status);
                negotiation.state = match outcome {
                    NegotiationOutcome::Approved | NegotiationOutcome::Denied => {
                        if outcome == NegotiationOutcome::Approved {
                            NegotiationState::Agreed
                        } else {
                            NegotiationState::Disagreed
                        }
                    }
                    NegotiationOutcome::Conditional | NegotiationOutcome::Deferred => NegotiationState::InDiscussion,
                    NegotiationOutcome::NoResponse => NegotiationState::Disagreed,
                };
                negotiation.outcome = Some(outcome);
            }
            None => {
                negotiation.state = NegotiationState::Timeout;
                negotiation.outcome = Some(NegotiationOutcome::NoResponse);
            }
        }

        self.negotiations
            .lock()
            .unwrap()
            .insert(negotiation_id, negotiation.clone());
        negotiation
    }

    pub fn get(&self, negotiation_id: &str) -> Option<Negotiation> {
        self.negotiations.lock().unwrap().get(negotiation_id).cloned()
    }

    pub fn cancel(&self, negotiation_id: &str) -> bool {
        let mut negotiations = self.negotiations.lock().unwrap();
        match negotiations.get_mut(negotiation_id) {
            Some(n) if n.state != NegotiationState::Agreed && n.state != NegotiationState::Disagreed => {
                n.state = NegotiationState::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// `pre_kill_notification`: respond synchronously without a full negotiation round.
    pub fn handle_pre_kill_notification(&self, killer_confidence: f64) -> &'static str {
        if killer_confidence > 0.8 {
            "no_objection"
        } else {
            "request_review"
        }
    }

    /// `threshold_proposal`: acknowledge and let the caller forward to its threshold
    /// channel; the ack string is what goes back to the Killer.
    pub fn handle_threshold_proposal(&self) -> &'static str {
        "acknowledged/will_review"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct RepliesWith(Option<serde_json::Value>);
    impl KillerTransport for RepliesWith {
        fn send(&self, _kind: NegotiationType, _subject: &str, _body: serde_json::Value) -> Option<serde_json::Value> {
            self.0.clone()
        }
    }

    #[test]
    fn approved_reply_transitions_to_agreed() {
        let negotiator = KillerNegotiator::new(
            RepliesWith(Some(json!({"status": "approved"}))),
            NegotiationConfig::default(),
        );
        let negotiation = negotiator.negotiate(NegotiationType::ResurrectionClearance, "payments-api", json!({}));
        assert_eq!(negotiation.state, NegotiationState::Agreed);
        assert_eq!(negotiation.outcome, Some(NegotiationOutcome::Approved));
    }

    #[test]
    fn no_reply_times_out() {
        let negotiator = KillerNegotiator::new(RepliesWith(None), NegotiationConfig::default());
        let negotiation = negotiator.negotiate(NegotiationType::ModuleStatusQuery, "payments-api", json!({}));
        assert_eq!(negotiation.state, NegotiationState::Timeout);
        assert_eq!(negotiation.outcome, Some(NegotiationOutcome::NoResponse));
    }

    #[test]
    fn conditional_reply_goes_to_in_discussion() {
        let negotiator = KillerNegotiator::new(
            RepliesWith(Some(json!({"status": "partial"}))),
            NegotiationConfig::default(),
        );
        let negotiation = negotiator.negotiate(NegotiationType::ThresholdDiscussion, "payments-api", json!({}));
        assert_eq!(negotiation.state, NegotiationState::InDiscussion);
    }

    #[test]
    fn high_confidence_pre_kill_gets_no_objection() {
        let negotiator = KillerNegotiator::new(RepliesWith(None), NegotiationConfig::default());
        assert_eq!(negotiator.handle_pre_kill_notification(0.95), "no_objection");
        assert_eq!(negotiator.handle_pre_kill_notification(0.5), "request_review");
    }
}
