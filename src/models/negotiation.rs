//! `Negotiation`: the transcript of a request/reply exchange with the Killer (§3, §4.10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationType {
    PreKillConsultation,
    PostKillAppeal,
    ResurrectionClearance,
    ModuleStatusQuery,
    ThresholdDiscussion,
    BulkResurrectionRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationState {
    Initiated,
    AwaitingResponse,
    InDiscussion,
    Agreed,
    Disagreed,
    Timeout,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationOutcome {
    Approved,
    Denied,
    Conditional,
    Deferred,
    NoResponse,
}

impl NegotiationOutcome {
    /// Response-status-string mapping from §4.10: one-way recognition at the wire
    /// boundary, unknown values collapse to `NoResponse`.
    pub fn from_status_str(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "approved" | "ok" | "agree" | "cleared" => NegotiationOutcome::Approved,
            "conditional" | "partial" => NegotiationOutcome::Conditional,
            "denied" | "rejected" | "disagree" => NegotiationOutcome::Denied,
            "defer" | "pending" => NegotiationOutcome::Deferred,
            _ => NegotiationOutcome::NoResponse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationMessage {
    pub from: String,
    pub sent_at: DateTime<Utc>,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    pub negotiation_id: String,
    #[serde(rename = "type")]
    pub kind: NegotiationType,
    pub state: NegotiationState,
    pub initiated_by: String,
    pub subject: String,
    pub messages: Vec<NegotiationMessage>,
    pub outcome: Option<NegotiationOutcome>,
}
