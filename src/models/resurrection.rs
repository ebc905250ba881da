//! `ResurrectionRequest` and its monotone status lifecycle (§3, §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    InProgress,
    Completed,
    Failed,
    RolledBack,
    Cancelled,
}

impl RequestStatus {
    /// Whether `self -> next` is an allowed transition per §3/§4.7.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Cancelled)
                | (Approved, InProgress)
                | (Approved, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (Completed, RolledBack)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Failed | RequestStatus::RolledBack | RequestStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResurrectionRequest {
    pub request_id: String,
    pub decision_id: String,
    pub kill_id: String,
    pub target_module: String,
    pub target_instance_id: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub executed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rollback_reason: Option<String>,
    pub monitoring_duration_minutes: u32,
    pub health_checks: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("cannot transition resurrection request from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

impl ResurrectionRequest {
    pub fn transition(&mut self, next: RequestStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

pub const AUTO_APPROVER: &str = "auto";
