//! The approval queue (§4.6): a priority-ordered, capacity-bounded store of pending
//! `ResurrectionProposal`s with sweep-on-read expiry and lifecycle event callbacks fired
//! outside the lock.

use crate::event::channel::EventPublisher;
use crate::models::{QueueItem, QueueItemStatus, ResurrectionProposal};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum QueueEvent {
    Enqueued(QueueItem),
    Approved(QueueItem),
    Denied(QueueItem),
    Expired(QueueItem),
}

#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub max_pending: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig { max_pending: 100 }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("approval queue is at capacity ({0} pending)")]
    AtCapacity(usize),
    #[error("no queue item with id `{0}`")]
    NotFound(String),
    #[error("item `{0}` is in terminal state {1:?}, cannot be reviewed")]
    NotPending(String, QueueItemStatus),
    #[error("item `{0}` expired before it could be reviewed")]
    Expired(String),
}

#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub pending: usize,
    pub approved: usize,
    pub denied: usize,
    pub expired: usize,
    pub cancelled: usize,
}

pub struct ApprovalQueue {
    items: Mutex<HashMap<String, QueueItem>>,
    config: QueueConfig,
    events: Option<EventPublisher<QueueEvent>>,
    expiry: chrono::Duration,
}

impl ApprovalQueue {
    pub fn new(config: QueueConfig, expiry: chrono::Duration, events: Option<EventPublisher<QueueEvent>>) -> Self {
        ApprovalQueue {
            items: Mutex::new(HashMap::new()),
            config,
            events,
            expiry,
        }
    }

    pub fn enqueue(&self, proposal: ResurrectionProposal) -> Result<String, QueueError> {
        let mut items = self.items.lock().unwrap();
        self.sweep_expired_locked(&mut items);

        let pending = items.values().filter(|i| i.status == QueueItemStatus::Pending).count();
        if pending >= self.config.max_pending {
            return Err(QueueError::AtCapacity(self.config.max_pending));
        }

        let now = Utc::now();
        let item = QueueItem {
            item_id: Uuid::new_v4().to_string(),
            priority: proposal.urgency.priority(),
            created_at: now,
            expires_at: now + self.expiry,
            proposal,
            status: QueueItemStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
        };
        let item_id = item.item_id.clone();
        items.insert(item_id.clone(), item.clone());
        drop(items);
        self.publish(QueueEvent::Enqueued(item));
        Ok(item_id)
    }

    pub fn approve(&self, item_id: &str, approver: &str, notes: Option<String>) -> Result<QueueItem, QueueError> {
        self.review(item_id, QueueItemStatus::Approved, approver, notes, QueueEvent::Approved)
    }

    pub fn deny(&self, item_id: &str, denier: &str, reason: String) -> Result<QueueItem, QueueError> {
        self.review(item_id, QueueItemStatus::Denied, denier, Some(reason), QueueEvent::Denied)
    }

    fn review(
        &self,
        item_id: &str,
        next: QueueItemStatus,
        reviewer: &str,
        notes: Option<String>,
        event: impl FnOnce(QueueItem) -> QueueEvent,
    ) -> Result<QueueItem, QueueError> {
        let mut items = self.items.lock().unwrap();
        self.sweep_expired_locked(&mut items);

        let item = items.get_mut(item_id).ok_or_else(|| QueueError::NotFound(item_id.to_string()))?;
        if item.status == QueueItemStatus::Expired {
            return Err(QueueError::Expired(item_id.to_string()));
        }
        if item.status != QueueItemStatus::Pending {
            return Err(QueueError::NotPending(item_id.to_string(), item.status));
        }

        item.status = next;
        item.reviewed_by = Some(reviewer.to_string());
        item.reviewed_at = Some(Utc::now());
        item.review_notes = notes;
        let updated = item.clone();
        drop(items);
        self.publish(event(updated.clone()));
        Ok(updated)
    }

    pub fn list_pending(&self, limit: usize) -> Vec<QueueItem> {
        let mut items = self.items.lock().unwrap();
        self.sweep_expired_locked(&mut items);

        let mut pending: Vec<QueueItem> = items
            .values()
            .filter(|i| i.status == QueueItemStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        pending.truncate(limit);
        pending
    }

    pub fn get_item(&self, item_id: &str) -> Option<QueueItem> {
        self.items.lock().unwrap().get(item_id).cloned()
    }

    pub fn stats(&self) -> QueueStats {
        let mut items = self.items.lock().unwrap();
        self.sweep_expired_locked(&mut items);
        let mut stats = QueueStats::default();
        for item in items.values() {
            match item.status {
                QueueItemStatus::Pending => stats.pending += 1,
                QueueItemStatus::Approved => stats.approved += 1,
                QueueItemStatus::Denied => stats.denied += 1,
                QueueItemStatus::Expired => stats.expired += 1,
                QueueItemStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    fn sweep_expired_locked(&self, items: &mut HashMap<String, QueueItem>) {
        let now = Utc::now();
        let mut expired = Vec::new();
        for item in items.values_mut() {
            if item.is_expired(now) {
                item.status = QueueItemStatus::Expired;
                expired.push(item.clone());
            }
        }
        for item in expired {
            self.publish(QueueEvent::Expired(item));
        }
    }

    fn publish(&self, event: QueueEvent) {
        if let Some(publisher) = &self.events {
            let _ = publisher.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::kill_report::{KillReason, Severity};
    use crate::models::{DecisionOutcome, KillReport, ResurrectionDecision, RiskAssessment, RiskLevel, Urgency};

    fn sample_proposal(urgency: Urgency) -> ResurrectionProposal {
        let kill_report = KillReport {
            kill_id: "kill-1".into(),
            timestamp: Utc::now(),
            target_module: "payments-api".into(),
            target_instance_id: "instance-1".into(),
            kill_reason: KillReason::AnomalyBehavior,
            severity: Severity::Medium,
            confidence_score: 0.5,
            evidence: vec![],
            dependencies: vec![],
            source_agent: "killer-1".into(),
            metadata: serde_json::json!({}),
        };
        let decision = ResurrectionDecision {
            decision_id: "dec-1".into(),
            kill_id: "kill-1".into(),
            timestamp: Utc::now(),
            outcome: DecisionOutcome::PendingReview,
            risk_level: RiskLevel::Medium,
            risk_score: 0.45,
            confidence: 0.5,
            reasoning: vec![],
            recommended_action: "await_manual_review".into(),
            requires_human_review: true,
            auto_approve_eligible: false,
            constraints: vec![],
            timeout_minutes: 30,
        };
        let risk_assessment = RiskAssessment {
            risk_score: 0.45,
            risk_level: RiskLevel::Medium,
            factors: vec![],
            auto_approve_eligible: false,
            requires_escalation: false,
        };
        ResurrectionProposal {
            kill_report,
            decision,
            risk_assessment,
            summary: "test".into(),
            urgency,
            top_factors: vec![],
        }
    }

    #[test]
    fn enqueue_then_approve_round_trip() {
        let queue = ApprovalQueue::new(QueueConfig::default(), chrono::Duration::minutes(30), None);
        let id = queue.enqueue(sample_proposal(Urgency::Medium)).unwrap();
        let approved = queue.approve(&id, "alice", Some("looks fine".into())).unwrap();
        assert_eq!(approved.status, QueueItemStatus::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("alice"));
    }

    #[test]
    fn priority_ordering_then_fifo() {
        let queue = ApprovalQueue::new(QueueConfig::default(), chrono::Duration::minutes(30), None);
        let low = queue.enqueue(sample_proposal(Urgency::Low)).unwrap();
        let critical = queue.enqueue(sample_proposal(Urgency::Critical)).unwrap();
        let pending = queue.list_pending(10);
        assert_eq!(pending[0].item_id, critical);
        assert_eq!(pending[1].item_id, low);
    }

    #[test]
    fn capacity_is_enforced() {
        let queue = ApprovalQueue::new(QueueConfig { max_pending: 1 }, chrono::Duration::minutes(30), None);
        queue.enqueue(sample_proposal(Urgency::Low)).unwrap();
        let err = queue.enqueue(sample_proposal(Urgency::Low)).unwrap_err();
        assert_eq!(err, QueueError::AtCapacity(1));
    }

    #[test]
    fn expired_items_cannot_be_approved() {
        let queue = ApprovalQueue::new(QueueConfig::default(), chrono::Duration::milliseconds(-1), None);
        let id = queue.enqueue(sample_proposal(Urgency::Low));
        // expiry in the past means enqueue itself sweeps it to Expired on the next touch
        let id = id.unwrap();
        let err = queue.approve(&id, "alice", None).unwrap_err();
        assert_eq!(err, QueueError::Expired(id));
    }

    #[test]
    fn double_review_is_rejected() {
        let queue = ApprovalQueue::new(QueueConfig::default(), chrono::Duration::minutes(30), None);
        let id = queue.enqueue(sample_proposal(Urgency::Low)).unwrap();
        queue.approve(&id, "alice", None).unwrap();
        let err = queue.deny(&id, "bob", "too risky".into()).unwrap_err();
        assert_eq!(err, QueueError::NotPending(id, QueueItemStatus::Approved));
    }
}
