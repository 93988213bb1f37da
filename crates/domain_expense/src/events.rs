//! Workflow events emitted to the notification sink

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, EventId, Money, UserId};
use crate::claim::{ClaimStatus, ExpenseClaim};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEventKind {
    /// The recipient must now act on the claim
    ClaimAssigned { approver: UserId },
    /// The claim changed status
    ClaimUpdated { status: ClaimStatus },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub id: EventId,
    pub claim_id: ClaimId,
    pub submitted_by: UserId,
    pub amount: Money,
    pub kind: WorkflowEventKind,
    pub occurred_at: DateTime<Utc>,
}

impl WorkflowEvent {
    pub fn assigned(claim: &ExpenseClaim, approver: UserId, at: DateTime<Utc>) -> Self {
        Self::new(claim, WorkflowEventKind::ClaimAssigned { approver }, at)
    }

    pub fn updated(claim: &ExpenseClaim, at: DateTime<Utc>) -> Self {
        Self::new(claim, WorkflowEventKind::ClaimUpdated { status: claim.status }, at)
    }

    fn new(claim: &ExpenseClaim, kind: WorkflowEventKind, at: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new_v7(),
            claim_id: claim.id,
            submitted_by: claim.submitted_by,
            amount: claim.amount,
            kind,
            occurred_at: at,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            WorkflowEventKind::ClaimAssigned { .. } => "claim_assigned",
            WorkflowEventKind::ClaimUpdated { .. } => "claim_updated",
        }
    }
}
