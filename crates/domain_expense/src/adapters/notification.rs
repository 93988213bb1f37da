//! Notification sink that writes events to the log

use async_trait::async_trait;
use tracing::info;

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError, UserId};
use crate::events::{WorkflowEvent, WorkflowEventKind};
use crate::ports::NotificationSink;

/// Emits every workflow event as a structured `info` record
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

impl DomainPort for LogNotificationSink {}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, recipient: UserId, event: &WorkflowEvent) -> Result<(), PortError> {
        match &event.kind {
            WorkflowEventKind::ClaimAssigned { approver } => info!(
                target: "expense_notifications",
                event_id = %event.id,
                claim_id = %event.claim_id,
                %recipient,
                %approver,
                amount = %event.amount,
                "claim_assigned"
            ),
            WorkflowEventKind::ClaimUpdated { status } => info!(
                target: "expense_notifications",
                event_id = %event.id,
                claim_id = %event.claim_id,
                %recipient,
                %status,
                "claim_updated"
            ),
        }
        Ok(())
    }
}

#[async_trait]
impl HealthCheckable for LogNotificationSink {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("log-notifications")
    }
}
