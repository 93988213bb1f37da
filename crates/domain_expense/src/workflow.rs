//! Claim lifecycle controller
//!
//! [`ExpenseWorkflow`] is the only component that changes claim state. Every
//! transition runs as load, validate, mutate, save under a per-claim lock,
//! and the save itself is a compare-and-swap on the claim version, so two
//! racing actions on one claim can never both commit. Notifications go out
//! after the commit on a detached task and cannot affect the outcome.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{info, instrument, warn};

use core_kernel::{ClaimId, Clock, SystemClock, UserId};
use crate::access::{decision_slot, ensure_owner, ensure_view};
use crate::claim::{ClaimStatus, ClaimUpdate, ExpenseClaim, NewClaim};
use crate::conversion::ConversionAdapter;
use crate::error::ExpenseError;
use crate::evaluator::evaluate;
use crate::events::WorkflowEvent;
use crate::ports::{
    ClaimQuery, ClaimRepository, CurrencyConverter, NotificationSink, OrganizationDirectory,
    RuleRepository,
};
use crate::principal::{Principal, Role};
use crate::resolver::RuleResolver;
use crate::sequencer::{build_approvers, pending_approvers};

/// Listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimFilter {
    pub status: Option<ClaimStatus>,
    /// Only claims the caller can act on right now
    #[serde(default)]
    pub pending_for_me: bool,
}

/// Collaborators the workflow is wired with
#[derive(Clone)]
pub struct WorkflowPorts {
    pub claims: Arc<dyn ClaimRepository>,
    pub rules: Arc<dyn RuleRepository>,
    pub directory: Arc<dyn OrganizationDirectory>,
    pub converter: Arc<dyn CurrencyConverter>,
    pub notifier: Arc<dyn NotificationSink>,
}

pub struct ExpenseWorkflow {
    claims: Arc<dyn ClaimRepository>,
    directory: Arc<dyn OrganizationDirectory>,
    resolver: RuleResolver,
    conversion: ConversionAdapter,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    locks: ClaimLocks,
}

impl ExpenseWorkflow {
    pub fn new(ports: WorkflowPorts) -> Self {
        Self::with_clock(ports, Arc::new(SystemClock))
    }

    pub fn with_clock(ports: WorkflowPorts, clock: Arc<dyn Clock>) -> Self {
        Self {
            claims: ports.claims,
            directory: ports.directory,
            resolver: RuleResolver::new(ports.rules),
            conversion: ConversionAdapter::new(ports.converter),
            notifier: ports.notifier,
            clock,
            locks: ClaimLocks::default(),
        }
    }

    /// Creates a draft owned by `principal`
    #[instrument(skip(self, principal, request), fields(actor = %principal.id))]
    pub async fn create_draft(&self, principal: &Principal, request: NewClaim) -> Result<ExpenseClaim, ExpenseError> {
        let claim = ExpenseClaim::draft(principal.company_id, principal.id, request, self.clock.now())?;
        let stored = self.claims.insert(&claim).await?;
        info!(claim_id = %stored.id, amount = %stored.amount, "Draft claim created");
        Ok(stored)
    }

    /// Edits a draft or rejected claim through the allow-listed fields
    #[instrument(skip(self, principal, update), fields(claim_id = %id, actor = %principal.id))]
    pub async fn update_draft(
        &self,
        id: ClaimId,
        principal: &Principal,
        update: ClaimUpdate,
    ) -> Result<ExpenseClaim, ExpenseError> {
        let _guard = self.locks.acquire(id).await;
        let mut claim = self.claims.load(id).await?;
        ensure_owner(principal, &claim)?;

        let expected = claim.version;
        claim.apply_update(update, self.clock.now())?;
        let stored = self.claims.save(&claim, expected).await?;
        info!(version = stored.version, "Claim updated");
        Ok(stored)
    }

    /// Routes the claim to its approvers
    ///
    /// Rule resolution, approver sequencing and currency normalization run
    /// before the claim lock is taken; if the claim changed in the meantime
    /// the call fails with `VersionConflict`.
    #[instrument(skip(self, principal), fields(claim_id = %id, actor = %principal.id))]
    pub async fn submit(&self, id: ClaimId, principal: &Principal) -> Result<ExpenseClaim, ExpenseError> {
        let snapshot = self.claims.load(id).await?;
        ensure_owner(principal, &snapshot)?;
        ensure_submittable(&snapshot)?;

        let company = self.directory.get_company(snapshot.company_id).await?;
        let resolved = self
            .resolver
            .resolve(
                snapshot.company_id,
                snapshot.submitted_by,
                snapshot.amount,
                snapshot.category.as_deref(),
            )
            .await?;
        let approvers = build_approvers(&resolved.policy, principal.manager_id);
        let conversion = self
            .conversion
            .normalize(snapshot.amount, company.reporting_currency, self.clock.now())
            .await;

        let _guard = self.locks.acquire(id).await;
        let mut claim = self.claims.load(id).await?;
        if claim.version != snapshot.version {
            return Err(ExpenseError::VersionConflict {
                claim_id: id.to_string(),
                expected: snapshot.version,
            });
        }
        ensure_submittable(&claim)?;

        let now = self.clock.now();
        let expected = claim.version;
        claim.begin_cycle(&resolved.policy, approvers, resolved.rule_id, conversion, now)?;

        let verdict = evaluate(&claim);
        if verdict.complete {
            claim.finalize(verdict.approved, now)?;
        }

        let stored = self.claims.save(&claim, expected).await?;
        info!(
            cycle = stored.submission_cycle,
            approvers = stored.approvers.len(),
            sequential = stored.approval_sequence,
            rule_id = ?stored.rule_id,
            status = %stored.status,
            "Claim submitted"
        );

        self.announce(&stored, Vec::new());
        Ok(stored)
    }

    #[instrument(skip(self, principal, comment), fields(claim_id = %id, actor = %principal.id))]
    pub async fn approve(
        &self,
        id: ClaimId,
        principal: &Principal,
        comment: Option<String>,
    ) -> Result<ExpenseClaim, ExpenseError> {
        self.decide(id, principal, true, comment).await
    }

    #[instrument(skip(self, principal, comment), fields(claim_id = %id, actor = %principal.id))]
    pub async fn reject(
        &self,
        id: ClaimId,
        principal: &Principal,
        comment: Option<String>,
    ) -> Result<ExpenseClaim, ExpenseError> {
        self.decide(id, principal, false, comment).await
    }

    /// Withdraws a draft or in-flight claim
    #[instrument(skip(self, principal), fields(claim_id = %id, actor = %principal.id))]
    pub async fn cancel(&self, id: ClaimId, principal: &Principal) -> Result<ExpenseClaim, ExpenseError> {
        let _guard = self.locks.acquire(id).await;
        let mut claim = self.claims.load(id).await?;
        ensure_owner(principal, &claim)?;

        let waiting_on = if claim.status == ClaimStatus::WaitingApproval {
            pending_approvers(&claim)
        } else {
            Vec::new()
        };

        let expected = claim.version;
        claim.cancel(self.clock.now())?;
        let stored = self.claims.save(&claim, expected).await?;
        info!("Claim cancelled");

        self.announce(&stored, waiting_on);
        Ok(stored)
    }

    pub async fn get(&self, id: ClaimId, principal: &Principal) -> Result<ExpenseClaim, ExpenseError> {
        let claim = self.claims.load(id).await?;
        ensure_view(principal, &claim)?;
        Ok(claim)
    }

    /// Claims visible to `principal`, newest first
    ///
    /// Admins see the whole company; managers see their own claims, claims
    /// they are listed on, and their direct reports' claims; employees see
    /// their own.
    pub async fn list(&self, principal: &Principal, filter: &ClaimFilter) -> Result<Vec<ExpenseClaim>, ExpenseError> {
        if filter.pending_for_me {
            if filter.status.map_or(false, |s| s != ClaimStatus::WaitingApproval) {
                return Ok(Vec::new());
            }
            let query = ClaimQuery {
                company_id: Some(principal.company_id),
                approver: Some(principal.id),
                status: Some(ClaimStatus::WaitingApproval),
                ..Default::default()
            };
            let claims = self.claims.find(&query).await?;
            return Ok(claims
                .into_iter()
                .filter(|c| pending_approvers(c).contains(&principal.id))
                .collect());
        }

        let claims = match principal.role {
            Role::Admin => {
                let query = ClaimQuery::company(principal.company_id).with_status(filter.status);
                self.claims.find(&query).await?
            }
            Role::Manager => {
                let reports = self.directory.direct_reports(principal.id).await?;
                let query = ClaimQuery::company(principal.company_id).with_status(filter.status);
                self.claims
                    .find(&query)
                    .await?
                    .into_iter()
                    .filter(|c| {
                        c.submitted_by == principal.id
                            || c.is_approver(principal.id)
                            || reports.contains(&c.submitted_by)
                    })
                    .collect()
            }
            Role::Employee => {
                let query = ClaimQuery {
                    company_id: Some(principal.company_id),
                    submitted_by: Some(principal.id),
                    status: filter.status,
                    ..Default::default()
                };
                self.claims.find(&query).await?
            }
        };
        Ok(claims)
    }

    async fn decide(
        &self,
        id: ClaimId,
        principal: &Principal,
        approved: bool,
        comment: Option<String>,
    ) -> Result<ExpenseClaim, ExpenseError> {
        let _guard = self.locks.acquire(id).await;
        let mut claim = self.claims.load(id).await?;
        let slot = decision_slot(principal, &claim)?;

        let now = self.clock.now();
        let expected = claim.version;
        claim.record_decision(principal.id, approved, comment, slot, now);

        if approved {
            let verdict = evaluate(&claim);
            if verdict.complete {
                claim.finalize(verdict.approved, now)?;
            } else {
                claim.advance_cursor();
            }
        } else {
            claim.finalize(false, now)?;
        }

        let stored = self.claims.save(&claim, expected).await?;
        info!(
            approved,
            slot = ?slot,
            status = %stored.status,
            cursor = stored.current_approver_index,
            "Decision recorded"
        );

        // parallel approvers were all told on submission
        if stored.status != ClaimStatus::WaitingApproval || stored.approval_sequence {
            self.announce(&stored, Vec::new());
        }
        Ok(stored)
    }

    /// Sends the events following a committed transition
    ///
    /// While waiting, the approvers due to act are told; on a terminal
    /// status the claimant is told, plus any `also_notify` recipients.
    fn announce(&self, claim: &ExpenseClaim, also_notify: Vec<UserId>) {
        let now = self.clock.now();
        let mut deliveries = Vec::new();

        if claim.status == ClaimStatus::WaitingApproval {
            for approver in pending_approvers(claim) {
                deliveries.push((approver, WorkflowEvent::assigned(claim, approver, now)));
            }
        } else {
            let event = WorkflowEvent::updated(claim, now);
            deliveries.push((claim.submitted_by, event.clone()));
            for recipient in also_notify {
                if recipient != claim.submitted_by {
                    deliveries.push((recipient, event.clone()));
                }
            }
        }

        if deliveries.is_empty() {
            return;
        }

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            for (recipient, event) in deliveries {
                if let Err(e) = notifier.notify(recipient, &event).await {
                    warn!(
                        claim_id = %event.claim_id,
                        recipient = %recipient,
                        event = event.name(),
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
        });
    }
}

fn ensure_submittable(claim: &ExpenseClaim) -> Result<(), ExpenseError> {
    if claim.status.can_transition_to(ClaimStatus::WaitingApproval) {
        Ok(())
    } else {
        Err(ExpenseError::invalid_transition(format!(
            "claim {} cannot be submitted while {}",
            claim.id, claim.status
        )))
    }
}

type ClaimLock = Arc<tokio::sync::Mutex<()>>;

/// Per-claim serialization points, dropped once nobody holds them
#[derive(Default)]
struct ClaimLocks {
    inner: Mutex<HashMap<ClaimId, ClaimLock>>,
}

impl ClaimLocks {
    async fn acquire(&self, id: ClaimId) -> ClaimGuard<'_> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            Arc::clone(map.entry(id).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        ClaimGuard {
            locks: self,
            id,
            lock,
            guard: Some(guard),
        }
    }
}

struct ClaimGuard<'a> {
    locks: &'a ClaimLocks,
    id: ClaimId,
    lock: ClaimLock,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.locks.inner.lock().unwrap_or_else(|p| p.into_inner());
        // one reference in the map, one here
        if Arc::strong_count(&self.lock) == 2 {
            map.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_locks_are_released() {
        let locks = ClaimLocks::default();
        let id = ClaimId::new();
        {
            let _first = locks.acquire(id).await;
            assert_eq!(locks.inner.lock().unwrap().len(), 1);
        }
        assert!(locks.inner.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claim_lock_serializes_holders() {
        let locks = Arc::new(ClaimLocks::default());
        let id = ClaimId::new();
        let guard = locks.acquire(id).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.acquire(id).await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert!(locks.inner.lock().unwrap().is_empty());
    }
}
