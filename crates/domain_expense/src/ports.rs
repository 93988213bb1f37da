//! Port definitions for the expense workflow
//!
//! Persistence, the organization directory, rate lookup and notification are
//! all reached through these traits. Every method returns
//! [`PortError`](core_kernel::PortError) so the engine handles failures the
//! same way whichever adapter is wired in.

use async_trait::async_trait;
use rust_decimal::Decimal;

use core_kernel::{ClaimId, CompanyId, Currency, DomainPort, ExchangeRate, PortError, RuleId, UserId};
use crate::claim::{ClaimStatus, ExpenseClaim};
use crate::events::WorkflowEvent;
use crate::principal::{Company, Principal};
use crate::rule::ApprovalRule;

/// Repository-level claim query
///
/// All set fields must match. `involving` matches claims the user submitted
/// or is listed on as approver.
#[derive(Debug, Clone, Default)]
pub struct ClaimQuery {
    pub company_id: Option<CompanyId>,
    pub submitted_by: Option<UserId>,
    pub submitted_by_any: Option<Vec<UserId>>,
    pub approver: Option<UserId>,
    pub status: Option<ClaimStatus>,
}

impl ClaimQuery {
    pub fn company(company_id: CompanyId) -> Self {
        Self {
            company_id: Some(company_id),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: Option<ClaimStatus>) -> Self {
        self.status = status;
        self
    }

    /// True when `claim` satisfies every set criterion
    pub fn matches(&self, claim: &ExpenseClaim) -> bool {
        self.company_id.map_or(true, |c| claim.company_id == c)
            && self.submitted_by.map_or(true, |u| claim.submitted_by == u)
            && self
                .submitted_by_any
                .as_ref()
                .map_or(true, |users| users.contains(&claim.submitted_by))
            && self.approver.map_or(true, |u| claim.approvers.contains(&u))
            && self.status.map_or(true, |s| claim.status == s)
    }
}

/// Claim persistence with optimistic concurrency
#[async_trait]
pub trait ClaimRepository: DomainPort {
    /// Stores a new claim at version 1
    async fn insert(&self, claim: &ExpenseClaim) -> Result<ExpenseClaim, PortError>;

    async fn load(&self, id: ClaimId) -> Result<ExpenseClaim, PortError>;

    /// Writes `claim` if the stored version equals `expected_version`
    ///
    /// Returns the stored claim with its bumped version, or
    /// `PortError::VersionConflict` when another writer got there first.
    async fn save(&self, claim: &ExpenseClaim, expected_version: u64) -> Result<ExpenseClaim, PortError>;

    /// Claims matching the query, newest first
    async fn find(&self, query: &ClaimQuery) -> Result<Vec<ExpenseClaim>, PortError>;
}

#[async_trait]
pub trait RuleRepository: DomainPort {
    /// Active rules for a claimant with `amount_threshold <= max_threshold`,
    /// highest threshold first
    async fn find_applicable_rules(
        &self,
        company_id: CompanyId,
        user_id: UserId,
        max_threshold: Decimal,
    ) -> Result<Vec<ApprovalRule>, PortError>;

    async fn get(&self, id: RuleId) -> Result<ApprovalRule, PortError>;

    async fn insert(&self, rule: &ApprovalRule) -> Result<(), PortError>;

    async fn save(&self, rule: &ApprovalRule) -> Result<(), PortError>;

    /// Active rules of a company, newest first
    async fn list(&self, company_id: CompanyId) -> Result<Vec<ApprovalRule>, PortError>;
}

/// Read access to users and companies
#[async_trait]
pub trait OrganizationDirectory: DomainPort {
    async fn get_principal(&self, id: UserId) -> Result<Principal, PortError>;

    async fn get_company(&self, id: CompanyId) -> Result<Company, PortError>;

    /// Users whose manager is `manager_id`
    async fn direct_reports(&self, manager_id: UserId) -> Result<Vec<UserId>, PortError>;
}

/// Exchange-rate lookup
#[async_trait]
pub trait CurrencyConverter: DomainPort {
    /// Rate for converting `from` into `to`
    ///
    /// A missing rate is an error, never an implied 1.0.
    async fn rate(&self, from: Currency, to: Currency) -> Result<ExchangeRate, PortError>;
}

/// Best-effort event delivery
#[async_trait]
pub trait NotificationSink: DomainPort {
    async fn notify(&self, recipient: UserId, event: &WorkflowEvent) -> Result<(), PortError>;
}
