//! In-memory port implementations
//!
//! Used by tests across the workspace and for running the API without a
//! database. Behaviour mirrors the PostgreSQL adapters, including the
//! optimistic version check on claim saves.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use core_kernel::{
    ClaimId, CompanyId, Currency, DomainPort, ExchangeRate, HealthCheckResult, HealthCheckable,
    PortError, RuleId, UserId,
};
use crate::claim::ExpenseClaim;
use crate::events::WorkflowEvent;
use crate::ports::{
    ClaimQuery, ClaimRepository, CurrencyConverter, NotificationSink, OrganizationDirectory,
    RuleRepository,
};
use crate::principal::{Company, Principal};
use crate::rule::ApprovalRule;

/// Claim store with compare-and-swap saves
#[derive(Debug, Default, Clone)]
pub struct InMemoryClaimRepository {
    claims: Arc<RwLock<HashMap<ClaimId, ExpenseClaim>>>,
}

impl InMemoryClaimRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.claims.read().await.len()
    }
}

impl DomainPort for InMemoryClaimRepository {}

#[async_trait]
impl HealthCheckable for InMemoryClaimRepository {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-claims")
    }
}

#[async_trait]
impl ClaimRepository for InMemoryClaimRepository {
    async fn insert(&self, claim: &ExpenseClaim) -> Result<ExpenseClaim, PortError> {
        let mut claims = self.claims.write().await;
        if claims.contains_key(&claim.id) {
            return Err(PortError::Conflict {
                message: format!("claim {} already exists", claim.id),
            });
        }
        let mut stored = claim.clone();
        stored.version = 1;
        claims.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn load(&self, id: ClaimId) -> Result<ExpenseClaim, PortError> {
        self.claims
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("ExpenseClaim", id))
    }

    async fn save(&self, claim: &ExpenseClaim, expected_version: u64) -> Result<ExpenseClaim, PortError> {
        let mut claims = self.claims.write().await;
        let current = claims
            .get(&claim.id)
            .ok_or_else(|| PortError::not_found("ExpenseClaim", claim.id))?;

        if current.version != expected_version {
            return Err(PortError::version_conflict("ExpenseClaim", claim.id, expected_version));
        }

        let mut stored = claim.clone();
        stored.version = expected_version + 1;
        claims.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find(&self, query: &ClaimQuery) -> Result<Vec<ExpenseClaim>, PortError> {
        let mut found: Vec<ExpenseClaim> = self
            .claims
            .read()
            .await
            .values()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.as_uuid().cmp(a.id.as_uuid())));
        Ok(found)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryRuleRepository {
    rules: Arc<RwLock<HashMap<RuleId, ApprovalRule>>>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_rules(rules: Vec<ApprovalRule>) -> Self {
        let repo = Self::new();
        for rule in rules {
            repo.rules.write().await.insert(rule.id, rule);
        }
        repo
    }
}

impl DomainPort for InMemoryRuleRepository {}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn find_applicable_rules(
        &self,
        company_id: CompanyId,
        user_id: UserId,
        max_threshold: Decimal,
    ) -> Result<Vec<ApprovalRule>, PortError> {
        let mut rules: Vec<ApprovalRule> = self
            .rules
            .read()
            .await
            .values()
            .filter(|r| {
                r.company_id == company_id
                    && r.user_id == user_id
                    && r.is_active
                    && r.amount_threshold <= max_threshold
            })
            .cloned()
            .collect();
        rules.sort_by(|a, b| {
            b.amount_threshold
                .cmp(&a.amount_threshold)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(rules)
    }

    async fn get(&self, id: RuleId) -> Result<ApprovalRule, PortError> {
        self.rules
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("ApprovalRule", id))
    }

    async fn insert(&self, rule: &ApprovalRule) -> Result<(), PortError> {
        self.rules.write().await.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn save(&self, rule: &ApprovalRule) -> Result<(), PortError> {
        let mut rules = self.rules.write().await;
        if !rules.contains_key(&rule.id) {
            return Err(PortError::not_found("ApprovalRule", rule.id));
        }
        rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn list(&self, company_id: CompanyId) -> Result<Vec<ApprovalRule>, PortError> {
        let mut rules: Vec<ApprovalRule> = self
            .rules
            .read()
            .await
            .values()
            .filter(|r| r.company_id == company_id && r.is_active)
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rules)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectory {
    principals: Arc<RwLock<HashMap<UserId, Principal>>>,
    companies: Arc<RwLock<HashMap<CompanyId, Company>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_company(&self, company: Company) {
        self.companies.write().await.insert(company.id, company);
    }

    pub async fn add_principal(&self, principal: Principal) {
        self.principals.write().await.insert(principal.id, principal);
    }
}

impl DomainPort for InMemoryDirectory {}

#[async_trait]
impl OrganizationDirectory for InMemoryDirectory {
    async fn get_principal(&self, id: UserId) -> Result<Principal, PortError> {
        self.principals
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("User", id))
    }

    async fn get_company(&self, id: CompanyId) -> Result<Company, PortError> {
        self.companies
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Company", id))
    }

    async fn direct_reports(&self, manager_id: UserId) -> Result<Vec<UserId>, PortError> {
        Ok(self
            .principals
            .read()
            .await
            .values()
            .filter(|p| p.manager_id == Some(manager_id))
            .map(|p| p.id)
            .collect())
    }
}

/// Fixed rate table; unknown pairs fail like an unreachable service
#[derive(Debug, Default)]
pub struct StaticRateConverter {
    rates: HashMap<(Currency, Currency), Decimal>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl StaticRateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }

    /// Makes every lookup fail until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DomainPort for StaticRateConverter {}

#[async_trait]
impl CurrencyConverter for StaticRateConverter {
    async fn rate(&self, from: Currency, to: Currency) -> Result<ExchangeRate, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "static-rates".to_string(),
            });
        }
        if from == to {
            return Ok(ExchangeRate::identity(from));
        }
        let rate = self
            .rates
            .get(&(from, to))
            .copied()
            .ok_or_else(|| PortError::not_found("ExchangeRate", format!("{}->{}", from, to)))?;
        ExchangeRate::new(from, to, rate).map_err(|e| PortError::Transformation {
            message: e.to_string(),
        })
    }
}

/// Captures delivered notifications
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    delivered: Arc<RwLock<Vec<(UserId, WorkflowEvent)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn delivered(&self) -> Vec<(UserId, WorkflowEvent)> {
        self.delivered.read().await.clone()
    }

    /// Waits until at least `count` events arrived or `within` elapsed
    pub async fn wait_for(&self, count: usize, within: Duration) -> Vec<(UserId, WorkflowEvent)> {
        let poll = async {
            loop {
                if self.delivered.read().await.len() >= count {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        let _ = tokio::time::timeout(within, poll).await;
        self.delivered().await
    }
}

impl DomainPort for RecordingSink {}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, recipient: UserId, event: &WorkflowEvent) -> Result<(), PortError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "recording-sink".to_string(),
            });
        }
        self.delivered.write().await.push((recipient, event.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::NewClaim;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn claim() -> ExpenseClaim {
        ExpenseClaim::draft(
            CompanyId::new(),
            UserId::new(),
            NewClaim {
                amount: Some(dec!(10)),
                currency: Currency::USD,
                category: None,
                description: None,
                expense_date: None,
                receipts: vec![],
                hints: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_checks_version() {
        let repo = InMemoryClaimRepository::new();
        let stored = repo.insert(&claim()).await.unwrap();
        assert_eq!(stored.version, 1);

        let saved = repo.save(&stored, 1).await.unwrap();
        assert_eq!(saved.version, 2);

        let stale = repo.save(&stored, 1).await.unwrap_err();
        assert!(stale.is_version_conflict());
    }

    #[tokio::test]
    async fn test_missing_rate_is_error() {
        let converter = StaticRateConverter::new();
        assert!(converter.rate(Currency::USD, Currency::EUR).await.is_err());
        assert_eq!(converter.calls(), 1);
    }
}
