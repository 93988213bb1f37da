//! Approval rules
//!
//! A rule is a company-and-claimant scoped template describing the approval
//! shape for claims at or above an amount threshold. Rules are owned by the
//! company and edited by admins; the engine only reads them and copies the
//! template into a claim at submission time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{CompanyId, RuleId, UserId};
use crate::error::ExpenseError;

/// The approval shape shared by rules and submitted claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Force the claimant's direct manager in as first approver
    pub is_manager_approver: bool,
    /// Approver template, in order
    pub approvers: Vec<UserId>,
    /// true = sequential, false = parallel with a percentage quota
    pub approval_sequence: bool,
    /// Parallel-mode quota, 0..=100
    pub min_approval_percentage: u8,
}

impl ApprovalPolicy {
    /// Used when no rule applies: manager approval, sequential, 100%
    pub fn fallback() -> Self {
        Self {
            is_manager_approver: true,
            approvers: Vec::new(),
            approval_sequence: true,
            min_approval_percentage: 100,
        }
    }

    pub fn validate(&self) -> Result<(), ExpenseError> {
        if self.min_approval_percentage > 100 {
            return Err(ExpenseError::validation(format!(
                "min_approval_percentage must be between 0 and 100, got {}",
                self.min_approval_percentage
            )));
        }
        Ok(())
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::fallback()
    }
}

/// A stored approval rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    pub id: RuleId,
    pub company_id: CompanyId,
    /// The claimant this rule applies to
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    /// Informational only; rule selection does not filter on it
    pub category: Option<String>,
    /// The rule applies when the claim amount is at least this value
    pub amount_threshold: Decimal,
    pub policy: ApprovalPolicy,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRule {
    /// Builds a rule from a creation request
    pub fn create(
        company_id: CompanyId,
        request: NewRule,
        now: DateTime<Utc>,
    ) -> Result<Self, ExpenseError> {
        let rule = Self {
            id: RuleId::new_v7(),
            company_id,
            user_id: request.user_id,
            name: request.name.trim().to_string(),
            description: request.description,
            category: request.category,
            amount_threshold: request.amount_threshold.unwrap_or(Decimal::ZERO),
            policy: ApprovalPolicy {
                is_manager_approver: request.is_manager_approver.unwrap_or(true),
                approvers: request.approvers,
                approval_sequence: request.approval_sequence.unwrap_or(true),
                min_approval_percentage: request.min_approval_percentage.unwrap_or(100),
            },
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Applies an allow-listed update; fields left `None` are untouched
    pub fn apply_update(&mut self, update: RuleUpdate, now: DateTime<Utc>) -> Result<(), ExpenseError> {
        let mut next = self.clone();

        if let Some(name) = update.name {
            next.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            next.description = Some(description);
        }
        if let Some(category) = update.category {
            next.category = Some(category);
        }
        if let Some(threshold) = update.amount_threshold {
            next.amount_threshold = threshold;
        }
        if let Some(flag) = update.is_manager_approver {
            next.policy.is_manager_approver = flag;
        }
        if let Some(approvers) = update.approvers {
            next.policy.approvers = approvers;
        }
        if let Some(sequence) = update.approval_sequence {
            next.policy.approval_sequence = sequence;
        }
        if let Some(percentage) = update.min_approval_percentage {
            next.policy.min_approval_percentage = percentage;
        }
        if let Some(active) = update.is_active {
            next.is_active = active;
        }

        next.validate()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Soft-deletes the rule
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), ExpenseError> {
        if self.name.is_empty() {
            return Err(ExpenseError::validation("rule name is required"));
        }
        if self.amount_threshold < Decimal::ZERO {
            return Err(ExpenseError::validation("amount_threshold cannot be negative"));
        }
        self.policy.validate()
    }
}

/// Request to create a rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRule {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_manager_approver: Option<bool>,
    #[serde(default)]
    pub approvers: Vec<UserId>,
    pub approval_sequence: Option<bool>,
    pub min_approval_percentage: Option<u8>,
    pub amount_threshold: Option<Decimal>,
}

/// The fields an admin may change on an existing rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_manager_approver: Option<bool>,
    pub approvers: Option<Vec<UserId>>,
    pub approval_sequence: Option<bool>,
    pub min_approval_percentage: Option<u8>,
    pub amount_threshold: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl RuleUpdate {
    /// Approver ids the update would introduce
    pub fn approvers(&self) -> &[UserId] {
        self.approvers.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_rule() -> NewRule {
        NewRule {
            user_id: UserId::new(),
            name: "Travel over 500".to_string(),
            amount_threshold: Some(dec!(500)),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_applies_defaults() {
        let rule = ApprovalRule::create(CompanyId::new(), new_rule(), Utc::now()).unwrap();
        assert!(rule.is_active);
        assert!(rule.policy.is_manager_approver);
        assert!(rule.policy.approval_sequence);
        assert_eq!(rule.policy.min_approval_percentage, 100);
        assert_eq!(rule.amount_threshold, dec!(500));
    }

    #[test]
    fn test_create_rejects_bad_percentage() {
        let mut request = new_rule();
        request.min_approval_percentage = Some(101);
        assert!(ApprovalRule::create(CompanyId::new(), request, Utc::now()).is_err());
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let mut rule = ApprovalRule::create(CompanyId::new(), new_rule(), Utc::now()).unwrap();
        let before = rule.clone();

        let result = rule.apply_update(
            RuleUpdate {
                name: Some("Renamed".to_string()),
                amount_threshold: Some(dec!(-1)),
                ..Default::default()
            },
            Utc::now(),
        );

        assert!(result.is_err());
        assert_eq!(rule, before);
    }

    #[test]
    fn test_deactivate() {
        let mut rule = ApprovalRule::create(CompanyId::new(), new_rule(), Utc::now()).unwrap();
        rule.deactivate(Utc::now());
        assert!(!rule.is_active);
    }
}
