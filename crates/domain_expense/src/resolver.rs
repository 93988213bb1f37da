//! Rule resolver
//!
//! Picks the single approval rule that governs a claim at submission time.
//! Among the claimant's active rules whose threshold does not exceed the
//! claim amount, the highest threshold wins and ties go to the most recently
//! created rule. With no match the fallback policy applies.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use core_kernel::{CompanyId, Money, RuleId, UserId};
use crate::error::ExpenseError;
use crate::ports::RuleRepository;
use crate::rule::{ApprovalPolicy, ApprovalRule};

/// The policy chosen for a submission and the rule it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPolicy {
    pub rule_id: Option<RuleId>,
    pub policy: ApprovalPolicy,
}

impl ResolvedPolicy {
    pub fn fallback() -> Self {
        Self {
            rule_id: None,
            policy: ApprovalPolicy::fallback(),
        }
    }
}

/// Selects the governing rule from a candidate set
///
/// Candidates may contain inactive or out-of-range rules; they are filtered
/// here so that the choice does not depend on what a repository pre-filters.
pub fn select_rule<'a>(candidates: &'a [ApprovalRule], amount: Decimal) -> Option<&'a ApprovalRule> {
    candidates
        .iter()
        .filter(|r| r.is_active && r.amount_threshold <= amount)
        .max_by(|a, b| {
            a.amount_threshold
                .cmp(&b.amount_threshold)
                .then_with(|| a.created_at.cmp(&b.created_at))
        })
}

pub struct RuleResolver {
    rules: Arc<dyn RuleRepository>,
}

impl RuleResolver {
    pub fn new(rules: Arc<dyn RuleRepository>) -> Self {
        Self { rules }
    }

    /// Resolves the policy for a claimant and original claim amount
    ///
    /// The category is accepted for logging only; rules are not filtered by it.
    pub async fn resolve(
        &self,
        company_id: CompanyId,
        claimant: UserId,
        amount: Money,
        category: Option<&str>,
    ) -> Result<ResolvedPolicy, ExpenseError> {
        let candidates = self
            .rules
            .find_applicable_rules(company_id, claimant, amount.amount())
            .await?;

        let resolved = match select_rule(&candidates, amount.amount()) {
            Some(rule) => ResolvedPolicy {
                rule_id: Some(rule.id),
                policy: rule.policy.clone(),
            },
            None => ResolvedPolicy::fallback(),
        };

        debug!(
            claimant = %claimant,
            amount = %amount,
            category = category.unwrap_or("-"),
            candidates = candidates.len(),
            rule_id = ?resolved.rule_id,
            "Resolved approval policy"
        );

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::NewRule;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn rule(threshold: Decimal, age_secs: i64) -> ApprovalRule {
        let created = Utc::now() - Duration::seconds(age_secs);
        ApprovalRule::create(
            CompanyId::new(),
            NewRule {
                user_id: UserId::new(),
                name: format!("over {}", threshold),
                amount_threshold: Some(threshold),
                ..Default::default()
            },
            created,
        )
        .unwrap()
    }

    #[test]
    fn test_highest_threshold_not_exceeding_amount_wins() {
        let rules = vec![rule(dec!(0), 10), rule(dec!(500), 10), rule(dec!(1000), 10)];
        let chosen = select_rule(&rules, dec!(750)).unwrap();
        assert_eq!(chosen.amount_threshold, dec!(500));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let rules = vec![rule(dec!(500), 10)];
        assert!(select_rule(&rules, dec!(500)).is_some());
        assert!(select_rule(&rules, dec!(499.99)).is_none());
    }

    #[test]
    fn test_ties_go_to_newest() {
        let older = rule(dec!(100), 100);
        let newer = rule(dec!(100), 1);
        let newer_id = newer.id;
        let rules = vec![newer, older];
        assert_eq!(select_rule(&rules, dec!(150)).unwrap().id, newer_id);
    }

    #[test]
    fn test_inactive_rules_are_ignored() {
        let mut inactive = rule(dec!(100), 1);
        inactive.is_active = false;
        let rules = vec![inactive, rule(dec!(10), 1)];
        assert_eq!(select_rule(&rules, dec!(150)).unwrap().amount_threshold, dec!(10));
    }
}
