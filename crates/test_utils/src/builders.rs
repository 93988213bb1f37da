//! Test Data Builders
//!
//! Builders for workflow requests with sensible defaults, so a test only
//! spells out the fields it cares about.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, UserId};
use domain_expense::{NewClaim, NewRule, ReceiptHints};

use crate::fixtures::TemporalFixtures;

/// Builder for draft claim requests
pub struct ClaimRequestBuilder {
    amount: Option<Decimal>,
    currency: Currency,
    category: Option<String>,
    description: Option<String>,
    expense_date: Option<NaiveDate>,
    receipts: Vec<String>,
    hints: Option<ReceiptHints>,
}

impl Default for ClaimRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimRequestBuilder {
    /// A 100.00 USD travel expense
    pub fn new() -> Self {
        Self {
            amount: Some(dec!(100.00)),
            currency: Currency::USD,
            category: Some("Travel".to_string()),
            description: Some("Client visit".to_string()),
            expense_date: Some(TemporalFixtures::expense_date()),
            receipts: Vec::new(),
            hints: None,
        }
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Leaves the amount empty, e.g. to let receipt hints fill it
    pub fn without_amount(mut self) -> Self {
        self.amount = None;
        self
    }

    pub fn without_description(mut self) -> Self {
        self.description = None;
        self
    }

    pub fn receipt(mut self, reference: impl Into<String>) -> Self {
        self.receipts.push(reference.into());
        self
    }

    pub fn hints(mut self, hints: ReceiptHints) -> Self {
        self.hints = Some(hints);
        self
    }

    pub fn build(self) -> NewClaim {
        NewClaim {
            amount: self.amount,
            currency: self.currency,
            category: self.category,
            description: self.description,
            expense_date: self.expense_date,
            receipts: self.receipts,
            hints: self.hints,
        }
    }
}

/// Builder for approval rule requests
///
/// Defaults to a sequential, manager-first rule with no extra approvers and
/// a zero threshold.
pub struct RuleBuilder {
    request: NewRule,
}

impl RuleBuilder {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            request: NewRule {
                user_id,
                name: "Default approval".to_string(),
                ..Default::default()
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.request.name = name.into();
        self
    }

    pub fn approvers(mut self, approvers: Vec<UserId>) -> Self {
        self.request.approvers = approvers;
        self
    }

    pub fn without_manager(mut self) -> Self {
        self.request.is_manager_approver = Some(false);
        self
    }

    /// All listed approvers act at once; `percentage` of them must approve
    pub fn parallel(mut self, percentage: u8) -> Self {
        self.request.approval_sequence = Some(false);
        self.request.min_approval_percentage = Some(percentage);
        self
    }

    pub fn threshold(mut self, threshold: Decimal) -> Self {
        self.request.amount_threshold = Some(threshold);
        self
    }

    pub fn build(self) -> NewRule {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_builder_defaults() {
        let request = ClaimRequestBuilder::new().build();
        assert_eq!(request.amount, Some(dec!(100.00)));
        assert_eq!(request.currency, Currency::USD);
    }

    #[test]
    fn test_rule_builder_parallel() {
        let rule = RuleBuilder::for_user(UserId::new())
            .approvers(vec![UserId::new(), UserId::new()])
            .without_manager()
            .parallel(50)
            .build();
        assert_eq!(rule.approval_sequence, Some(false));
        assert_eq!(rule.min_approval_percentage, Some(50));
        assert_eq!(rule.is_manager_approver, Some(false));
        assert_eq!(rule.approvers.len(), 2);
    }
}
