//! Expense claim aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, CompanyId, Currency, Money, RuleId, UserId};
use crate::conversion::ConversionOutcome;
use crate::error::ExpenseError;
use crate::rule::ApprovalPolicy;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStatus {
    /// Being prepared by the claimant
    Draft,
    /// Submitted and routed to approvers
    WaitingApproval,
    Approved,
    /// Rejected in the current cycle; may be resubmitted
    Rejected,
    /// Withdrawn by the claimant
    Cancelled,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Draft => "Draft",
            ClaimStatus::WaitingApproval => "WaitingApproval",
            ClaimStatus::Approved => "Approved",
            ClaimStatus::Rejected => "Rejected",
            ClaimStatus::Cancelled => "Cancelled",
        }
    }

    /// Checks if transition is valid
    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (self, target),
            (Draft, WaitingApproval) |
            (Rejected, WaitingApproval) |
            (WaitingApproval, Approved) |
            (WaitingApproval, Rejected) |
            (Draft, Cancelled) |
            (WaitingApproval, Cancelled)
        )
    }

    /// True for states the claimant may still edit
    pub fn is_editable(&self) -> bool {
        matches!(self, ClaimStatus::Draft | ClaimStatus::Rejected)
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(ClaimStatus::Draft),
            "WaitingApproval" => Ok(ClaimStatus::WaitingApproval),
            "Approved" => Ok(ClaimStatus::Approved),
            "Rejected" => Ok(ClaimStatus::Rejected),
            "Cancelled" => Ok(ClaimStatus::Cancelled),
            other => Err(format!("unknown claim status '{}'", other)),
        }
    }
}

/// One approve/reject decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Who decided (an Admin acting as override is recorded as themselves)
    pub approver: UserId,
    pub approved: bool,
    pub comment: Option<String>,
    /// Submission cycle the decision belongs to, starting at 1
    pub cycle: u32,
    /// Approver slot filled, sequential mode only
    pub slot: Option<usize>,
    pub decided_at: DateTime<Utc>,
}

/// Structured data pulled from a receipt by the document store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptHints {
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub merchant: Option<String>,
}

/// Request to create a draft claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
    /// May be left empty when receipt hints carry an amount
    pub amount: Option<Decimal>,
    pub currency: Currency,
    pub category: Option<String>,
    pub description: Option<String>,
    pub expense_date: Option<NaiveDate>,
    #[serde(default)]
    pub receipts: Vec<String>,
    pub hints: Option<ReceiptHints>,
}

impl NewClaim {
    /// Fills empty fields from receipt hints; explicit input always wins
    pub fn merge_hints(mut self) -> Self {
        if let Some(hints) = self.hints.clone() {
            if self.amount.is_none() {
                self.amount = hints.amount;
            }
            if self.expense_date.is_none() {
                self.expense_date = hints.date;
            }
            if blank(&self.description) {
                self.description = hints.merchant.filter(|m| !m.trim().is_empty());
            }
        }
        self
    }
}

/// The fields a claimant may change on a draft or rejected claim
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimUpdate {
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub expense_date: Option<NaiveDate>,
    pub receipts: Option<Vec<String>>,
}

impl ClaimUpdate {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.currency.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.expense_date.is_none()
            && self.receipts.is_none()
    }
}

/// An expense claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseClaim {
    pub id: ClaimId,
    pub company_id: CompanyId,
    pub submitted_by: UserId,
    /// Original amount and currency as entered
    pub amount: Money,
    pub category: Option<String>,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
    /// Opaque receipt references from the document store
    pub receipts: Vec<String>,
    pub receipt_hints: Option<ReceiptHints>,
    /// Normalization into the company's reporting currency, set on submit
    pub conversion: Option<ConversionOutcome>,
    pub status: ClaimStatus,
    /// Approver snapshot for the current cycle
    pub approvers: Vec<UserId>,
    /// Every decision ever received, across all cycles
    pub approvals: Vec<ApprovalRecord>,
    pub current_approver_index: usize,
    pub approval_sequence: bool,
    pub min_approval_percentage: u8,
    pub is_manager_approver: bool,
    /// Rule the current cycle was routed by, if any
    pub rule_id: Option<RuleId>,
    /// 0 while never submitted
    pub submission_cycle: u32,
    pub submitted_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped on every save
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExpenseClaim {
    /// Creates a draft claim
    pub fn draft(
        company_id: CompanyId,
        submitted_by: UserId,
        request: NewClaim,
        now: DateTime<Utc>,
    ) -> Result<Self, ExpenseError> {
        let request = request.merge_hints();
        let amount = request
            .amount
            .ok_or_else(|| ExpenseError::validation("amount is required"))?;
        let amount = Money::positive(amount, request.currency)?;
        let policy = ApprovalPolicy::fallback();

        Ok(Self {
            id: ClaimId::new_v7(),
            company_id,
            submitted_by,
            amount,
            category: non_blank(request.category),
            description: non_blank(request.description),
            expense_date: request.expense_date.unwrap_or_else(|| now.date_naive()),
            receipts: request.receipts,
            receipt_hints: request.hints,
            conversion: None,
            status: ClaimStatus::Draft,
            approvers: Vec::new(),
            approvals: Vec::new(),
            current_approver_index: 0,
            approval_sequence: policy.approval_sequence,
            min_approval_percentage: policy.min_approval_percentage,
            is_manager_approver: policy.is_manager_approver,
            rule_id: None,
            submission_cycle: 0,
            submitted_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Approvals belonging to the current submission cycle
    pub fn current_cycle_approvals(&self) -> impl Iterator<Item = &ApprovalRecord> + '_ {
        let cycle = self.submission_cycle;
        self.approvals.iter().filter(move |a| a.cycle == cycle)
    }

    /// The approver at the cursor, sequential mode only
    pub fn current_approver(&self) -> Option<UserId> {
        if !self.approval_sequence {
            return None;
        }
        self.approvers.get(self.current_approver_index).copied()
    }

    /// True when `user` already decided in the current cycle
    pub fn has_acted(&self, user: UserId) -> bool {
        self.current_cycle_approvals().any(|a| a.approver == user)
    }

    pub fn is_approver(&self, user: UserId) -> bool {
        self.approvers.contains(&user)
    }

    /// Amount in the reporting currency, once submitted
    pub fn reporting_amount(&self) -> Option<Money> {
        self.conversion.as_ref().map(|c| c.reporting_amount)
    }

    pub(crate) fn apply_update(&mut self, update: ClaimUpdate, now: DateTime<Utc>) -> Result<(), ExpenseError> {
        if !self.status.is_editable() {
            return Err(ExpenseError::invalid_transition(format!(
                "claim {} cannot be edited while {}",
                self.id, self.status
            )));
        }

        let amount = update.amount.unwrap_or_else(|| self.amount.amount());
        let currency = update.currency.unwrap_or_else(|| self.amount.currency());
        self.amount = Money::positive(amount, currency)?;

        if let Some(category) = update.category {
            self.category = non_blank(Some(category));
        }
        if let Some(description) = update.description {
            self.description = non_blank(Some(description));
        }
        if let Some(date) = update.expense_date {
            self.expense_date = date;
        }
        if let Some(receipts) = update.receipts {
            self.receipts = receipts;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Opens a new submission cycle with a fresh approver snapshot
    pub(crate) fn begin_cycle(
        &mut self,
        policy: &ApprovalPolicy,
        approvers: Vec<UserId>,
        rule_id: Option<RuleId>,
        conversion: ConversionOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), ExpenseError> {
        self.transition(ClaimStatus::WaitingApproval)?;
        self.approvers = approvers;
        self.approval_sequence = policy.approval_sequence;
        self.min_approval_percentage = policy.min_approval_percentage;
        self.is_manager_approver = policy.is_manager_approver;
        self.rule_id = rule_id;
        self.conversion = Some(conversion);
        self.current_approver_index = 0;
        self.submission_cycle += 1;
        self.submitted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn record_decision(
        &mut self,
        approver: UserId,
        approved: bool,
        comment: Option<String>,
        slot: Option<usize>,
        now: DateTime<Utc>,
    ) {
        self.approvals.push(ApprovalRecord {
            approver,
            approved,
            comment: comment.filter(|c| !c.trim().is_empty()),
            cycle: self.submission_cycle,
            slot,
            decided_at: now,
        });
        self.updated_at = now;
    }

    /// Moves the sequential cursor to the next slot
    pub(crate) fn advance_cursor(&mut self) {
        if self.approval_sequence && self.status == ClaimStatus::WaitingApproval {
            self.current_approver_index += 1;
        }
    }

    pub(crate) fn finalize(&mut self, approved: bool, now: DateTime<Utc>) -> Result<(), ExpenseError> {
        if approved {
            self.transition(ClaimStatus::Approved)?;
        } else {
            self.transition(ClaimStatus::Rejected)?;
            self.current_approver_index = 0;
        }
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), ExpenseError> {
        self.transition(ClaimStatus::Cancelled)?;
        self.updated_at = now;
        Ok(())
    }

    fn transition(&mut self, target: ClaimStatus) -> Result<(), ExpenseError> {
        if !self.status.can_transition_to(target) {
            return Err(ExpenseError::invalid_transition(format!(
                "claim {} cannot move from {} to {}",
                self.id, self.status, target
            )));
        }
        self.status = target;
        Ok(())
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
