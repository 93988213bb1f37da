//! Expense claim DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::Currency;
use domain_expense::{ApprovalRecord, ClaimUpdate, ExpenseClaim, NewClaim, ReceiptHints};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseRequest {
    pub amount: Option<Decimal>,
    pub currency: Currency,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub expense_date: Option<NaiveDate>,
    /// Document store references
    #[serde(default)]
    #[validate(length(max = 20))]
    pub receipts: Vec<String>,
    /// Values read off the receipt; only fill fields left empty
    pub hints: Option<ReceiptHints>,
}

impl From<CreateExpenseRequest> for NewClaim {
    fn from(request: CreateExpenseRequest) -> Self {
        NewClaim {
            amount: request.amount,
            currency: request.currency,
            category: request.category,
            description: request.description,
            expense_date: request.expense_date,
            receipts: request.receipts,
            hints: request.hints,
        }
    }
}

/// Editable draft fields; anything else in the body is ignored
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExpenseRequest {
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub expense_date: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub receipts: Option<Vec<String>>,
}

impl From<UpdateExpenseRequest> for ClaimUpdate {
    fn from(request: UpdateExpenseRequest) -> Self {
        ClaimUpdate {
            amount: request.amount,
            currency: request.currency,
            category: request.category,
            description: request.description,
            expense_date: request.expense_date,
            receipts: request.receipts,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct DecisionRequest {
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub approver_id: Uuid,
    pub approved: bool,
    pub comment: Option<String>,
    pub cycle: u32,
    pub decided_at: DateTime<Utc>,
}

impl From<&ApprovalRecord> for ApprovalResponse {
    fn from(record: &ApprovalRecord) -> Self {
        Self {
            approver_id: record.approver.into(),
            approved: record.approved,
            comment: record.comment.clone(),
            cycle: record.cycle,
            decided_at: record.decided_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpenseResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub submitted_by: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub reporting_amount: Option<Decimal>,
    pub reporting_currency: Option<String>,
    /// True when no rate was available and the amount was carried over as-is
    pub conversion_degraded: bool,
    pub category: Option<String>,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
    pub receipts: Vec<String>,
    pub status: String,
    pub approvers: Vec<Uuid>,
    pub current_approver: Option<Uuid>,
    pub approval_sequence: bool,
    pub min_approval_percentage: u8,
    pub approvals: Vec<ApprovalResponse>,
    pub rule_id: Option<Uuid>,
    pub version: u64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ExpenseClaim> for ExpenseResponse {
    fn from(claim: ExpenseClaim) -> Self {
        let current_approver = claim.current_approver().map(Uuid::from);
        let approvals = claim.approvals.iter().map(ApprovalResponse::from).collect();
        Self {
            id: claim.id.into(),
            company_id: claim.company_id.into(),
            submitted_by: claim.submitted_by.into(),
            amount: claim.amount.amount(),
            currency: claim.amount.currency().code().to_string(),
            reporting_amount: claim.conversion.as_ref().map(|c| c.reporting_amount.amount()),
            reporting_currency: claim
                .conversion
                .as_ref()
                .map(|c| c.reporting_currency().code().to_string()),
            conversion_degraded: claim.conversion.as_ref().map_or(false, |c| c.is_degraded()),
            category: claim.category,
            description: claim.description,
            expense_date: claim.expense_date,
            receipts: claim.receipts,
            status: claim.status.as_str().to_string(),
            approvers: claim.approvers.into_iter().map(Uuid::from).collect(),
            current_approver,
            approval_sequence: claim.approval_sequence,
            min_approval_percentage: claim.min_approval_percentage,
            approvals,
            rule_id: claim.rule_id.map(Uuid::from),
            version: claim.version,
            submitted_at: claim.submitted_at,
            created_at: claim.created_at,
            updated_at: claim.updated_at,
        }
    }
}
