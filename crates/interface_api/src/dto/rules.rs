//! Approval rule DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::UserId;
use domain_expense::{ApprovalRule, NewRule, RuleUpdate};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRuleRequest {
    /// The claimant the rule applies to
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_manager_approver: Option<bool>,
    #[serde(default)]
    pub approvers: Vec<Uuid>,
    pub approval_sequence: Option<bool>,
    #[validate(range(max = 100))]
    pub min_approval_percentage: Option<u8>,
    pub amount_threshold: Option<Decimal>,
}

impl From<CreateRuleRequest> for NewRule {
    fn from(request: CreateRuleRequest) -> Self {
        NewRule {
            user_id: UserId::from(request.user_id),
            name: request.name,
            description: request.description,
            category: request.category,
            is_manager_approver: request.is_manager_approver,
            approvers: request.approvers.into_iter().map(UserId::from).collect(),
            approval_sequence: request.approval_sequence,
            min_approval_percentage: request.min_approval_percentage,
            amount_threshold: request.amount_threshold,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_manager_approver: Option<bool>,
    pub approvers: Option<Vec<Uuid>>,
    pub approval_sequence: Option<bool>,
    #[validate(range(max = 100))]
    pub min_approval_percentage: Option<u8>,
    pub amount_threshold: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl From<UpdateRuleRequest> for RuleUpdate {
    fn from(request: UpdateRuleRequest) -> Self {
        RuleUpdate {
            name: request.name,
            description: request.description,
            category: request.category,
            is_manager_approver: request.is_manager_approver,
            approvers: request
                .approvers
                .map(|ids| ids.into_iter().map(UserId::from).collect()),
            approval_sequence: request.approval_sequence,
            min_approval_percentage: request.min_approval_percentage,
            amount_threshold: request.amount_threshold,
            is_active: request.is_active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RuleResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount_threshold: Decimal,
    pub is_manager_approver: bool,
    pub approvers: Vec<Uuid>,
    pub approval_sequence: bool,
    pub min_approval_percentage: u8,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ApprovalRule> for RuleResponse {
    fn from(rule: ApprovalRule) -> Self {
        Self {
            id: rule.id.into(),
            user_id: rule.user_id.into(),
            name: rule.name,
            description: rule.description,
            category: rule.category,
            amount_threshold: rule.amount_threshold,
            is_manager_approver: rule.policy.is_manager_approver,
            approvers: rule.policy.approvers.into_iter().map(Uuid::from).collect(),
            approval_sequence: rule.policy.approval_sequence,
            min_approval_percentage: rule.policy.min_approval_percentage,
            is_active: rule.is_active,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}
