//! Rule administration
//!
//! Company admins create, edit and deactivate the approval rules the
//! resolver reads. Edits never reach claims already submitted; submission
//! copies the rule's policy into the claim.

use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{Clock, RuleId, SystemClock, UserId};
use crate::access::ensure_admin;
use crate::error::ExpenseError;
use crate::ports::{OrganizationDirectory, RuleRepository};
use crate::principal::Principal;
use crate::rule::{ApprovalRule, NewRule, RuleUpdate};

pub struct RuleAdministration {
    rules: Arc<dyn RuleRepository>,
    directory: Arc<dyn OrganizationDirectory>,
    clock: Arc<dyn Clock>,
}

impl RuleAdministration {
    pub fn new(rules: Arc<dyn RuleRepository>, directory: Arc<dyn OrganizationDirectory>) -> Self {
        Self::with_clock(rules, directory, Arc::new(SystemClock))
    }

    pub fn with_clock(
        rules: Arc<dyn RuleRepository>,
        directory: Arc<dyn OrganizationDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { rules, directory, clock }
    }

    #[instrument(skip(self, admin, request), fields(actor = %admin.id))]
    pub async fn create_rule(&self, admin: &Principal, request: NewRule) -> Result<ApprovalRule, ExpenseError> {
        ensure_admin(admin)?;
        self.ensure_member(admin, request.user_id, "user_id").await?;
        for approver in &request.approvers {
            self.ensure_member(admin, *approver, "approvers").await?;
        }

        let rule = ApprovalRule::create(admin.company_id, request, self.clock.now())?;
        self.rules.insert(&rule).await?;
        info!(rule_id = %rule.id, threshold = %rule.amount_threshold, "Approval rule created");
        Ok(rule)
    }

    #[instrument(skip(self, admin, update), fields(actor = %admin.id, rule_id = %id))]
    pub async fn update_rule(
        &self,
        admin: &Principal,
        id: RuleId,
        update: RuleUpdate,
    ) -> Result<ApprovalRule, ExpenseError> {
        let mut rule = self.load_owned(admin, id).await?;
        for approver in update.approvers() {
            self.ensure_member(admin, *approver, "approvers").await?;
        }

        rule.apply_update(update, self.clock.now())?;
        self.rules.save(&rule).await?;
        info!(active = rule.is_active, "Approval rule updated");
        Ok(rule)
    }

    /// Soft delete
    #[instrument(skip(self, admin), fields(actor = %admin.id, rule_id = %id))]
    pub async fn deactivate_rule(&self, admin: &Principal, id: RuleId) -> Result<ApprovalRule, ExpenseError> {
        let mut rule = self.load_owned(admin, id).await?;
        rule.deactivate(self.clock.now());
        self.rules.save(&rule).await?;
        info!("Approval rule deactivated");
        Ok(rule)
    }

    /// Active rules of the admin's company, newest first
    pub async fn list_rules(&self, admin: &Principal) -> Result<Vec<ApprovalRule>, ExpenseError> {
        ensure_admin(admin)?;
        Ok(self.rules.list(admin.company_id).await?)
    }

    async fn load_owned(&self, admin: &Principal, id: RuleId) -> Result<ApprovalRule, ExpenseError> {
        ensure_admin(admin)?;
        let rule = self.rules.get(id).await?;
        if !admin.same_company(rule.company_id) {
            return Err(ExpenseError::not_found("ApprovalRule", id));
        }
        Ok(rule)
    }

    async fn ensure_member(&self, admin: &Principal, user: UserId, field: &str) -> Result<(), ExpenseError> {
        match self.directory.get_principal(user).await {
            Ok(p) if admin.same_company(p.company_id) => Ok(()),
            Ok(_) => Err(ExpenseError::validation(format!("{}: {} belongs to another company", field, user))),
            Err(e) if e.is_not_found() => Err(ExpenseError::validation(format!("{}: unknown user {}", field, user))),
            Err(e) => Err(e.into()),
        }
    }
}
