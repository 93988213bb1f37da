//! PostgreSQL approval rule adapter

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    CompanyId, DomainPort, HealthCheckResult, HealthCheckable, PortError, RuleId, UserId,
};
use domain_expense::{ApprovalPolicy, ApprovalRule, RuleRepository};

use crate::adapters::claims::ping;
use crate::error::DatabaseError;
use crate::repositories::rules::{RuleRow, RulesRepository};

/// PostgreSQL-backed implementation of [`RuleRepository`]
#[derive(Debug, Clone)]
pub struct PostgresRuleAdapter {
    repository: RulesRepository,
    pool: PgPool,
}

impl PostgresRuleAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: RulesRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresRuleAdapter {}

#[async_trait]
impl HealthCheckable for PostgresRuleAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-rule-adapter").await
    }
}

#[async_trait]
impl RuleRepository for PostgresRuleAdapter {
    #[instrument(skip(self), fields(company_id = %company_id, user_id = %user_id))]
    async fn find_applicable_rules(
        &self,
        company_id: CompanyId,
        user_id: UserId,
        max_threshold: Decimal,
    ) -> Result<Vec<ApprovalRule>, PortError> {
        let rows = self
            .repository
            .find_applicable(company_id.into(), user_id.into(), max_threshold)
            .await?;
        debug!(count = rows.len(), "Applicable rules loaded");
        rows_to_rules(rows)
    }

    #[instrument(skip(self), fields(rule_id = %id))]
    async fn get(&self, id: RuleId) -> Result<ApprovalRule, PortError> {
        let row = self.repository.get_by_id(id.into()).await?;
        Ok(row_to_rule(row)?)
    }

    #[instrument(skip(self, rule), fields(rule_id = %rule.id))]
    async fn insert(&self, rule: &ApprovalRule) -> Result<(), PortError> {
        self.repository.insert(&rule_to_row(rule)).await?;
        Ok(())
    }

    #[instrument(skip(self, rule), fields(rule_id = %rule.id))]
    async fn save(&self, rule: &ApprovalRule) -> Result<(), PortError> {
        self.repository.update(&rule_to_row(rule)).await?;
        Ok(())
    }

    async fn list(&self, company_id: CompanyId) -> Result<Vec<ApprovalRule>, PortError> {
        rows_to_rules(self.repository.list_active(company_id.into()).await?)
    }
}

fn rows_to_rules(rows: Vec<RuleRow>) -> Result<Vec<ApprovalRule>, PortError> {
    rows.into_iter()
        .map(|row| row_to_rule(row).map_err(PortError::from))
        .collect()
}

fn rule_to_row(rule: &ApprovalRule) -> RuleRow {
    RuleRow {
        rule_id: rule.id.into(),
        company_id: rule.company_id.into(),
        user_id: rule.user_id.into(),
        name: rule.name.clone(),
        description: rule.description.clone(),
        category: rule.category.clone(),
        amount_threshold: rule.amount_threshold,
        is_manager_approver: rule.policy.is_manager_approver,
        approvers: rule.policy.approvers.iter().copied().map(Uuid::from).collect(),
        approval_sequence: rule.policy.approval_sequence,
        min_approval_percentage: i16::from(rule.policy.min_approval_percentage),
        is_active: rule.is_active,
        created_at: rule.created_at,
        updated_at: rule.updated_at,
    }
}

fn row_to_rule(row: RuleRow) -> Result<ApprovalRule, DatabaseError> {
    let min_approval_percentage = u8::try_from(row.min_approval_percentage)
        .map_err(|_| DatabaseError::serialization("min_approval_percentage out of range"))?;

    Ok(ApprovalRule {
        id: RuleId::from(row.rule_id),
        company_id: CompanyId::from(row.company_id),
        user_id: UserId::from(row.user_id),
        name: row.name,
        description: row.description,
        category: row.category,
        amount_threshold: row.amount_threshold,
        policy: ApprovalPolicy {
            is_manager_approver: row.is_manager_approver,
            approvers: row.approvers.into_iter().map(UserId::from).collect(),
            approval_sequence: row.approval_sequence,
            min_approval_percentage,
        },
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain_expense::NewRule;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rule_row_mapping_keeps_approver_order() {
        let approvers = vec![UserId::new(), UserId::new(), UserId::new()];
        let rule = ApprovalRule::create(
            CompanyId::new(),
            NewRule {
                user_id: UserId::new(),
                name: "Large travel".to_string(),
                approvers: approvers.clone(),
                approval_sequence: Some(false),
                min_approval_percentage: Some(60),
                amount_threshold: Some(dec!(1000)),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        let row = rule_to_row(&rule);
        assert_eq!(row.min_approval_percentage, 60);
        assert_eq!(row.approvers.len(), 3);

        let restored = row_to_rule(row).unwrap();
        assert_eq!(restored.policy.approvers, approvers);
        assert_eq!(restored, rule);
    }

    #[test]
    fn test_out_of_range_percentage_is_rejected() {
        let rule = ApprovalRule::create(
            CompanyId::new(),
            NewRule {
                user_id: UserId::new(),
                name: "Default".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let mut row = rule_to_row(&rule);
        row.min_approval_percentage = 300;
        assert!(row_to_rule(row).is_err());
    }
}
