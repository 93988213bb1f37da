//! Approval rule repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const RULE_COLUMNS: &str = r#"
    rule_id, company_id, user_id, name, description, category, amount_threshold,
    is_manager_approver, approvers, approval_sequence, min_approval_percentage,
    is_active, created_at, updated_at
"#;

/// Repository for approval rules
#[derive(Debug, Clone)]
pub struct RulesRepository {
    pool: PgPool,
}

impl RulesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active rules for a claimant with a threshold at or below `max_threshold`
    ///
    /// Highest threshold first; ties go to the most recently created rule.
    pub async fn find_applicable(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        max_threshold: Decimal,
    ) -> Result<Vec<RuleRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            r#"
            SELECT {RULE_COLUMNS}
            FROM approval_rules
            WHERE company_id = $1
              AND user_id = $2
              AND is_active
              AND amount_threshold <= $3
            ORDER BY amount_threshold DESC, created_at DESC
            "#
        ))
        .bind(company_id)
        .bind(user_id)
        .bind(max_threshold)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, rule_id: Uuid) -> Result<RuleRow, DatabaseError> {
        sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM approval_rules WHERE rule_id = $1"
        ))
        .bind(rule_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("ApprovalRule", rule_id))
    }

    pub async fn insert(&self, rule: &RuleRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO approval_rules (
                rule_id, company_id, user_id, name, description, category, amount_threshold,
                is_manager_approver, approvers, approval_sequence, min_approval_percentage,
                is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(rule.rule_id)
        .bind(rule.company_id)
        .bind(rule.user_id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(&rule.category)
        .bind(rule.amount_threshold)
        .bind(rule.is_manager_approver)
        .bind(&rule.approvers)
        .bind(rule.approval_sequence)
        .bind(rule.min_approval_percentage)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Overwrites every mutable column of an existing rule
    pub async fn update(&self, rule: &RuleRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE approval_rules SET
                user_id = $2,
                name = $3,
                description = $4,
                category = $5,
                amount_threshold = $6,
                is_manager_approver = $7,
                approvers = $8,
                approval_sequence = $9,
                min_approval_percentage = $10,
                is_active = $11,
                updated_at = $12
            WHERE rule_id = $1
            "#,
        )
        .bind(rule.rule_id)
        .bind(rule.user_id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(&rule.category)
        .bind(rule.amount_threshold)
        .bind(rule.is_manager_approver)
        .bind(&rule.approvers)
        .bind(rule.approval_sequence)
        .bind(rule.min_approval_percentage)
        .bind(rule.is_active)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("ApprovalRule", rule.rule_id));
        }
        Ok(())
    }

    /// Active rules of a company, newest first
    pub async fn list_active(&self, company_id: Uuid) -> Result<Vec<RuleRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            r#"
            SELECT {RULE_COLUMNS}
            FROM approval_rules
            WHERE company_id = $1 AND is_active
            ORDER BY created_at DESC
            "#
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Database row for an approval rule
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RuleRow {
    pub rule_id: Uuid,
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount_threshold: Decimal,
    pub is_manager_approver: bool,
    pub approvers: Vec<Uuid>,
    pub approval_sequence: bool,
    pub min_approval_percentage: i16,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
