//! Expense claim repository
//!
//! Row-level access to `expense_claims` and the append-only
//! `expense_approvals` log. Writes are versioned: an update only lands when
//! the stored version still equals the version the writer read.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = r#"
    claim_id, company_id, submitted_by, amount, currency, category, description,
    expense_date, receipts, receipt_hints, reporting_amount, reporting_currency,
    conversion_status, converted_at, status, approvers, current_approver_index,
    approval_sequence, min_approval_percentage, is_manager_approver, rule_id,
    submission_cycle, submitted_at, version, created_at, updated_at
"#;

/// Repository for expense claims and their decision log
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a claim together with any decisions it already carries
    ///
    /// The stored version is taken from `claim.version`.
    pub async fn insert(&self, claim: &ClaimRow, approvals: &[ApprovalRow]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO expense_claims (
                claim_id, company_id, submitted_by, amount, currency, category, description,
                expense_date, receipts, receipt_hints, reporting_amount, reporting_currency,
                conversion_status, converted_at, status, approvers, current_approver_index,
                approval_sequence, min_approval_percentage, is_manager_approver, rule_id,
                submission_cycle, submitted_at, version, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26
            )
            "#,
        )
        .bind(claim.claim_id)
        .bind(claim.company_id)
        .bind(claim.submitted_by)
        .bind(claim.amount)
        .bind(&claim.currency)
        .bind(&claim.category)
        .bind(&claim.description)
        .bind(claim.expense_date)
        .bind(&claim.receipts)
        .bind(&claim.receipt_hints)
        .bind(claim.reporting_amount)
        .bind(&claim.reporting_currency)
        .bind(&claim.conversion_status)
        .bind(claim.converted_at)
        .bind(&claim.status)
        .bind(&claim.approvers)
        .bind(claim.current_approver_index)
        .bind(claim.approval_sequence)
        .bind(claim.min_approval_percentage)
        .bind(claim.is_manager_approver)
        .bind(claim.rule_id)
        .bind(claim.submission_cycle)
        .bind(claim.submitted_at)
        .bind(claim.version)
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .execute(&mut *tx)
        .await?;

        append_approvals(&mut tx, approvals).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Retrieves a claim and its decision log ordered by sequence number
    pub async fn get_by_id(&self, claim_id: Uuid) -> Result<(ClaimRow, Vec<ApprovalRow>), DatabaseError> {
        let claim = sqlx::query_as::<_, ClaimRow>(&format!(
            "SELECT {CLAIM_COLUMNS} FROM expense_claims WHERE claim_id = $1"
        ))
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("ExpenseClaim", claim_id))?;

        let approvals = self.approvals_for(&[claim_id]).await?;
        Ok((claim, approvals))
    }

    pub async fn exists(&self, claim_id: Uuid) -> Result<bool, DatabaseError> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM expense_claims WHERE claim_id = $1)",
        )
        .bind(claim_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    /// Overwrites a claim if its stored version equals `expected_version`
    ///
    /// New decisions are appended in the same transaction; rows already in
    /// the log are left untouched. Returns the new version, or `None` when
    /// no row matched (the claim is missing or another writer won).
    pub async fn update_versioned(
        &self,
        claim: &ClaimRow,
        expected_version: i64,
        approvals: &[ApprovalRow],
    ) -> Result<Option<i64>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let version = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE expense_claims SET
                amount = $3,
                currency = $4,
                category = $5,
                description = $6,
                expense_date = $7,
                receipts = $8,
                receipt_hints = $9,
                reporting_amount = $10,
                reporting_currency = $11,
                conversion_status = $12,
                converted_at = $13,
                status = $14,
                approvers = $15,
                current_approver_index = $16,
                approval_sequence = $17,
                min_approval_percentage = $18,
                is_manager_approver = $19,
                rule_id = $20,
                submission_cycle = $21,
                submitted_at = $22,
                updated_at = $23,
                version = version + 1
            WHERE claim_id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(claim.claim_id)
        .bind(expected_version)
        .bind(claim.amount)
        .bind(&claim.currency)
        .bind(&claim.category)
        .bind(&claim.description)
        .bind(claim.expense_date)
        .bind(&claim.receipts)
        .bind(&claim.receipt_hints)
        .bind(claim.reporting_amount)
        .bind(&claim.reporting_currency)
        .bind(&claim.conversion_status)
        .bind(claim.converted_at)
        .bind(&claim.status)
        .bind(&claim.approvers)
        .bind(claim.current_approver_index)
        .bind(claim.approval_sequence)
        .bind(claim.min_approval_percentage)
        .bind(claim.is_manager_approver)
        .bind(claim.rule_id)
        .bind(claim.submission_cycle)
        .bind(claim.submitted_at)
        .bind(claim.updated_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(version) = version else {
            tx.rollback().await?;
            return Ok(None);
        };

        append_approvals(&mut tx, approvals).await?;
        tx.commit().await?;
        Ok(Some(version))
    }

    /// Claims matching every set criterion, newest first
    pub async fn find(&self, search: &ClaimSearch) -> Result<Vec<ClaimRow>, DatabaseError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CLAIM_COLUMNS} FROM expense_claims WHERE TRUE"));

        if let Some(company_id) = search.company_id {
            builder.push(" AND company_id = ").push_bind(company_id);
        }
        if let Some(submitted_by) = search.submitted_by {
            builder.push(" AND submitted_by = ").push_bind(submitted_by);
        }
        if let Some(ref users) = search.submitted_by_any {
            builder.push(" AND submitted_by = ANY(").push_bind(users.clone()).push(")");
        }
        if let Some(approver) = search.approver {
            builder.push(" AND ").push_bind(approver).push(" = ANY(approvers)");
        }
        if let Some(ref status) = search.status {
            builder.push(" AND status = ").push_bind(status.clone());
        }
        builder.push(" ORDER BY created_at DESC, claim_id DESC");

        let rows = builder
            .build_query_as::<ClaimRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Decision log entries for the given claims, ordered by claim then sequence
    pub async fn approvals_for(&self, claim_ids: &[Uuid]) -> Result<Vec<ApprovalRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ApprovalRow>(
            r#"
            SELECT claim_id, seq, approver_id, approved, comment, cycle, slot, decided_at
            FROM expense_approvals
            WHERE claim_id = ANY($1)
            ORDER BY claim_id, seq
            "#,
        )
        .bind(claim_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn append_approvals(
    tx: &mut Transaction<'_, Postgres>,
    approvals: &[ApprovalRow],
) -> Result<(), DatabaseError> {
    for approval in approvals {
        sqlx::query(
            r#"
            INSERT INTO expense_approvals (
                claim_id, seq, approver_id, approved, comment, cycle, slot, decided_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (claim_id, seq) DO NOTHING
            "#,
        )
        .bind(approval.claim_id)
        .bind(approval.seq)
        .bind(approval.approver_id)
        .bind(approval.approved)
        .bind(&approval.comment)
        .bind(approval.cycle)
        .bind(approval.slot)
        .bind(approval.decided_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Row Types
// =============================================================================

/// Database row for an expense claim
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub company_id: Uuid,
    pub submitted_by: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
    pub receipts: Vec<String>,
    pub receipt_hints: Option<serde_json::Value>,
    pub reporting_amount: Option<Decimal>,
    pub reporting_currency: Option<String>,
    pub conversion_status: Option<serde_json::Value>,
    pub converted_at: Option<DateTime<Utc>>,
    pub status: String,
    pub approvers: Vec<Uuid>,
    pub current_approver_index: i32,
    pub approval_sequence: bool,
    pub min_approval_percentage: i16,
    pub is_manager_approver: bool,
    pub rule_id: Option<Uuid>,
    pub submission_cycle: i32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for one approve/reject decision
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ApprovalRow {
    pub claim_id: Uuid,
    /// Position in the claim's decision log, starting at 0
    pub seq: i32,
    pub approver_id: Uuid,
    pub approved: bool,
    pub comment: Option<String>,
    pub cycle: i32,
    pub slot: Option<i32>,
    pub decided_at: DateTime<Utc>,
}

/// Search criteria for claims; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct ClaimSearch {
    pub company_id: Option<Uuid>,
    pub submitted_by: Option<Uuid>,
    pub submitted_by_any: Option<Vec<Uuid>>,
    pub approver: Option<Uuid>,
    pub status: Option<String>,
}
