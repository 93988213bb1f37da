//! PostgreSQL claim adapter
//!
//! Implements [`ClaimRepository`] on top of [`ClaimsRepository`], mapping
//! between `ExpenseClaim` and its row representation. Saves use the
//! version column as a compare-and-swap token.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, ClaimId, CompanyId, Currency, DomainPort, HealthCheckResult, HealthCheckable,
    Money, PortError, RuleId, UserId,
};
use domain_expense::{
    ApprovalRecord, ClaimQuery, ClaimRepository, ClaimStatus, ConversionOutcome, ExpenseClaim,
};

use crate::error::DatabaseError;
use crate::repositories::claims::{ApprovalRow, ClaimRow, ClaimSearch, ClaimsRepository};

/// PostgreSQL-backed implementation of [`ClaimRepository`]
#[derive(Debug, Clone)]
pub struct PostgresClaimAdapter {
    repository: ClaimsRepository,
    pool: PgPool,
}

impl PostgresClaimAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimsRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &ClaimsRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClaimAdapter {}

#[async_trait]
impl HealthCheckable for PostgresClaimAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-claim-adapter").await
    }
}

#[async_trait]
impl ClaimRepository for PostgresClaimAdapter {
    #[instrument(skip(self, claim), fields(claim_id = %claim.id))]
    async fn insert(&self, claim: &ExpenseClaim) -> Result<ExpenseClaim, PortError> {
        debug!("Inserting expense claim");

        let mut stored = claim.clone();
        stored.version = 1;
        let row = claim_to_row(&stored)?;
        self.repository
            .insert(&row, &approvals_to_rows(&stored))
            .await?;
        Ok(stored)
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn load(&self, id: ClaimId) -> Result<ExpenseClaim, PortError> {
        let (row, approvals) = self.repository.get_by_id(id.into()).await?;
        Ok(row_to_claim(row, approvals)?)
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id, expected_version))]
    async fn save(&self, claim: &ExpenseClaim, expected_version: u64) -> Result<ExpenseClaim, PortError> {
        let row = claim_to_row(claim)?;
        let expected = i64::try_from(expected_version)
            .map_err(|_| PortError::validation("version out of range"))?;

        let updated = self
            .repository
            .update_versioned(&row, expected, &approvals_to_rows(claim))
            .await?;

        let Some(version) = updated else {
            // Zero rows: either the claim is gone or another writer bumped the version
            return if self.repository.exists(claim.id.into()).await? {
                Err(PortError::version_conflict("ExpenseClaim", claim.id, expected_version))
            } else {
                Err(PortError::not_found("ExpenseClaim", claim.id))
            };
        };

        debug!(version, "Claim saved");
        let mut stored = claim.clone();
        stored.version = u64::try_from(version)
            .map_err(|_| PortError::internal("negative claim version"))?;
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn find(&self, query: &ClaimQuery) -> Result<Vec<ExpenseClaim>, PortError> {
        let search = ClaimSearch {
            company_id: query.company_id.map(Uuid::from),
            submitted_by: query.submitted_by.map(Uuid::from),
            submitted_by_any: query
                .submitted_by_any
                .as_ref()
                .map(|users| users.iter().copied().map(Uuid::from).collect()),
            approver: query.approver.map(Uuid::from),
            status: query.status.map(|s| s.as_str().to_string()),
        };

        let rows = self.repository.find(&search).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.claim_id).collect();
        let mut by_claim: HashMap<Uuid, Vec<ApprovalRow>> = HashMap::new();
        for approval in self.repository.approvals_for(&ids).await? {
            by_claim.entry(approval.claim_id).or_default().push(approval);
        }

        let claims = rows
            .into_iter()
            .map(|row| {
                let approvals = by_claim.remove(&row.claim_id).unwrap_or_default();
                row_to_claim(row, approvals)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = claims.len(), "Claims found");
        Ok(claims)
    }
}

pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, message) = match result {
        Ok(_) => (AdapterHealth::Healthy, None),
        Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
    };
    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status,
        latency_ms,
        message,
        checked_at: chrono::Utc::now(),
    }
}

// =============================================================================
// Conversion Functions
// =============================================================================

fn claim_to_row(claim: &ExpenseClaim) -> Result<ClaimRow, DatabaseError> {
    let receipt_hints = claim
        .receipt_hints
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| DatabaseError::serialization(e.to_string()))?;
    let conversion_status = claim
        .conversion
        .as_ref()
        .map(|c| serde_json::to_value(&c.status))
        .transpose()
        .map_err(|e| DatabaseError::serialization(e.to_string()))?;

    Ok(ClaimRow {
        claim_id: claim.id.into(),
        company_id: claim.company_id.into(),
        submitted_by: claim.submitted_by.into(),
        amount: claim.amount.amount(),
        currency: claim.amount.currency().code().to_string(),
        category: claim.category.clone(),
        description: claim.description.clone(),
        expense_date: claim.expense_date,
        receipts: claim.receipts.clone(),
        receipt_hints,
        reporting_amount: claim.conversion.as_ref().map(|c| c.reporting_amount.amount()),
        reporting_currency: claim
            .conversion
            .as_ref()
            .map(|c| c.reporting_currency().code().to_string()),
        conversion_status,
        converted_at: claim.conversion.as_ref().map(|c| c.converted_at),
        status: claim.status.as_str().to_string(),
        approvers: claim.approvers.iter().copied().map(Uuid::from).collect(),
        current_approver_index: to_i32(claim.current_approver_index, "current_approver_index")?,
        approval_sequence: claim.approval_sequence,
        min_approval_percentage: i16::from(claim.min_approval_percentage),
        is_manager_approver: claim.is_manager_approver,
        rule_id: claim.rule_id.map(Uuid::from),
        submission_cycle: to_i32(claim.submission_cycle as usize, "submission_cycle")?,
        submitted_at: claim.submitted_at,
        version: i64::try_from(claim.version)
            .map_err(|_| DatabaseError::serialization("version out of range"))?,
        created_at: claim.created_at,
        updated_at: claim.updated_at,
    })
}

fn approvals_to_rows(claim: &ExpenseClaim) -> Vec<ApprovalRow> {
    claim
        .approvals
        .iter()
        .enumerate()
        .map(|(seq, record)| ApprovalRow {
            claim_id: claim.id.into(),
            seq: seq as i32,
            approver_id: record.approver.into(),
            approved: record.approved,
            comment: record.comment.clone(),
            cycle: record.cycle as i32,
            slot: record.slot.map(|s| s as i32),
            decided_at: record.decided_at,
        })
        .collect()
}

fn row_to_claim(row: ClaimRow, approvals: Vec<ApprovalRow>) -> Result<ExpenseClaim, DatabaseError> {
    let currency = parse_currency(&row.currency)?;
    let status: ClaimStatus = row.status.parse().map_err(DatabaseError::serialization)?;

    let receipt_hints = row
        .receipt_hints
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| DatabaseError::serialization(e.to_string()))?;

    let conversion = match (
        row.reporting_amount,
        row.reporting_currency.as_deref(),
        row.conversion_status,
        row.converted_at,
    ) {
        (Some(amount), Some(code), Some(status), Some(converted_at)) => Some(ConversionOutcome {
            reporting_amount: Money::new(amount, parse_currency(code)?),
            status: serde_json::from_value(status)
                .map_err(|e| DatabaseError::serialization(e.to_string()))?,
            converted_at,
        }),
        _ => None,
    };

    let approvals = approvals
        .into_iter()
        .map(|a| ApprovalRecord {
            approver: UserId::from(a.approver_id),
            approved: a.approved,
            comment: a.comment,
            cycle: a.cycle.max(0) as u32,
            slot: a.slot.map(|s| s.max(0) as usize),
            decided_at: a.decided_at,
        })
        .collect();

    Ok(ExpenseClaim {
        id: ClaimId::from(row.claim_id),
        company_id: CompanyId::from(row.company_id),
        submitted_by: UserId::from(row.submitted_by),
        amount: Money::new(row.amount, currency),
        category: row.category,
        description: row.description,
        expense_date: row.expense_date,
        receipts: row.receipts,
        receipt_hints,
        conversion,
        status,
        approvers: row.approvers.into_iter().map(UserId::from).collect(),
        approvals,
        current_approver_index: row.current_approver_index.max(0) as usize,
        approval_sequence: row.approval_sequence,
        min_approval_percentage: u8::try_from(row.min_approval_percentage)
            .map_err(|_| DatabaseError::serialization("min_approval_percentage out of range"))?,
        is_manager_approver: row.is_manager_approver,
        rule_id: row.rule_id.map(RuleId::from),
        submission_cycle: row.submission_cycle.max(0) as u32,
        submitted_at: row.submitted_at,
        version: u64::try_from(row.version)
            .map_err(|_| DatabaseError::serialization("negative claim version"))?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub(crate) fn parse_currency(code: &str) -> Result<Currency, DatabaseError> {
    code.parse()
        .map_err(|e: core_kernel::MoneyError| DatabaseError::serialization(e.to_string()))
}

fn to_i32(value: usize, column: &str) -> Result<i32, DatabaseError> {
    i32::try_from(value).map_err(|_| DatabaseError::serialization(format!("{} out of range", column)))
}
