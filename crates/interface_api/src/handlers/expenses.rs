//! Expense claim handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ClaimId;
use domain_expense::{ClaimFilter, Principal};

use crate::dto::expenses::*;
use crate::{error::ApiError, AppState};

/// Creates a draft claim
pub async fn create_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    request.validate()?;
    let claim = state.workflow.create_draft(&principal, request.into()).await?;
    Ok((StatusCode::CREATED, Json(claim.into())))
}

/// Lists claims visible to the caller
pub async fn list_expenses(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<ClaimFilter>,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    let claims = state.workflow.list(&principal, &filter).await?;
    Ok(Json(claims.into_iter().map(ExpenseResponse::from).collect()))
}

pub async fn get_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let claim = state.workflow.get(ClaimId::from(id), &principal).await?;
    Ok(Json(claim.into()))
}

/// Edits a draft or rejected claim
pub async fn update_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateExpenseRequest>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    request.validate()?;
    let claim = state
        .workflow
        .update_draft(ClaimId::from(id), &principal, request.into())
        .await?;
    Ok(Json(claim.into()))
}

pub async fn submit_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let claim = state.workflow.submit(ClaimId::from(id), &principal).await?;
    Ok(Json(claim.into()))
}

/// Records an approval; the body is optional
pub async fn approve_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;
    let claim = state
        .workflow
        .approve(ClaimId::from(id), &principal, request.comment)
        .await?;
    Ok(Json(claim.into()))
}

pub async fn reject_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;
    let claim = state
        .workflow
        .reject(ClaimId::from(id), &principal, request.comment)
        .await?;
    Ok(Json(claim.into()))
}

pub async fn cancel_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let claim = state.workflow.cancel(ClaimId::from(id), &principal).await?;
    Ok(Json(claim.into()))
}
