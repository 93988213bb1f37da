//! Approval rule administration handlers
//!
//! Admin-only; the domain layer enforces the role check.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::RuleId;
use domain_expense::Principal;

use crate::dto::rules::*;
use crate::{error::ApiError, AppState};

pub async fn list_rules(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<RuleResponse>>, ApiError> {
    let rules = state.rules.list_rules(&principal).await?;
    Ok(Json(rules.into_iter().map(RuleResponse::from).collect()))
}

pub async fn create_rule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<RuleResponse>), ApiError> {
    request.validate()?;
    let rule = state.rules.create_rule(&principal, request.into()).await?;
    Ok((StatusCode::CREATED, Json(rule.into())))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRuleRequest>,
) -> Result<Json<RuleResponse>, ApiError> {
    request.validate()?;
    let rule = state
        .rules
        .update_rule(&principal, RuleId::from(id), request.into())
        .await?;
    Ok(Json(rule.into()))
}

/// Soft delete: the rule stays stored with `is_active = false`
pub async fn delete_rule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<RuleResponse>, ApiError> {
    let rule = state.rules.deactivate_rule(&principal, RuleId::from(id)).await?;
    Ok(Json(rule.into()))
}
