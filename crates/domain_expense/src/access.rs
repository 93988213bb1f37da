//! Authorization checks over claims

use crate::claim::{ClaimStatus, ExpenseClaim};
use crate::error::ExpenseError;
use crate::principal::Principal;

/// Owner, listed approver, or an Admin of the claim's company
pub fn can_view(principal: &Principal, claim: &ExpenseClaim) -> bool {
    if !principal.same_company(claim.company_id) {
        return false;
    }
    claim.submitted_by == principal.id || claim.is_approver(principal.id) || principal.is_admin()
}

pub fn ensure_view(principal: &Principal, claim: &ExpenseClaim) -> Result<(), ExpenseError> {
    if can_view(principal, claim) {
        Ok(())
    } else {
        Err(ExpenseError::forbidden(format!("{} may not view claim {}", principal.id, claim.id)))
    }
}

pub fn ensure_owner(principal: &Principal, claim: &ExpenseClaim) -> Result<(), ExpenseError> {
    if principal.same_company(claim.company_id) && claim.submitted_by == principal.id {
        Ok(())
    } else {
        Err(ExpenseError::forbidden(format!("only the claimant may modify claim {}", claim.id)))
    }
}

pub fn ensure_admin(principal: &Principal) -> Result<(), ExpenseError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ExpenseError::forbidden("admin role required"))
    }
}

/// Checks that `principal` may decide on the claim right now
///
/// Returns the sequential slot the decision fills (`None` in parallel mode).
/// State problems and repeated decisions are `InvalidTransition`; lack of
/// authority is `Forbidden`.
pub fn decision_slot(principal: &Principal, claim: &ExpenseClaim) -> Result<Option<usize>, ExpenseError> {
    if !principal.same_company(claim.company_id) {
        return Err(ExpenseError::forbidden(format!("claim {} belongs to another company", claim.id)));
    }
    if claim.status != ClaimStatus::WaitingApproval {
        return Err(ExpenseError::invalid_transition(format!(
            "claim {} is {} and not awaiting approval",
            claim.id, claim.status
        )));
    }

    if claim.approval_sequence {
        let slot = claim.current_approver_index;
        if claim.current_approver() == Some(principal.id) || principal.is_admin() {
            return Ok(Some(slot));
        }
        if claim.has_acted(principal.id) {
            return Err(already_acted(principal, claim));
        }
        return Err(ExpenseError::forbidden(format!(
            "{} is not the current approver of claim {}",
            principal.id, claim.id
        )));
    }

    if !claim.is_approver(principal.id) && !principal.is_admin() {
        return Err(ExpenseError::forbidden(format!(
            "{} is not an approver of claim {}",
            principal.id, claim.id
        )));
    }
    if claim.has_acted(principal.id) {
        return Err(already_acted(principal, claim));
    }
    Ok(None)
}

fn already_acted(principal: &Principal, claim: &ExpenseClaim) -> ExpenseError {
    ExpenseError::invalid_transition(format!(
        "{} already acted on claim {} in cycle {}",
        principal.id, claim.id, claim.submission_cycle
    ))
}
