//! Custom Test Assertions
//!
//! Assertion helpers for workflow types with messages that show the claim
//! state instead of a bare `false`.

use rust_decimal::Decimal;

use core_kernel::{Money, UserId};
use domain_expense::{pending_approvers, ClaimStatus, ExpenseClaim, ExpenseError};

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

pub fn assert_status(claim: &ExpenseClaim, expected: ClaimStatus) {
    assert_eq!(
        claim.status, expected,
        "Claim {} is {} (approvers={:?}, decisions={})",
        claim.id,
        claim.status,
        claim.approvers,
        claim.approvals.len()
    );
}

/// Asserts exactly who can act on the claim right now, in order
pub fn assert_pending_on(claim: &ExpenseClaim, expected: &[UserId]) {
    let pending = pending_approvers(claim);
    assert_eq!(
        pending, expected,
        "Claim {} is pending on {:?}, expected {:?}",
        claim.id, pending, expected
    );
}

/// Asserts the reporting amount was carried over without a rate
pub fn assert_conversion_degraded(claim: &ExpenseClaim) {
    let conversion = claim
        .conversion
        .as_ref()
        .unwrap_or_else(|| panic!("Claim {} has no conversion outcome", claim.id));
    assert!(
        conversion.is_degraded(),
        "Expected degraded conversion, got {:?}",
        conversion.status
    );
}

pub fn assert_forbidden<T: std::fmt::Debug>(result: Result<T, ExpenseError>) {
    match result {
        Err(ExpenseError::Forbidden(_)) => {}
        other => panic!("Expected Forbidden, got {:?}", other),
    }
}

pub fn assert_invalid_transition<T: std::fmt::Debug>(result: Result<T, ExpenseError>) {
    match result {
        Err(ExpenseError::InvalidTransition(_)) => {}
        other => panic!("Expected InvalidTransition, got {:?}", other),
    }
}

pub fn assert_validation_error<T: std::fmt::Debug>(result: Result<T, ExpenseError>) {
    match result {
        Err(ExpenseError::Validation(_)) => {}
        other => panic!("Expected Validation, got {:?}", other),
    }
}
