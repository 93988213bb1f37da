//! Completion evaluator
//!
//! Pure function over a claim's approver snapshot and the decisions of the
//! current cycle. It never mutates the claim.

use serde::{Deserialize, Serialize};

use crate::claim::ExpenseClaim;

/// Evaluator verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub complete: bool,
    pub approved: bool,
}

impl Completion {
    pub const PENDING: Completion = Completion { complete: false, approved: false };
    pub const APPROVED: Completion = Completion { complete: true, approved: true };
    pub const REJECTED: Completion = Completion { complete: true, approved: false };
}

/// Approvals needed in parallel mode: ceil(n * pct / 100)
pub fn required_approvals(approver_count: usize, min_percentage: u8) -> usize {
    let pct = usize::from(min_percentage.min(100));
    (approver_count * pct + 99) / 100
}

/// Decides whether the current cycle is finished
pub fn evaluate(claim: &ExpenseClaim) -> Completion {
    if claim.approvers.is_empty() {
        return Completion::APPROVED;
    }

    let mut decided = 0usize;
    let mut approved = 0usize;
    for record in claim.current_cycle_approvals() {
        decided += 1;
        if !record.approved {
            return Completion::REJECTED;
        }
        approved += 1;
    }
    if decided == 0 {
        return Completion::PENDING;
    }

    let required = if claim.approval_sequence {
        claim.approvers.len()
    } else {
        required_approvals(claim.approvers.len(), claim.min_approval_percentage)
    };

    if approved >= required {
        Completion::APPROVED
    } else {
        Completion::PENDING
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_required_approvals() {
        assert_eq!(required_approvals(4, 60), 3);
        assert_eq!(required_approvals(3, 50), 2);
        assert_eq!(required_approvals(5, 100), 5);
        assert_eq!(required_approvals(5, 0), 0);
        assert_eq!(required_approvals(0, 100), 0);
    }

    proptest! {
        #[test]
        fn required_matches_ceiling(n in 0usize..200, pct in 0u8..=100) {
            let exact = (n as f64) * f64::from(pct) / 100.0;
            prop_assert_eq!(required_approvals(n, pct), exact.ceil() as usize);
        }

        #[test]
        fn required_never_exceeds_approvers(n in 0usize..200, pct in 0u8..=255) {
            prop_assert!(required_approvals(n, pct) <= n);
        }
    }
}
