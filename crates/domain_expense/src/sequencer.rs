//! Approval sequencer
//!
//! Turns a resolved policy into the concrete approver snapshot stored on a
//! claim, and answers who is due to act next.

use core_kernel::UserId;
use crate::claim::ExpenseClaim;
use crate::rule::ApprovalPolicy;

/// Builds the approver list for a submission
///
/// The template is copied by value so later rule edits cannot reach the
/// claim. When the policy asks for manager approval and the claimant has a
/// manager, the manager goes first, even if the template already lists them;
/// duplicates are kept and count as separate slots.
pub fn build_approvers(policy: &ApprovalPolicy, manager: Option<UserId>) -> Vec<UserId> {
    let mut approvers = policy.approvers.to_vec();
    if policy.is_manager_approver {
        if let Some(manager) = manager {
            approvers.insert(0, manager);
        }
    }
    approvers
}

/// Principals who must be told that the claim awaits them
///
/// Sequential: the approver at the cursor. Parallel: every listed approver
/// who has not yet acted in this cycle.
pub fn pending_approvers(claim: &ExpenseClaim) -> Vec<UserId> {
    if claim.approval_sequence {
        return claim.current_approver().into_iter().collect();
    }

    let mut pending = Vec::new();
    for approver in &claim.approvers {
        if !claim.has_acted(*approver) && !pending.contains(approver) {
            pending.push(*approver);
        }
    }
    pending
}
