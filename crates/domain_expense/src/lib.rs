//! Expense Domain - approval routing and the claim lifecycle
//!
//! This crate contains:
//! - Expense claims and their status machine
//! - Approval rules and rule resolution
//! - Approver sequencing and completion evaluation
//! - Currency normalization with graceful degradation
//! - The lifecycle controller that composes all of the above
//! - Port traits, in-memory implementations and external adapters

pub mod access;
pub mod adapters;
pub mod admin;
pub mod claim;
pub mod conversion;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod memory;
pub mod ports;
pub mod principal;
pub mod resolver;
pub mod rule;
pub mod sequencer;
pub mod workflow;

pub use admin::RuleAdministration;
pub use claim::{ApprovalRecord, ClaimStatus, ClaimUpdate, ExpenseClaim, NewClaim, ReceiptHints};
pub use conversion::{ConversionAdapter, ConversionOutcome, ConversionStatus};
pub use error::ExpenseError;
pub use evaluator::{evaluate, required_approvals, Completion};
pub use events::{WorkflowEvent, WorkflowEventKind};
pub use ports::{
    ClaimQuery, ClaimRepository, CurrencyConverter, NotificationSink, OrganizationDirectory,
    RuleRepository,
};
pub use principal::{Company, Principal, Role};
pub use resolver::{select_rule, ResolvedPolicy, RuleResolver};
pub use rule::{ApprovalPolicy, ApprovalRule, NewRule, RuleUpdate};
pub use sequencer::{build_approvers, pending_approvers};
pub use workflow::{ClaimFilter, ExpenseWorkflow, WorkflowPorts};
