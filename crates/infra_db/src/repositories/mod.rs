//! Repository implementations for the workflow's tables
//!
//! Repositories speak in database rows. Mapping to and from domain types
//! happens in the adapters.
//!
//! # Architecture
//!
//! Each repository follows these principles:
//! - Runtime-checked queries bound with `sqlx::query_as`
//! - Transaction support for multi-table writes
//! - Optimistic concurrency control on claim updates

pub mod claims;
pub mod directory;
pub mod rules;

pub use claims::{ApprovalRow, ClaimRow, ClaimSearch, ClaimsRepository};
pub use directory::{CompanyRow, DirectoryRepository, UserRow};
pub use rules::{RuleRow, RulesRepository};
