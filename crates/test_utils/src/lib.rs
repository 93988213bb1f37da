//! Test Utilities Crate
//!
//! Shared test infrastructure for the expense workflow crates.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built organizations, principals, and money values
//! - `builders`: Builders for claim and rule requests
//! - `database`: Postgres testcontainer management
//! - `assertions`: Assertion helpers for claims and workflow errors
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
