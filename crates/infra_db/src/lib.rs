//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the expense workflow using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: repositories speak in rows,
//! adapters implement the domain ports on top of them and hide the
//! database from the workflow.
//!
//! Claim saves are optimistic. Every update carries the version the writer
//! read, and a mismatch surfaces as `PortError::VersionConflict`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClaimAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/expenses")).await?;
//! run_migrations(&pool).await?;
//! let claims = PostgresClaimAdapter::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresClaimAdapter, PostgresDirectoryAdapter, PostgresRuleAdapter};
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
