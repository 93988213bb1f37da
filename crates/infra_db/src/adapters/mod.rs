//! Domain Adapters
//!
//! Implementations of the expense workflow's persistence and directory
//! ports on top of the PostgreSQL repositories.
//!
//! Each adapter:
//! - Implements one port trait from `domain_expense`
//! - Translates between domain models and database row types
//! - Reports database reachability through `HealthCheckable`
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClaimAdapter;
//! use domain_expense::ClaimRepository;
//!
//! let claims = PostgresClaimAdapter::new(pool);
//! let claim = claims.load(claim_id).await?;
//! ```

pub mod claims;
pub mod directory;
pub mod rules;

pub use claims::PostgresClaimAdapter;
pub use directory::PostgresDirectoryAdapter;
pub use rules::PostgresRuleAdapter;
