//! Core Kernel - Foundational types for the expense workflow engine
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money and currency types with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Port error and health-check abstractions for adapters
//! - An injectable clock

pub mod money;
pub mod identifiers;
pub mod ports;
pub mod clock;

pub use money::{Money, Currency, ExchangeRate, MoneyError};
pub use identifiers::{ClaimId, RuleId, UserId, CompanyId, EventId};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    CircuitBreakerConfig,
};
pub use clock::{Clock, SystemClock, ManualClock};
