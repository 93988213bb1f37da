//! Property-Based Test Generators
//!
//! proptest strategies for workflow inputs that respect domain invariants.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, Money, UserId};

/// Strategy for generating supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    proptest::sample::select(Currency::ALL.to_vec())
}

/// Positive amounts with two decimal places, up to ten million
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|minor| Decimal::new(minor, 2))
}

pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::new(amount, currency))
}

/// Rule thresholds, including zero
pub fn threshold_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|minor| Decimal::new(minor, 2))
}

/// Exchange rates between 0.0001 and 1000
pub fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

pub fn percentage_strategy() -> impl Strategy<Value = u8> {
    0u8..=100u8
}

/// Distinct approver ids
pub fn approvers_strategy(max: usize) -> impl Strategy<Value = Vec<UserId>> {
    (0..=max).prop_map(|n| (0..n).map(|_| UserId::new()).collect())
}

/// A sequence of approve (`true`) / reject (`false`) decisions
pub fn decisions_strategy(max: usize) -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(any::<bool>(), 0..=max)
}

pub fn timestamp_2024_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..365i64, 0i64..86_400i64).prop_map(|(days, secs)| {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(days) + Duration::seconds(secs)
    })
}
