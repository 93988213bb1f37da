//! Conversion adapter
//!
//! Normalizes a claim amount into the company's reporting currency. A rate
//! lookup failure never fails submission: the original figure is carried
//! over under the reporting currency label and the outcome is flagged as
//! degraded so readers know the number is an approximation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use core_kernel::{Currency, Money};
use crate::ports::CurrencyConverter;

/// How the reporting amount was obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionStatus {
    /// Source and reporting currency are identical
    SameCurrency,
    /// Converted at the recorded rate
    Converted { rate: Decimal },
    /// No rate available; the original amount was relabeled
    Degraded { reason: String },
}

/// Result of normalizing a claim amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub reporting_amount: Money,
    pub status: ConversionStatus,
    pub converted_at: DateTime<Utc>,
}

impl ConversionOutcome {
    pub fn reporting_currency(&self) -> Currency {
        self.reporting_amount.currency()
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ConversionStatus::Degraded { .. })
    }
}

/// Wraps a [`CurrencyConverter`] with the fallback policy
#[derive(Clone)]
pub struct ConversionAdapter {
    converter: Arc<dyn CurrencyConverter>,
}

impl ConversionAdapter {
    pub fn new(converter: Arc<dyn CurrencyConverter>) -> Self {
        Self { converter }
    }

    /// Converts `amount` into `target`; never fails
    pub async fn normalize(&self, amount: Money, target: Currency, now: DateTime<Utc>) -> ConversionOutcome {
        if amount.currency() == target {
            return ConversionOutcome {
                reporting_amount: amount,
                status: ConversionStatus::SameCurrency,
                converted_at: now,
            };
        }

        let converted = match self.converter.rate(amount.currency(), target).await {
            Ok(rate) => rate
                .convert(&amount)
                .map(|money| (money, rate.rate()))
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match converted {
            Ok((reporting_amount, rate)) => {
                debug!(from = %amount.currency(), to = %target, %rate, "Converted claim amount");
                ConversionOutcome {
                    reporting_amount,
                    status: ConversionStatus::Converted { rate },
                    converted_at: now,
                }
            }
            Err(reason) => {
                warn!(
                    from = %amount.currency(),
                    to = %target,
                    reason = %reason,
                    "Currency conversion unavailable, keeping original amount"
                );
                ConversionOutcome {
                    reporting_amount: amount.relabel(target),
                    status: ConversionStatus::Degraded { reason },
                    converted_at: now,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::StaticRateConverter;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_same_currency_is_noop() {
        let adapter = ConversionAdapter::new(Arc::new(StaticRateConverter::new()));
        let amount = Money::new(dec!(12.345), Currency::USD);

        let outcome = adapter.normalize(amount, Currency::USD, Utc::now()).await;

        assert_eq!(outcome.status, ConversionStatus::SameCurrency);
        assert_eq!(outcome.reporting_amount, amount);
    }

    #[tokio::test]
    async fn test_converts_and_rounds() {
        let converter = StaticRateConverter::new().with_rate(Currency::EUR, Currency::USD, dec!(1.0837));
        let adapter = ConversionAdapter::new(Arc::new(converter));

        let outcome = adapter
            .normalize(Money::new(dec!(100), Currency::EUR), Currency::USD, Utc::now())
            .await;

        assert_eq!(outcome.reporting_amount, Money::new(dec!(108.37), Currency::USD));
        assert_eq!(outcome.status, ConversionStatus::Converted { rate: dec!(1.0837) });
    }

    #[tokio::test]
    async fn test_missing_rate_degrades_to_original_amount() {
        let adapter = ConversionAdapter::new(Arc::new(StaticRateConverter::new()));

        let outcome = adapter
            .normalize(Money::new(dec!(250), Currency::INR), Currency::USD, Utc::now())
            .await;

        assert!(outcome.is_degraded());
        assert_eq!(outcome.reporting_amount.amount(), dec!(250));
        assert_eq!(outcome.reporting_currency(), Currency::USD);
    }
}
