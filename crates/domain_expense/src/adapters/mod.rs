//! Adapters for external collaborators
//!
//! - [`exchange_rate`]: HTTP rate service behind [`CurrencyConverter`](crate::ports::CurrencyConverter)
//! - [`countries`]: country/currency catalog for company setup
//! - [`notification`]: log-backed [`NotificationSink`](crate::ports::NotificationSink)

pub mod countries;
pub mod exchange_rate;
pub mod notification;

pub use countries::{fallback_countries, Country, CountryCatalog, CountryCatalogConfig};
pub use exchange_rate::{ExchangeRateConfig, HttpRateConverter, RateCache};
pub use notification::LogNotificationSink;
