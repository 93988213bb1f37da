//! Country and currency catalog
//!
//! Lists countries with their primary currency for company setup. Entries
//! come from a restcountries style endpoint and are cached with a TTL; when
//! the endpoint cannot be reached a built-in list is served instead.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use core_kernel::{Clock, PortError, SystemClock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    /// ISO 4217 code; may be a currency the engine cannot convert
    pub currency: String,
    pub symbol: String,
}

impl Country {
    fn new(name: &str, currency: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            currency: currency.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// Served when the catalog endpoint fails
pub fn fallback_countries() -> Vec<Country> {
    vec![
        Country::new("United States", "USD", "$"),
        Country::new("India", "INR", "₹"),
        Country::new("United Kingdom", "GBP", "£"),
        Country::new("Canada", "CAD", "C$"),
        Country::new("Australia", "AUD", "A$"),
        Country::new("Germany", "EUR", "€"),
        Country::new("France", "EUR", "€"),
        Country::new("Japan", "JPY", "¥"),
        Country::new("China", "CNY", "¥"),
        Country::new("Brazil", "BRL", "R$"),
        Country::new("Mexico", "MXN", "$"),
        Country::new("South Korea", "KRW", "₩"),
        Country::new("Singapore", "SGD", "S$"),
        Country::new("Switzerland", "CHF", "CHF"),
        Country::new("Netherlands", "EUR", "€"),
    ]
}

#[derive(Debug, Clone)]
pub struct CountryCatalogConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for CountryCatalogConfig {
    fn default() -> Self {
        Self {
            url: "https://restcountries.com/v3.1/all?fields=name,currencies".to_string(),
            timeout_secs: 5,
            cache_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCountry {
    name: RawName,
    #[serde(default)]
    currencies: BTreeMap<String, RawCurrency>,
}

#[derive(Debug, Deserialize)]
struct RawName {
    common: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCurrency {
    symbol: Option<String>,
}

pub struct CountryCatalog {
    client: Client,
    config: CountryCatalogConfig,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<(Vec<Country>, DateTime<Utc>)>>,
}

impl CountryCatalog {
    pub fn new(config: CountryCatalogConfig) -> Result<Self, PortError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CountryCatalogConfig, clock: Arc<dyn Clock>) -> Result<Self, PortError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PortError::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            clock,
            cache: RwLock::new(None),
        })
    }

    /// All known countries, sorted by name; never fails
    pub async fn countries(&self) -> Vec<Country> {
        let ttl = ChronoDuration::seconds(self.config.cache_ttl_secs as i64);
        if let Some((countries, fetched_at)) = self.cache.read().await.as_ref() {
            if self.clock.now() - *fetched_at < ttl {
                return countries.clone();
            }
        }

        let countries = match self.fetch().await {
            Ok(countries) if !countries.is_empty() => {
                info!(count = countries.len(), "Fetched country catalog");
                countries
            }
            Ok(_) => {
                warn!("Country catalog returned no entries, using built-in list");
                fallback_countries()
            }
            Err(e) => {
                warn!(error = %e, "Country catalog unavailable, using built-in list");
                fallback_countries()
            }
        };

        *self.cache.write().await = Some((countries.clone(), self.clock.now()));
        countries
    }

    async fn fetch(&self) -> Result<Vec<Country>, PortError> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| PortError::connection(format!("country catalog request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PortError::ServiceUnavailable {
                service: format!("country catalog ({})", response.status()),
            });
        }

        let raw: Vec<RawCountry> = response.json().await.map_err(|e| PortError::Transformation {
            message: format!("unreadable country catalog: {}", e),
        })?;
        Ok(normalize(raw))
    }
}

fn normalize(raw: Vec<RawCountry>) -> Vec<Country> {
    let mut countries: Vec<Country> = raw
        .into_iter()
        .filter_map(|c| {
            let name = c.name.common.filter(|n| !n.trim().is_empty())?;
            let (currency, symbol) = match c.currencies.into_iter().next() {
                Some((code, details)) => (code, details.symbol.unwrap_or_else(|| "$".to_string())),
                None => ("USD".to_string(), "$".to_string()),
            };
            Some(Country { name, currency, symbol })
        })
        .collect();
    countries.sort_by(|a, b| a.name.cmp(&b.name));
    countries
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ManualClock;

    #[test]
    fn test_fallback_has_fifteen_countries() {
        let countries = fallback_countries();
        assert_eq!(countries.len(), 15);
        assert!(countries.iter().any(|c| c.name == "India" && c.currency == "INR"));
    }

    #[test]
    fn test_normalize_skips_nameless_entries() {
        let raw: Vec<RawCountry> = serde_json::from_str(
            r#"[
                {"name": {"common": "Norway"}, "currencies": {"NOK": {"name": "Krone", "symbol": "kr"}}},
                {"name": {"common": ""}, "currencies": {}},
                {"name": {"common": "Antarctica"}}
            ]"#,
        )
        .unwrap();

        let countries = normalize(raw);
        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0], Country::new("Antarctica", "USD", "$"));
        assert_eq!(countries[1], Country::new("Norway", "NOK", "kr"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_serves_fallback() {
        let clock = ManualClock::new(Utc::now());
        let catalog = CountryCatalog::with_clock(
            CountryCatalogConfig {
                url: "http://127.0.0.1:9/all".to_string(),
                timeout_secs: 2,
                cache_ttl_secs: 60,
            },
            Arc::new(clock),
        )
        .unwrap();

        let countries = catalog.countries().await;
        assert_eq!(countries, fallback_countries());
    }
}
