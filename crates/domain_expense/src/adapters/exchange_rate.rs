//! HTTP exchange-rate adapter
//!
//! Implements [`CurrencyConverter`] against an exchangerate-api style
//! endpoint: `GET {base_url}/{FROM}` answers `{"rates": {"EUR": 0.92, ...}}`.
//!
//! Rates are cached per source currency in a [`RateCache`] owned by the
//! adapter, with an explicit TTL and an injectable clock. A circuit breaker
//! stops calling the endpoint after repeated failures and lets a probe
//! through once the reset timeout has passed.
//!
//! # Error Handling
//!
//! - missing target currency in the response -> `PortError::NotFound`
//! - 401/403 -> `PortError::Unauthorized`
//! - 429 -> `PortError::RateLimited`
//! - 5xx or open circuit -> `PortError::ServiceUnavailable`
//! - timeouts -> `PortError::Timeout`

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use core_kernel::{
    AdapterHealth, CircuitBreakerConfig, Clock, Currency, DomainPort, ExchangeRate,
    HealthCheckResult, HealthCheckable, PortError, SystemClock,
};
use crate::ports::CurrencyConverter;

/// Configuration for the exchange-rate adapter
#[derive(Debug, Clone)]
pub struct ExchangeRateConfig {
    /// Base URL; the source currency code is appended as the last segment
    pub base_url: String,
    pub timeout_secs: u64,
    /// How long a fetched rate table stays fresh
    pub cache_ttl_secs: u64,
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            timeout_secs: 5,
            cache_ttl_secs: 3600,
            circuit_breaker: Some(CircuitBreakerConfig::default()),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedRates {
    rates: HashMap<String, Decimal>,
    fetched_at: DateTime<Utc>,
}

/// Rate tables keyed by source currency, with expiry
pub struct RateCache {
    ttl: ChronoDuration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<Currency, CachedRates>>,
}

impl RateCache {
    pub fn new(ttl: ChronoDuration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The cached table for `from`, if still fresh
    pub async fn get(&self, from: Currency) -> Option<HashMap<String, Decimal>> {
        let entries = self.entries.read().await;
        let entry = entries.get(&from)?;
        if self.clock.now() - entry.fetched_at < self.ttl {
            Some(entry.rates.clone())
        } else {
            None
        }
    }

    pub async fn put(&self, from: Currency, rates: HashMap<String, Decimal>) {
        let entry = CachedRates {
            rates,
            fetched_at: self.clock.now(),
        };
        self.entries.write().await.insert(from, entry);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Circuit breaker state for fault tolerance
struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    failure_count: AtomicU64,
    success_count: AtomicU64,
    is_open: AtomicBool,
    opened_at: RwLock<Option<DateTime<Utc>>>,
}

impl CircuitBreaker {
    fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            failure_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            is_open: AtomicBool::new(false),
            opened_at: RwLock::new(None),
        }
    }

    async fn is_available(&self) -> bool {
        if !self.is_open.load(Ordering::Relaxed) {
            return true;
        }

        // half-open once the reset timeout has elapsed
        let reset = ChronoDuration::seconds(self.config.reset_timeout_secs as i64);
        match *self.opened_at.read().await {
            Some(opened) => self.clock.now() - opened > reset,
            None => true,
        }
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        let success = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
        if success >= self.config.success_threshold as u64 {
            self.is_open.store(false, Ordering::Relaxed);
            self.success_count.store(0, Ordering::Relaxed);
        }
    }

    async fn record_failure(&self) {
        self.success_count.store(0, Ordering::Relaxed);
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.config.failure_threshold as u64 {
            self.is_open.store(true, Ordering::Relaxed);
            *self.opened_at.write().await = Some(self.clock.now());
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Exchange-rate adapter backed by an HTTP rate service
pub struct HttpRateConverter {
    client: Client,
    config: ExchangeRateConfig,
    cache: RateCache,
    circuit_breaker: Option<CircuitBreaker>,
}

impl HttpRateConverter {
    pub fn new(config: ExchangeRateConfig) -> Result<Self, PortError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ExchangeRateConfig, clock: Arc<dyn Clock>) -> Result<Self, PortError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PortError::Internal {
                message: format!("failed to build HTTP client: {}", e),
                source: Some(Box::new(e)),
            })?;
        let cache = RateCache::new(ChronoDuration::seconds(config.cache_ttl_secs as i64), Arc::clone(&clock));
        let circuit_breaker = config
            .circuit_breaker
            .clone()
            .map(|cb| CircuitBreaker::new(cb, Arc::clone(&clock)));

        Ok(Self {
            client,
            config,
            cache,
            circuit_breaker,
        })
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    /// Checks if the circuit breaker is open (blocking requests)
    pub async fn is_circuit_open(&self) -> bool {
        match self.circuit_breaker {
            Some(ref cb) => !cb.is_available().await,
            None => false,
        }
    }

    async fn rates_for(&self, from: Currency) -> Result<HashMap<String, Decimal>, PortError> {
        if let Some(rates) = self.cache.get(from).await {
            debug!(%from, "Rate cache hit");
            return Ok(rates);
        }

        if let Some(ref cb) = self.circuit_breaker {
            if !cb.is_available().await {
                return Err(PortError::ServiceUnavailable {
                    service: "exchange-rate (circuit open)".to_string(),
                });
            }
        }

        let result = self.fetch(from).await;
        if let Some(ref cb) = self.circuit_breaker {
            match &result {
                Ok(_) => cb.record_success(),
                Err(e) if e.is_transient() => cb.record_failure().await,
                Err(_) => {}
            }
        }

        let rates = result?;
        self.cache.put(from, rates.clone()).await;
        Ok(rates)
    }

    async fn fetch(&self, from: Currency) -> Result<HashMap<String, Decimal>, PortError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), from.code());
        let response = self.client.get(&url).send().await.map_err(|e| map_transport_error(e, &url))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "Exchange-rate service returned an error");
            return Err(map_status(status, from));
        }

        let body: RatesResponse = response.json().await.map_err(|e| PortError::Transformation {
            message: format!("unreadable rate response: {}", e),
        })?;

        Ok(body
            .rates
            .into_iter()
            .filter_map(|(code, rate)| Decimal::from_f64(rate).map(|r| (code.to_ascii_uppercase(), r)))
            .collect())
    }
}

fn map_transport_error(error: reqwest::Error, url: &str) -> PortError {
    if error.is_timeout() {
        PortError::Timeout {
            operation: format!("GET {}", url),
            duration_ms: 0,
        }
    } else {
        PortError::Connection {
            message: format!("exchange-rate request failed: {}", error),
            source: Some(Box::new(error)),
        }
    }
}

fn map_status(status: StatusCode, from: Currency) -> PortError {
    match status {
        StatusCode::NOT_FOUND => PortError::not_found("ExchangeRateTable", from),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized {
            message: format!("exchange-rate service refused access ({})", status),
        },
        StatusCode::TOO_MANY_REQUESTS => PortError::RateLimited { retry_after_secs: 60 },
        s if s.is_server_error() => PortError::ServiceUnavailable {
            service: format!("exchange-rate ({})", s),
        },
        s => PortError::internal(format!("unexpected exchange-rate status {}", s)),
    }
}

impl DomainPort for HttpRateConverter {}

#[async_trait]
impl CurrencyConverter for HttpRateConverter {
    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn rate(&self, from: Currency, to: Currency) -> Result<ExchangeRate, PortError> {
        if from == to {
            return Ok(ExchangeRate::identity(from));
        }

        let rates = self.rates_for(from).await?;
        let rate = rates
            .get(to.code())
            .copied()
            .ok_or_else(|| PortError::not_found("ExchangeRate", format!("{}->{}", from, to)))?;

        ExchangeRate::new(from, to, rate).map_err(|e| PortError::Transformation {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl HealthCheckable for HttpRateConverter {
    async fn health_check(&self) -> HealthCheckResult {
        let open = self.is_circuit_open().await;
        HealthCheckResult {
            adapter_id: "exchange-rate-http".to_string(),
            status: if open { AdapterHealth::Degraded } else { AdapterHealth::Healthy },
            latency_ms: 0,
            message: open.then(|| "circuit open, conversions fall back to original amounts".to_string()),
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ManualClock;
    use rust_decimal_macros::dec;

    fn clock() -> ManualClock {
        ManualClock::new(Utc::now())
    }

    #[tokio::test]
    async fn test_rate_cache_expires_after_ttl() {
        let clock = clock();
        let cache = RateCache::new(ChronoDuration::hours(1), Arc::new(clock.clone()));
        cache.put(Currency::USD, HashMap::from([("EUR".to_string(), dec!(0.92))])).await;

        clock.advance(ChronoDuration::minutes(59));
        assert!(cache.get(Currency::USD).await.is_some());

        clock.advance(ChronoDuration::minutes(2));
        assert!(cache.get(Currency::USD).await.is_none());
    }

    #[tokio::test]
    async fn test_cached_rate_is_served_without_network() {
        let converter = HttpRateConverter::with_clock(
            ExchangeRateConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                ..Default::default()
            },
            Arc::new(clock()),
        )
        .unwrap();
        converter
            .cache()
            .put(Currency::GBP, HashMap::from([("USD".to_string(), dec!(1.27))]))
            .await;

        let rate = converter.rate(Currency::GBP, Currency::USD).await.unwrap();
        assert_eq!(rate.rate(), dec!(1.27));

        let missing = converter.rate(Currency::GBP, Currency::JPY).await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_identity_needs_no_lookup() {
        let converter = HttpRateConverter::new(ExchangeRateConfig::default()).unwrap();
        let rate = converter.rate(Currency::EUR, Currency::EUR).await.unwrap();
        assert_eq!(rate.rate(), Decimal::ONE);
    }

    #[tokio::test]
    async fn test_circuit_opens_and_half_opens() {
        let clock = clock();
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig {
                failure_threshold: 2,
                reset_timeout_secs: 30,
                success_threshold: 1,
            },
            Arc::new(clock.clone()),
        );

        breaker.record_failure().await;
        assert!(breaker.is_available().await);
        breaker.record_failure().await;
        assert!(!breaker.is_available().await);

        clock.advance(ChronoDuration::seconds(31));
        assert!(breaker.is_available().await);

        breaker.record_success();
        assert!(!breaker.is_open.load(Ordering::Relaxed));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_status(StatusCode::TOO_MANY_REQUESTS, Currency::USD), PortError::RateLimited { .. }));
        assert!(matches!(map_status(StatusCode::BAD_GATEWAY, Currency::USD), PortError::ServiceUnavailable { .. }));
        assert!(map_status(StatusCode::NOT_FOUND, Currency::USD).is_not_found());
    }
}
