//! Resilience patterns for the WB client: bounded retries with backoff and
//! a distributed rate limiter backed by the shared cache.

use crate::cache::SharedCache;
use crate::config::RetryConfig;
use crate::errors::{WbError, WbErrorKind, WbResult};
use crate::observability::{Metrics, TracingHooks};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Groups of upstream endpoints that share one rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointFamily {
    /// Seller info.
    Common,
    /// Account balance.
    Finance,
    /// nm-report detail and history.
    NmReport,
    /// Search query reports.
    SearchReport,
    /// Warehouse remains report jobs.
    WarehouseRemains,
    /// Paid acceptance report jobs.
    PaidAcceptance,
    /// Paid storage report jobs.
    PaidStorage,
    /// Single-call analytics reports (excise, retention, regions, brands,
    /// banned products, returns).
    AnalyticsReports,
    /// Statistics API (sales).
    Statistics,
}

impl EndpointFamily {
    /// Identifier used in ticket keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Finance => "finance",
            Self::NmReport => "nm-report",
            Self::SearchReport => "search-report",
            Self::WarehouseRemains => "warehouse-remains",
            Self::PaidAcceptance => "paid-acceptance",
            Self::PaidStorage => "paid-storage",
            Self::AnalyticsReports => "analytics-reports",
            Self::Statistics => "statistics",
        }
    }

    /// Spacing WB enforces for one token on this family.
    pub fn default_interval(&self) -> Duration {
        match self {
            Self::Common | Self::Finance => Duration::from_secs(1),
            Self::NmReport | Self::SearchReport => Duration::from_secs(20),
            Self::WarehouseRemains | Self::PaidAcceptance | Self::PaidStorage => {
                Duration::from_secs(5)
            }
            Self::AnalyticsReports => Duration::from_secs(10),
            Self::Statistics => Duration::from_secs(60),
        }
    }
}

impl fmt::Display for EndpointFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry policy with exponential backoff and `Retry-After` support.
pub struct RetryPolicy {
    config: RetryConfig,
    metrics: Arc<Metrics>,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(config: RetryConfig, metrics: Arc<Metrics>) -> Self {
        Self { config, metrics }
    }

    /// Retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Executes an operation, retrying transient failures.
    ///
    /// `operation` receives the zero-based attempt number.
    pub async fn execute<F, Fut, T>(&self, label: &str, mut operation: F) -> WbResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = WbResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    let delay = self.delay_for(&e, attempt);
                    TracingHooks::on_retry(label, attempt + 1, delay, &e);
                    self.metrics.record_retry();

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Calculates the pause before the retry that follows `attempt`.
    pub fn delay_for(&self, error: &WbError, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        if error.kind() != WbErrorKind::RateLimited {
            return backoff;
        }
        match error.retry_after() {
            Some(delay) if !delay.is_zero() => delay.min(self.config.max_retry_after),
            _ => backoff.min(self.config.max_rate_limit_backoff),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .base_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Rate limiter keeping its "next allowed at" tickets in the shared cache.
///
/// Every process talking to the same cache observes the same tickets, so
/// the spacing holds across instances without any local lock. Tickets
/// expire shortly after their interval, so an abandoned one never blocks a
/// key for long.
pub struct RateLimiter {
    cache: Arc<dyn SharedCache>,
    jitter: Duration,
    metrics: Arc<Metrics>,
}

impl RateLimiter {
    /// Creates a rate limiter over `cache`.
    pub fn new(cache: Arc<dyn SharedCache>, jitter: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            cache,
            jitter,
            metrics,
        }
    }

    /// Ticket key for a token fingerprint and endpoint family.
    pub fn ticket_key(token_fingerprint: &str, family: EndpointFamily) -> String {
        format!("wb:rl:{}:{}", token_fingerprint, family.as_str())
    }

    /// Waits until `key` may be used again, then books the next slot.
    ///
    /// Store failures are logged and the call proceeds unthrottled.
    pub async fn throttle(&self, key: &str, interval: Duration) {
        match self.cache.get(key).await {
            Ok(Some(raw)) => {
                if let Ok(next_allowed_ms) = raw.parse::<i64>() {
                    let wait_ms = next_allowed_ms - Utc::now().timestamp_millis();
                    if wait_ms > 0 {
                        let wait = Duration::from_millis(wait_ms as u64);
                        TracingHooks::on_throttle(key, wait);
                        self.metrics.record_rate_limited();
                        sleep(wait).await;
                    }
                }
            }
            Ok(None) => {}
            Err(e) => TracingHooks::on_cache_error("rate limit ticket read", &e),
        }

        let spacing = interval + self.random_jitter();
        let next_allowed_ms = Utc::now().timestamp_millis() + spacing.as_millis() as i64;
        let expiry = spacing + Duration::from_secs(1);

        if let Err(e) = self
            .cache
            .setex(key, expiry, &next_allowed_ms.to_string())
            .await
        {
            TracingHooks::on_cache_error("rate limit ticket write", &e);
        }
    }

    fn random_jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(fastrand::u64(0..=max_ms))
        }
    }
}
