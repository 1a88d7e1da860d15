//! Configuration types for the WB client.

use crate::errors::ConfigError;
use crate::resilience::EndpointFamily;
use std::collections::HashMap;
use std::time::Duration;

/// Default base URL of the common API (seller info).
pub const DEFAULT_COMMON_API_URL: &str = "https://common-api.wildberries.ru";

/// Default base URL of the finance API (balance).
pub const DEFAULT_FINANCE_API_URL: &str = "https://finance-api.wildberries.ru";

/// Default base URL of the seller analytics API (nm-report, reports, jobs).
pub const DEFAULT_ANALYTICS_API_URL: &str = "https://seller-analytics-api.wildberries.ru";

/// Default base URL of the statistics API (sales).
pub const DEFAULT_STATISTICS_API_URL: &str = "https://statistics-api.wildberries.ru";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = "integrations-wb/0.1.0";

/// Default lifetime of a cached balance.
pub const DEFAULT_BALANCE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Retry configuration for transient failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base of the exponential backoff (`base * 2^attempt`).
    pub base_backoff: Duration,
    /// Ceiling of the computed backoff after a 429 without `Retry-After`.
    pub max_rate_limit_backoff: Duration,
    /// Ceiling applied to an upstream `Retry-After`.
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(400),
            max_rate_limit_backoff: Duration::from_millis(2500),
            max_retry_after: Duration::from_secs(30),
        }
    }
}

/// Distributed rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Enable throttling through the shared cache.
    pub enabled: bool,
    /// Upper bound of the random delay added to every ticket.
    pub jitter: Duration,
    /// Per-family interval overrides.
    pub intervals: HashMap<EndpointFamily, Duration>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jitter: Duration::from_millis(300),
            intervals: HashMap::new(),
        }
    }
}

impl RateLimitConfig {
    /// Minimum spacing between two calls of one token to `family`.
    pub fn interval_for(&self, family: EndpointFamily) -> Duration {
        self.intervals
            .get(&family)
            .copied()
            .unwrap_or_else(|| family.default_interval())
    }
}

/// Report job polling configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Pause between two status checks.
    pub interval: Duration,
    /// Wall-clock ceiling for a job from creation to completion.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(180),
        }
    }
}

/// WB client configuration.
#[derive(Debug, Clone)]
pub struct WbConfig {
    /// Common API base URL.
    pub common_api_url: String,
    /// Finance API base URL.
    pub finance_api_url: String,
    /// Seller analytics API base URL.
    pub analytics_api_url: String,
    /// Statistics API base URL.
    pub statistics_api_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Retry configuration.
    pub retry: RetryConfig,
    /// Rate limit configuration.
    pub rate_limit: RateLimitConfig,
    /// Report job polling configuration.
    pub poll: PollConfig,
    /// Lifetime of a cached balance.
    pub balance_cache_ttl: Duration,
}

impl Default for WbConfig {
    fn default() -> Self {
        Self {
            common_api_url: DEFAULT_COMMON_API_URL.to_string(),
            finance_api_url: DEFAULT_FINANCE_API_URL.to_string(),
            analytics_api_url: DEFAULT_ANALYTICS_API_URL.to_string(),
            statistics_api_url: DEFAULT_STATISTICS_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            poll: PollConfig::default(),
            balance_cache_ttl: DEFAULT_BALANCE_CACHE_TTL,
        }
    }
}

impl WbConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> WbConfigBuilder {
        WbConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WB_COMMON_API_URL`, `WB_FINANCE_API_URL`, `WB_ANALYTICS_API_URL`,
    ///   `WB_STATISTICS_API_URL`: base URL overrides
    /// - `WB_TIMEOUT_SECS`: request timeout
    /// - `WB_MAX_RETRIES`: retries after the first attempt
    /// - `WB_BALANCE_CACHE_TTL`: balance cache lifetime in seconds
    /// - `WB_POLL_INTERVAL_SECS`, `WB_POLL_TIMEOUT_SECS`: report job polling
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = WbConfigBuilder::new();

        if let Ok(url) = std::env::var("WB_COMMON_API_URL") {
            builder = builder.common_api_url(url);
        }
        if let Ok(url) = std::env::var("WB_FINANCE_API_URL") {
            builder = builder.finance_api_url(url);
        }
        if let Ok(url) = std::env::var("WB_ANALYTICS_API_URL") {
            builder = builder.analytics_api_url(url);
        }
        if let Ok(url) = std::env::var("WB_STATISTICS_API_URL") {
            builder = builder.statistics_api_url(url);
        }

        if let Some(secs) = env_u64("WB_TIMEOUT_SECS") {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = env_u64("WB_MAX_RETRIES") {
            builder = builder.retry(RetryConfig {
                max_retries: retries as u32,
                ..Default::default()
            });
        }
        if let Some(secs) = env_u64("WB_BALANCE_CACHE_TTL") {
            builder = builder.balance_cache_ttl(Duration::from_secs(secs));
        }

        let mut poll = PollConfig::default();
        if let Some(secs) = env_u64("WB_POLL_INTERVAL_SECS") {
            poll.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("WB_POLL_TIMEOUT_SECS") {
            poll.timeout = Duration::from_secs(secs);
        }

        builder.poll(poll).build()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let urls = [
            ("common_api_url", &self.common_api_url),
            ("finance_api_url", &self.finance_api_url),
            ("analytics_api_url", &self.analytics_api_url),
            ("statistics_api_url", &self.statistics_api_url),
        ];
        for (name, value) in urls {
            if url::Url::parse(value).is_err()
                || !(value.starts_with("http://") || value.starts_with("https://"))
            {
                return Err(ConfigError::InvalidBaseUrl {
                    name,
                    value: value.clone(),
                });
            }
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be positive".into()));
        }
        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid("User-Agent cannot be empty".into()));
        }
        if self.poll.interval > self.poll.timeout {
            return Err(ConfigError::Invalid(
                "poll interval cannot exceed poll timeout".into(),
            ));
        }

        Ok(())
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for WbConfig.
#[derive(Debug, Default)]
pub struct WbConfigBuilder {
    common_api_url: Option<String>,
    finance_api_url: Option<String>,
    analytics_api_url: Option<String>,
    statistics_api_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    retry: Option<RetryConfig>,
    rate_limit: Option<RateLimitConfig>,
    poll: Option<PollConfig>,
    balance_cache_ttl: Option<Duration>,
}

impl WbConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Points every API family at one host. Handy for proxies and mock servers.
    pub fn base_url(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.common_api_url(url.clone())
            .finance_api_url(url.clone())
            .analytics_api_url(url.clone())
            .statistics_api_url(url)
    }

    /// Sets the common API base URL.
    pub fn common_api_url(mut self, url: impl Into<String>) -> Self {
        self.common_api_url = Some(url.into());
        self
    }

    /// Sets the finance API base URL.
    pub fn finance_api_url(mut self, url: impl Into<String>) -> Self {
        self.finance_api_url = Some(url.into());
        self
    }

    /// Sets the seller analytics API base URL.
    pub fn analytics_api_url(mut self, url: impl Into<String>) -> Self {
        self.analytics_api_url = Some(url.into());
        self
    }

    /// Sets the statistics API base URL.
    pub fn statistics_api_url(mut self, url: impl Into<String>) -> Self {
        self.statistics_api_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.retry = Some(RetryConfig {
            max_retries: 0,
            ..Default::default()
        });
        self
    }

    /// Sets the rate limit configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Disables shared-cache throttling.
    pub fn no_rate_limit(mut self) -> Self {
        self.rate_limit = Some(RateLimitConfig {
            enabled: false,
            ..Default::default()
        });
        self
    }

    /// Sets the report job polling configuration.
    pub fn poll(mut self, config: PollConfig) -> Self {
        self.poll = Some(config);
        self
    }

    /// Sets the balance cache lifetime.
    pub fn balance_cache_ttl(mut self, ttl: Duration) -> Self {
        self.balance_cache_ttl = Some(ttl);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<WbConfig, ConfigError> {
        let config = WbConfig {
            common_api_url: self
                .common_api_url
                .unwrap_or_else(|| DEFAULT_COMMON_API_URL.to_string()),
            finance_api_url: self
                .finance_api_url
                .unwrap_or_else(|| DEFAULT_FINANCE_API_URL.to_string()),
            analytics_api_url: self
                .analytics_api_url
                .unwrap_or_else(|| DEFAULT_ANALYTICS_API_URL.to_string()),
            statistics_api_url: self
                .statistics_api_url
                .unwrap_or_else(|| DEFAULT_STATISTICS_API_URL.to_string()),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            retry: self.retry.unwrap_or_default(),
            rate_limit: self.rate_limit.unwrap_or_default(),
            poll: self.poll.unwrap_or_default(),
            balance_cache_ttl: self.balance_cache_ttl.unwrap_or(DEFAULT_BALANCE_CACHE_TTL),
        };

        config.validate()?;
        Ok(config)
    }
}
