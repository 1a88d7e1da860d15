//! WB API client implementation.

use crate::auth::ApiToken;
use crate::cache::{InMemoryCache, SharedCache};
use crate::config::{PollConfig, RateLimitConfig, RetryConfig, WbConfig, WbConfigBuilder};
use crate::envelope::unwrap_envelope;
use crate::errors::{ConfigError, WbError, WbResult};
use crate::jobs::DownloadPayload;
use crate::observability::{Metrics, RequestTimer, TracingHooks};
use crate::resilience::{EndpointFamily, RateLimiter, RetryPolicy};
use crate::services::*;
use bytes::Bytes;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// WB API host groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiHost {
    /// `common-api`: seller profile.
    Common,
    /// `finance-api`: balance.
    Finance,
    /// `seller-analytics-api`: reports and report jobs.
    Analytics,
    /// `statistics-api`: sales.
    Statistics,
}

/// What a successful response is decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// A JSON document, envelope removed.
    Json,
    /// Raw bytes and headers.
    Binary,
}

/// One upstream call. Built per call and never mutated once sent.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    timeout: Option<Duration>,
    expect: Expect,
    family: Option<EndpointFamily>,
}

impl RequestDescriptor {
    /// Creates a descriptor for `method` on an absolute `url`.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            timeout: None,
            expect: Expect::Json,
            family: None,
        }
    }

    /// A GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// A POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Appends every field of `params` as a query parameter.
    pub fn query_params<P: Serialize>(mut self, params: &P) -> WbResult<Self> {
        let encoded = serde_urlencoded::to_string(params).map_err(|e| {
            WbError::client(format!("Failed to serialize parameters: {}", e)).with_cause(e)
        })?;
        self.query.extend(url::form_urlencoded::parse(encoded.as_bytes()).into_owned());
        Ok(self)
    }

    /// Sets the JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Overrides the client-wide timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Expects a binary response.
    pub fn binary(mut self) -> Self {
        self.expect = Expect::Binary;
        self
    }

    /// Throttles the call under `family`.
    pub fn family(mut self, family: EndpointFamily) -> Self {
        self.family = Some(family);
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute URL without the query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Expected response kind.
    pub fn expect(&self) -> Expect {
        self.expect
    }

    /// Rate-limit family, if any.
    pub fn rate_limit_family(&self) -> Option<EndpointFamily> {
        self.family
    }
}

/// A successful binary response.
#[derive(Debug, Clone)]
pub struct BinaryResponse {
    /// Response body.
    pub bytes: Bytes,
    /// Response headers.
    pub headers: HeaderMap,
    /// `Content-Type` without parameters, lower-cased.
    pub content_type: Option<String>,
    /// File name from `Content-Disposition`.
    pub filename: Option<String>,
}

impl BinaryResponse {
    /// Wraps a body and its headers.
    pub fn new(bytes: Bytes, headers: HeaderMap) -> Self {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());
        let filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_disposition);
        Self {
            bytes,
            headers,
            content_type,
            filename,
        }
    }
}

/// WB API client.
///
/// One client serves any number of tokens: every operation takes the
/// [`ApiToken`] it runs under.
pub struct WbClient {
    /// HTTP client.
    http: Client,
    /// Configuration.
    config: WbConfig,
    /// Shared cache for rate-limit tickets and cached responses.
    cache: Arc<dyn SharedCache>,
    /// Retry policy.
    retry: RetryPolicy,
    /// Distributed rate limiter.
    limiter: RateLimiter,
    /// Request metrics.
    metrics: Arc<Metrics>,
}

impl WbClient {
    /// Creates a new WB client over `cache`.
    pub fn new(config: WbConfig, cache: Arc<dyn SharedCache>) -> Result<Self, ConfigError> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to create HTTP client: {}", e)))?;

        let metrics = Arc::new(Metrics::new());
        let retry = RetryPolicy::new(config.retry.clone(), metrics.clone());
        let limiter = RateLimiter::new(cache.clone(), config.rate_limit.jitter, metrics.clone());

        Ok(Self {
            http,
            config,
            cache,
            retry,
            limiter,
            metrics,
        })
    }

    /// Creates a new client builder.
    pub fn builder() -> WbClientBuilder {
        WbClientBuilder::new()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &WbConfig {
        &self.config
    }

    /// Gets the request metrics.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Gets the shared cache.
    pub fn cache(&self) -> &Arc<dyn SharedCache> {
        &self.cache
    }

    /// Absolute URL of `path` on `host`.
    pub fn endpoint(&self, host: ApiHost, path: &str) -> String {
        let base = match host {
            ApiHost::Common => &self.config.common_api_url,
            ApiHost::Finance => &self.config.finance_api_url,
            ApiHost::Analytics => &self.config.analytics_api_url,
            ApiHost::Statistics => &self.config.statistics_api_url,
        };
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    // Service accessors

    /// Gets the seller profile service.
    pub fn common(&self) -> CommonService {
        CommonService::new(self)
    }

    /// Gets the finance service.
    pub fn finance(&self) -> FinanceService {
        FinanceService::new(self)
    }

    /// Gets the analytics service.
    pub fn analytics(&self) -> AnalyticsService {
        AnalyticsService::new(self)
    }

    /// Gets the seller reports service.
    pub fn reports(&self) -> ReportsService {
        ReportsService::new(self)
    }

    /// Gets the statistics service.
    pub fn statistics(&self) -> StatisticsService {
        StatisticsService::new(self)
    }

    /// Gets the diagnostics service.
    pub fn diagnostics(&self) -> DiagnosticsService {
        DiagnosticsService::new(self)
    }

    // Transport

    /// Executes a JSON call and returns the decoded body, envelope removed.
    pub async fn execute_json(
        &self,
        token: &ApiToken,
        request: &RequestDescriptor,
    ) -> WbResult<Value> {
        let (_, bytes) = self.execute(token, request).await?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| WbError::malformed_payload(e, &String::from_utf8_lossy(&bytes)))?;
        Ok(unwrap_envelope(value))
    }

    /// Executes a call whose body is a file.
    pub async fn execute_binary(
        &self,
        token: &ApiToken,
        request: &RequestDescriptor,
    ) -> WbResult<BinaryResponse> {
        let (headers, bytes) = self.execute(token, request).await?;
        Ok(BinaryResponse::new(bytes, headers))
    }

    /// Executes a call and decodes the body the way the descriptor expects.
    pub async fn fetch(
        &self,
        token: &ApiToken,
        request: &RequestDescriptor,
    ) -> WbResult<DownloadPayload> {
        match request.expect {
            Expect::Json => self.execute_json(token, request).await.map(DownloadPayload::Json),
            Expect::Binary => self
                .execute_binary(token, request)
                .await
                .map(DownloadPayload::Binary),
        }
    }

    async fn execute(
        &self,
        token: &ApiToken,
        request: &RequestDescriptor,
    ) -> WbResult<(HeaderMap, Bytes)> {
        if let Some(family) = request.family {
            if self.config.rate_limit.enabled {
                let key = RateLimiter::ticket_key(token.fingerprint(), family);
                let interval = self.config.rate_limit.interval_for(family);
                self.limiter.throttle(&key, interval).await;
            }
        }

        let label = format!("{} {}", request.method, request.url);
        TracingHooks::on_request_start(request.method.as_str(), &request.url, token.log_id());

        let timer = RequestTimer::new(self.metrics.clone());
        let result = self
            .retry
            .execute(&label, |_| self.send_once(token, request))
            .await;

        match &result {
            Ok(_) => timer.success(),
            Err(_) => timer.failure(),
        }
        result
    }

    async fn send_once(
        &self,
        token: &ApiToken,
        request: &RequestDescriptor,
    ) -> WbResult<(HeaderMap, Bytes)> {
        let started = Instant::now();
        let method = request.method.as_str();

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .header(AUTHORIZATION, token.header_value())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.config.user_agent);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let error = map_transport_error(e);
                TracingHooks::on_request_error(method, &request.url, &error);
                return Err(error);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        TracingHooks::on_response_headers(&request.url, &headers);

        if !status.is_success() {
            let retry_after = parse_retry_after(&headers);
            let body = response.text().await.unwrap_or_default();
            let mut error = WbError::from_status(status.as_u16(), &body);
            if let Some(delay) = retry_after {
                error = error.with_retry_after(delay);
            }
            TracingHooks::on_request_error(method, &request.url, &error);
            return Err(error);
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        TracingHooks::on_request_complete(method, &request.url, status.as_u16(), started.elapsed());
        Ok((headers, bytes))
    }
}

fn map_transport_error(e: reqwest::Error) -> WbError {
    if e.is_builder() {
        WbError::client(format!("Invalid request: {}", e)).with_cause(e)
    } else if e.is_timeout() {
        WbError::network(format!("Request timed out: {}", e)).with_cause(e)
    } else if e.is_connect() {
        WbError::network(format!("Connection failed: {}", e)).with_cause(e)
    } else {
        WbError::network(format!("Request failed: {}", e)).with_cause(e)
    }
}

/// Reads `Retry-After` as a number of seconds.
///
/// Zero, negative and non-numeric values count as absent.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds: f64 = headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    if seconds.is_finite() && seconds > 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}

/// Extracts the file name from a `Content-Disposition` value.
///
/// `filename*` (RFC 5987) wins over `filename`.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';').map(str::trim) {
        let Some((name, raw)) = part.split_once('=') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let raw = raw.trim();
        if name == "filename*" {
            let encoded = match raw.find("''") {
                Some(idx) => &raw[idx + 2..],
                None => raw,
            };
            let decoded: String = url::form_urlencoded::parse(format!("f={}", encoded).as_bytes())
                .map(|(_, v)| v.into_owned())
                .next()
                .unwrap_or_default();
            if !decoded.is_empty() {
                return Some(decoded);
            }
        } else if name == "filename" {
            let unquoted = raw.trim_matches('"');
            if !unquoted.is_empty() {
                plain = Some(unquoted.to_string());
            }
        }
    }
    plain
}

/// Builder for WbClient.
pub struct WbClientBuilder {
    config_builder: WbConfigBuilder,
    cache: Option<Arc<dyn SharedCache>>,
}

impl WbClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: WbConfig::builder(),
            cache: None,
        }
    }

    /// Points every API host at one base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the shared cache. Defaults to a process-local [`InMemoryCache`].
    pub fn cache(mut self, cache: Arc<dyn SharedCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.config_builder = self.config_builder.retry(config);
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.config_builder = self.config_builder.no_retry();
        self
    }

    /// Sets the rate limiter configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.config_builder = self.config_builder.rate_limit(config);
        self
    }

    /// Disables the rate limiter.
    pub fn no_rate_limit(mut self) -> Self {
        self.config_builder = self.config_builder.no_rate_limit();
        self
    }

    /// Sets report job polling.
    pub fn poll(mut self, config: PollConfig) -> Self {
        self.config_builder = self.config_builder.poll(config);
        self
    }

    /// Sets the balance cache lifetime.
    pub fn balance_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config_builder = self.config_builder.balance_cache_ttl(ttl);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<WbClient, ConfigError> {
        let config = self.config_builder.build()?;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(InMemoryCache::new()));
        WbClient::new(config, cache)
    }
}

impl Default for WbClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
