//! Observability: request metrics and structured tracing hooks.

use crate::errors::{CacheError, WbError};
use reqwest::header::HeaderMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn, Level};

/// Metrics collector for WB API operations.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Logical requests started.
    requests_total: AtomicU64,
    /// Successful requests.
    requests_success: AtomicU64,
    /// Failed requests.
    requests_failed: AtomicU64,
    /// Retries performed.
    requests_retried: AtomicU64,
    /// Calls that waited on a rate-limit ticket.
    requests_rate_limited: AtomicU64,
    /// Total request latency in microseconds.
    latency_total_us: AtomicU64,
    /// Request count for latency calculation.
    latency_count: AtomicU64,
}

impl Metrics {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request.
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful request.
    pub fn record_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed request.
    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a retry.
    pub fn record_retry(&self) {
        self.requests_retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a wait on a rate-limit ticket.
    pub fn record_rate_limited(&self) {
        self.requests_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Records request latency.
    pub fn record_latency(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.latency_total_us.fetch_add(us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the average latency in microseconds.
    pub fn average_latency_us(&self) -> u64 {
        let total = self.latency_total_us.load(Ordering::Relaxed);
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            0
        } else {
            total / count
        }
    }

    /// Gets a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_retried: self.requests_retried.load(Ordering::Relaxed),
            requests_rate_limited: self.requests_rate_limited.load(Ordering::Relaxed),
            average_latency_us: self.average_latency_us(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Logical requests started.
    pub requests_total: u64,
    /// Successful requests.
    pub requests_success: u64,
    /// Failed requests.
    pub requests_failed: u64,
    /// Retries performed.
    pub requests_retried: u64,
    /// Calls that waited on a rate-limit ticket.
    pub requests_rate_limited: u64,
    /// Average latency in microseconds.
    pub average_latency_us: u64,
}

/// Request timer for measuring latency.
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<Metrics>,
}

impl RequestTimer {
    /// Creates a new request timer.
    pub fn new(metrics: Arc<Metrics>) -> Self {
        metrics.record_request();
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    /// Records success and latency.
    pub fn success(self) {
        self.metrics.record_success();
        self.metrics.record_latency(self.start.elapsed());
    }

    /// Records failure and latency.
    pub fn failure(self) {
        self.metrics.record_failure();
        self.metrics.record_latency(self.start.elapsed());
    }

    /// Gets elapsed time without recording.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Tracing hooks for WB API operations.
pub struct TracingHooks;

impl TracingHooks {
    /// Logs the start of an API request.
    pub fn on_request_start(method: &str, url: &str, token_id: &str) {
        debug!(
            method = %method,
            url = %url,
            token = %token_id,
            "WB API request started"
        );
    }

    /// Logs response headers at trace level, sensitive values masked.
    pub fn on_response_headers(url: &str, headers: &HeaderMap) {
        if !tracing::enabled!(Level::TRACE) {
            return;
        }
        let rendered: Vec<String> = headers
            .iter()
            .map(|(name, value)| {
                let value = value.to_str().unwrap_or("<binary>");
                format!("{}: {}", name, redact_header(name.as_str(), value))
            })
            .collect();
        trace!(url = %url, headers = ?rendered, "WB API response headers");
    }

    /// Logs the completion of an API request.
    pub fn on_request_complete(method: &str, url: &str, status: u16, duration: Duration) {
        info!(
            method = %method,
            url = %url,
            status = status,
            duration_ms = duration.as_millis() as u64,
            "WB API request completed"
        );
    }

    /// Logs a request error.
    pub fn on_request_error(method: &str, url: &str, error: &WbError) {
        warn!(
            method = %method,
            url = %url,
            kind = %error.kind(),
            error = %error,
            "WB API request failed"
        );
    }

    /// Logs a retry attempt.
    pub fn on_retry(label: &str, attempt: u32, delay: Duration, error: &WbError) {
        warn!(
            request = %label,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying WB API request"
        );
    }

    /// Logs a wait on a rate-limit ticket.
    pub fn on_throttle(key: &str, wait: Duration) {
        debug!(
            key = %key,
            wait_ms = wait.as_millis() as u64,
            "Waiting for rate limit ticket"
        );
    }

    /// Logs a shared cache failure. These never fail the calling operation.
    pub fn on_cache_error(operation: &str, error: &CacheError) {
        warn!(
            operation = %operation,
            error = %error,
            "Shared cache unavailable, continuing without it"
        );
    }

    /// Logs a report job status observation.
    pub fn on_job_status(task_id: &str, status: &str, elapsed: Duration) {
        debug!(
            task_id = %task_id,
            status = %status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Report job status"
        );
    }

    /// Logs the end of a multi-page aggregation.
    pub fn on_aggregation_stop(reason: &str, pages: u32, items: usize) {
        debug!(
            reason = %reason,
            pages = pages,
            items = items,
            "Pagination finished"
        );
    }
}

/// Sensitive headers that should be redacted in logs.
pub const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

/// Redacts sensitive values in headers.
pub fn redact_header(name: &str, value: &str) -> String {
    if SENSITIVE_HEADERS.contains(&name.to_lowercase().as_str()) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}
