//! # WB Integration Library
//!
//! A resilient client for the WB marketplace seller APIs with:
//! - Raw-token authentication and token sanitization
//! - Bounded retries with backoff and `Retry-After` handling
//! - A distributed rate limiter over a shared cache
//! - Report jobs (create, poll, download) with spreadsheet parsing
//! - Multi-page aggregation for analytics and statistics
//! - Normalization of historical response shapes into typed records
//! - A named report registry for menu-driven front ends
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_wb::{ApiToken, DateRange, WbClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WbClient::builder().build()?;
//!     let token = ApiToken::sanitize(&std::env::var("WB_API_TOKEN")?)?;
//!
//!     let balance = client.finance().account_balance_cached(&token).await?;
//!     println!("{} {}", balance.current, balance.currency);
//!
//!     let rows = client
//!         .reports()
//!         .paid_storage(&token, &DateRange::last_days(7))
//!         .await?;
//!     println!("{} storage rows", rows.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// Shared cache
pub mod cache;

// HTTP client and transport
pub mod client;

// Response normalization
pub mod envelope;

// Pagination handling
pub mod pagination;

// Report jobs and files
pub mod jobs;
pub mod spreadsheet;

// API Services
pub mod services;

// Named reports
pub mod registry;

// Resilience patterns
pub mod resilience;

// Observability
pub mod observability;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use auth::ApiToken;
pub use cache::{InMemoryCache, SharedCache};
pub use client::{ApiHost, BinaryResponse, RequestDescriptor, WbClient, WbClientBuilder};
pub use config::{PollConfig, RateLimitConfig, RetryConfig, WbConfig, WbConfigBuilder};
pub use errors::{CacheError, ConfigError, WbError, WbErrorKind, WbResult};
pub use jobs::{run_job, DownloadPayload, JobStatus, ReportJob};
pub use registry::{ReportKind, ReportParams, ReportRegistry, UnknownReport};
pub use resilience::EndpointFamily;
pub use types::*;
