//! Token diagnostics.

use crate::auth::ApiToken;
use crate::client::WbClient;
use crate::errors::WbResult;
use crate::types::{EndpointCheck, PingReport};
use std::future::Future;
use std::time::Instant;

/// Service for checking what a token can reach.
pub struct DiagnosticsService<'a> {
    client: &'a WbClient,
}

impl<'a> DiagnosticsService<'a> {
    /// Creates a new diagnostics service.
    pub fn new(client: &'a WbClient) -> Self {
        Self { client }
    }

    /// Calls seller info and the live (uncached) balance concurrently and
    /// reports how each went. Never fails: errors are part of the report.
    pub async fn ping(&self, token: &ApiToken) -> PingReport {
        let common = self.client.common();
        let finance = self.client.finance();
        let (seller_info, account_balance) = futures::join!(
            probe(common.seller_info(token)),
            probe(finance.account_balance(token)),
        );
        PingReport {
            seller_info,
            account_balance,
        }
    }
}

async fn probe<T>(call: impl Future<Output = WbResult<T>>) -> EndpointCheck {
    let started = Instant::now();
    let result = call.await;
    let ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(_) => EndpointCheck {
            ok: true,
            ms,
            error: None,
        },
        Err(e) => EndpointCheck {
            ok: false,
            ms,
            error: Some(e.to_string()),
        },
    }
}
