//! Finance operations.

use crate::auth::ApiToken;
use crate::client::{ApiHost, RequestDescriptor, WbClient};
use crate::envelope::normalize_balance;
use crate::errors::{shorten, CacheError, WbResult};
use crate::observability::TracingHooks;
use crate::resilience::EndpointFamily;
use crate::types::Balance;
use tracing::debug;

/// Service for the finance API.
pub struct FinanceService<'a> {
    client: &'a WbClient,
}

impl<'a> FinanceService<'a> {
    /// Creates a new finance service.
    pub fn new(client: &'a WbClient) -> Self {
        Self { client }
    }

    /// Cache key of a token's balance.
    pub fn balance_cache_key(token: &ApiToken) -> String {
        format!("wb:balance:{}", token.fingerprint())
    }

    /// Gets the live account balance.
    pub async fn account_balance(&self, token: &ApiToken) -> WbResult<Balance> {
        let request = RequestDescriptor::get(
            self.client
                .endpoint(ApiHost::Finance, "/api/v1/account/balance"),
        )
        .family(EndpointFamily::Finance);

        let raw = self.client.execute_json(token, &request).await?;
        debug!(
            token = %token.log_id(),
            payload = %shorten(&raw.to_string(), 800),
            "WB balance payload"
        );
        normalize_balance(&raw)
    }

    /// Gets the account balance, served from the shared cache when a fresh
    /// copy exists.
    ///
    /// Cache failures fall back to a live call.
    pub async fn account_balance_cached(&self, token: &ApiToken) -> WbResult<Balance> {
        let key = Self::balance_cache_key(token);
        let cache = self.client.cache();

        match cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Balance>(&raw) {
                Ok(balance) => {
                    debug!(token = %token.log_id(), "Balance served from cache");
                    return Ok(balance);
                }
                Err(e) => TracingHooks::on_cache_error("balance decode", &CacheError::Codec(e.to_string())),
            },
            Ok(None) => {}
            Err(e) => TracingHooks::on_cache_error("balance read", &e),
        }

        let balance = self.account_balance(token).await?;

        match serde_json::to_string(&balance) {
            Ok(encoded) => {
                if let Err(e) = cache
                    .setex(&key, self.client.config().balance_cache_ttl, &encoded)
                    .await
                {
                    TracingHooks::on_cache_error("balance write", &e);
                }
            }
            Err(e) => TracingHooks::on_cache_error("balance encode", &CacheError::Codec(e.to_string())),
        }

        Ok(balance)
    }

    /// Drops the cached balance of a token.
    pub async fn invalidate_balance(&self, token: &ApiToken) {
        if let Err(e) = self.client.cache().delete(&Self::balance_cache_key(token)).await {
            TracingHooks::on_cache_error("balance delete", &e);
        }
    }
}
