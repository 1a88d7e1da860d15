//! Seller profile operations.

use crate::auth::ApiToken;
use crate::client::{ApiHost, RequestDescriptor, WbClient};
use crate::errors::{shorten, WbError, WbResult};
use crate::resilience::EndpointFamily;
use crate::types::SellerInfo;

/// Service for the common API.
pub struct CommonService<'a> {
    client: &'a WbClient,
}

impl<'a> CommonService<'a> {
    /// Creates a new common service.
    pub fn new(client: &'a WbClient) -> Self {
        Self { client }
    }

    /// Gets the seller profile the token belongs to.
    pub async fn seller_info(&self, token: &ApiToken) -> WbResult<SellerInfo> {
        let request =
            RequestDescriptor::get(self.client.endpoint(ApiHost::Common, "/api/v1/seller-info"))
                .family(EndpointFamily::Common);

        let value = self.client.execute_json(token, &request).await?;
        if !value.is_object() {
            return Err(WbError::malformed(format!(
                "unexpected seller-info response: {}",
                shorten(&value.to_string(), 500)
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| WbError::malformed(format!("Failed to decode seller info: {}", e)))
    }
}
