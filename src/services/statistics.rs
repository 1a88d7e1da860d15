//! Statistics API operations.

use crate::auth::ApiToken;
use crate::client::{ApiHost, RequestDescriptor, WbClient};
use crate::envelope::{extract_items, into_rows};
use crate::errors::WbResult;
use crate::pagination::aggregate_by_cursor;
use crate::resilience::EndpointFamily;
use crate::types::Row;
use chrono::NaiveDate;

/// Chunk ceiling for [`StatisticsService::sales`].
pub const DEFAULT_MAX_CHUNKS: u32 = 10;

/// Service for the statistics API.
pub struct StatisticsService<'a> {
    client: &'a WbClient,
}

impl<'a> StatisticsService<'a> {
    /// Creates a new statistics service.
    pub fn new(client: &'a WbClient) -> Self {
        Self { client }
    }

    /// Gets sales and returns changed since `since`.
    ///
    /// Upstream returns a bounded chunk per call; following chunks are
    /// requested from the `lastChangeDate` of the previous chunk's last row
    /// until a chunk is empty or `max_chunks` calls were made.
    pub async fn sales(
        &self,
        token: &ApiToken,
        since: NaiveDate,
        max_chunks: u32,
    ) -> WbResult<Vec<Row>> {
        let client = self.client;
        let url = client.endpoint(ApiHost::Statistics, "/api/v1/supplier/sales");
        let url = url.as_str();

        let aggregated = aggregate_by_cursor(
            |cursor| {
                let request = RequestDescriptor::get(url)
                    .query("dateFrom", cursor)
                    .query("flag", 0)
                    .family(EndpointFamily::Statistics);
                async move {
                    let value = client.execute_json(token, &request).await?;
                    Ok(extract_items(&value))
                }
            },
            since.format("%Y-%m-%d").to_string(),
            "lastChangeDate",
            max_chunks,
        )
        .await?;

        Ok(into_rows(aggregated.into_items()))
    }
}
