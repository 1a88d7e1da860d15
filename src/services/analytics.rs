//! Seller analytics: product card funnel and search query reports.

use super::to_body;
use crate::auth::ApiToken;
use crate::client::{ApiHost, RequestDescriptor, WbClient};
use crate::envelope::{extract_items, into_rows};
use crate::errors::WbResult;
use crate::pagination::aggregate_pages;
use crate::resilience::EndpointFamily;
use crate::types::{
    GroupedHistoryRequest, NmReportDetailRequest, NmReportHistoryRequest, Row,
    SearchReportRequest, SearchTextsRequest,
};
use serde_json::Value;

/// Page ceiling for [`AnalyticsService::nm_report_detail_all`].
pub const DEFAULT_MAX_PAGES: u32 = 20;

/// Service for the analytics API.
pub struct AnalyticsService<'a> {
    client: &'a WbClient,
}

impl<'a> AnalyticsService<'a> {
    /// Creates a new analytics service.
    pub fn new(client: &'a WbClient) -> Self {
        Self { client }
    }

    fn post(&self, path: &str, body: Value, family: EndpointFamily) -> RequestDescriptor {
        RequestDescriptor::post(self.client.endpoint(ApiHost::Analytics, path))
            .json(body)
            .family(family)
    }

    /// Gets one page of product card statistics, as returned upstream.
    pub async fn nm_report_detail(
        &self,
        token: &ApiToken,
        request: &NmReportDetailRequest,
    ) -> WbResult<Value> {
        let descriptor = self.post(
            "/api/v2/nm-report/detail",
            to_body(request)?,
            EndpointFamily::NmReport,
        );
        self.client.execute_json(token, &descriptor).await
    }

    /// Gets product card statistics across pages, starting at
    /// `request.page`, and returns the cards.
    pub async fn nm_report_detail_all(
        &self,
        token: &ApiToken,
        request: &NmReportDetailRequest,
        max_pages: u32,
    ) -> WbResult<Vec<Value>> {
        let client = self.client;
        let aggregated = aggregate_pages(
            |page| {
                let mut body = request.clone();
                body.page = page;
                let descriptor = to_body(&body).map(|json| {
                    self.post("/api/v2/nm-report/detail", json, EndpointFamily::NmReport)
                });
                async move { client.execute_json(token, &descriptor?).await }
            },
            request.page,
            max_pages,
        )
        .await?;
        Ok(aggregated.into_items())
    }

    /// Gets the daily history of individual product cards.
    pub async fn nm_report_history(
        &self,
        token: &ApiToken,
        request: &NmReportHistoryRequest,
    ) -> WbResult<Vec<Row>> {
        let descriptor = self.post(
            "/api/v2/nm-report/detail/history",
            to_body(request)?,
            EndpointFamily::NmReport,
        );
        let value = self.client.execute_json(token, &descriptor).await?;
        Ok(into_rows(extract_items(&value)))
    }

    /// Gets the daily history of card groups (subject, brand, tag).
    pub async fn grouped_history(
        &self,
        token: &ApiToken,
        request: &GroupedHistoryRequest,
    ) -> WbResult<Vec<Row>> {
        let descriptor = self.post(
            "/api/v2/nm-report/grouped/history",
            to_body(request)?,
            EndpointFamily::NmReport,
        );
        let value = self.client.execute_json(token, &descriptor).await?;
        Ok(into_rows(extract_items(&value)))
    }

    /// Gets the search query report, as returned upstream.
    pub async fn search_report(
        &self,
        token: &ApiToken,
        request: &SearchReportRequest,
    ) -> WbResult<Value> {
        let descriptor = self.post(
            "/api/v2/search-report/report",
            to_body(request)?,
            EndpointFamily::SearchReport,
        );
        self.client.execute_json(token, &descriptor).await
    }

    /// Gets the top search queries of individual product cards.
    pub async fn search_texts(
        &self,
        token: &ApiToken,
        request: &SearchTextsRequest,
    ) -> WbResult<Vec<Row>> {
        let descriptor = self.post(
            "/api/v2/search-report/product/search-texts",
            to_body(request)?,
            EndpointFamily::SearchReport,
        );
        let value = self.client.execute_json(token, &descriptor).await?;
        Ok(into_rows(extract_items(&value)))
    }
}
