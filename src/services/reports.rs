//! Seller reports: stock snapshots, paid services, retention and
//! assortment reports.
//!
//! Warehouse remains, paid acceptance and paid storage are generated as
//! background tasks and go through [`run_job`]. The rest are single calls.

use crate::auth::ApiToken;
use crate::client::{ApiHost, RequestDescriptor, WbClient};
use crate::envelope::extract_rows;
use crate::errors::WbResult;
use crate::jobs::run_job;
use crate::resilience::EndpointFamily;
use crate::types::{DateRange, Row};
use serde::Serialize;
use serde_json::{json, Value};

/// Grouping of the warehouse remains report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseRemainsParams {
    /// Language of names in the report (`ru`, `en`, `zh`).
    pub locale: String,
    /// Group by brand.
    pub group_by_brand: bool,
    /// Group by subject.
    pub group_by_subject: bool,
    /// Group by seller article.
    pub group_by_sa: bool,
    /// Group by WB article.
    pub group_by_nm: bool,
    /// Group by barcode.
    pub group_by_barcode: bool,
    /// Group by size.
    pub group_by_size: bool,
}

impl Default for WarehouseRemainsParams {
    fn default() -> Self {
        Self {
            locale: "ru".to_string(),
            group_by_brand: false,
            group_by_subject: false,
            group_by_sa: true,
            group_by_nm: true,
            group_by_barcode: true,
            group_by_size: true,
        }
    }
}

/// Filter of the brand share report.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandShareFilter {
    /// Parent category id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
    /// Brand name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

/// Service for seller reports.
pub struct ReportsService<'a> {
    client: &'a WbClient,
}

impl<'a> ReportsService<'a> {
    /// Creates a new reports service.
    pub fn new(client: &'a WbClient) -> Self {
        Self { client }
    }

    fn get(&self, path: &str, family: EndpointFamily) -> RequestDescriptor {
        RequestDescriptor::get(self.client.endpoint(ApiHost::Analytics, path)).family(family)
    }

    fn with_period(request: RequestDescriptor, range: &DateRange) -> RequestDescriptor {
        request
            .query("dateFrom", range.start_date())
            .query("dateTo", range.end_date())
    }

    /// Creates a report task at `create`, waits for it under
    /// `{tasks_path}/tasks/{id}/status` and downloads it from
    /// `{tasks_path}/tasks/{id}/download`.
    async fn run_task(
        &self,
        token: &ApiToken,
        create: RequestDescriptor,
        tasks_path: &str,
    ) -> WbResult<Vec<Row>> {
        let client = self.client;
        let poll = client.config().poll.clone();
        let tasks_url = client.endpoint(ApiHost::Analytics, tasks_path);
        let tasks_url = tasks_url.as_str();

        run_job(
            || client.execute_json(token, &create),
            |task_id| {
                let request = RequestDescriptor::get(format!("{}/tasks/{}/status", tasks_url, task_id));
                async move { client.execute_json(token, &request).await }
            },
            |task_id| {
                let request =
                    RequestDescriptor::get(format!("{}/tasks/{}/download", tasks_url, task_id))
                        .binary();
                async move { client.fetch(token, &request).await }
            },
            poll.interval,
            poll.timeout,
        )
        .await
    }

    async fn single(
        &self,
        token: &ApiToken,
        request: RequestDescriptor,
        keys: &[&str],
    ) -> WbResult<Vec<Row>> {
        let value = self.client.execute_json(token, &request).await?;
        Ok(extract_rows(&value, keys))
    }

    // Report jobs

    /// Gets current stock per warehouse.
    pub async fn warehouse_remains(
        &self,
        token: &ApiToken,
        params: &WarehouseRemainsParams,
    ) -> WbResult<Vec<Row>> {
        let create = self
            .get("/api/v1/warehouse_remains", EndpointFamily::WarehouseRemains)
            .query_params(params)?;
        self.run_task(token, create, "/api/v1/warehouse_remains").await
    }

    /// Gets paid acceptance charges over `range`.
    pub async fn paid_acceptance(&self, token: &ApiToken, range: &DateRange) -> WbResult<Vec<Row>> {
        let create = Self::with_period(
            self.get("/api/v1/acceptance_report", EndpointFamily::PaidAcceptance),
            range,
        );
        self.run_task(token, create, "/api/v1/acceptance_report").await
    }

    /// Gets paid storage charges over `range`.
    pub async fn paid_storage(&self, token: &ApiToken, range: &DateRange) -> WbResult<Vec<Row>> {
        let create = Self::with_period(
            self.get("/api/v1/paid_storage", EndpointFamily::PaidStorage),
            range,
        );
        self.run_task(token, create, "/api/v1/paid_storage").await
    }

    // Single-call reports

    /// Gets goods with excise marking sold over `range`, optionally limited to
    /// some countries (ISO codes).
    pub async fn excise_report(
        &self,
        token: &ApiToken,
        range: &DateRange,
        countries: &[String],
    ) -> WbResult<Vec<Row>> {
        let body = if countries.is_empty() {
            json!({})
        } else {
            json!({ "countries": countries })
        };
        let request = Self::with_period(
            RequestDescriptor::post(
                self.client
                    .endpoint(ApiHost::Analytics, "/api/v1/analytics/excise-report"),
            )
            .family(EndpointFamily::AnalyticsReports),
            range,
        )
        .json(body);

        let value = self.client.execute_json(token, &request).await?;
        let inner = value.get("response").unwrap_or(&value);
        Ok(extract_rows(inner, &["data"]))
    }

    /// Gets withholdings for self-purchases over `range`.
    pub async fn antifraud_details(&self, token: &ApiToken, range: &DateRange) -> WbResult<Vec<Row>> {
        let request = Self::with_period(
            self.get(
                "/api/v1/analytics/antifraud-details",
                EndpointFamily::AnalyticsReports,
            ),
            range,
        );
        self.single(token, request, &["details"]).await
    }

    /// Gets withholdings for incorrectly attached goods photos over `range`.
    pub async fn incorrect_attachments(
        &self,
        token: &ApiToken,
        range: &DateRange,
    ) -> WbResult<Vec<Row>> {
        let request = Self::with_period(
            self.get(
                "/api/v1/analytics/incorrect-attachments",
                EndpointFamily::AnalyticsReports,
            ),
            range,
        );
        self.single(token, request, &["report"]).await
    }

    /// Gets fines for goods labeling over `range`.
    pub async fn goods_labeling(&self, token: &ApiToken, range: &DateRange) -> WbResult<Vec<Row>> {
        let request = Self::with_period(
            self.get(
                "/api/v1/analytics/goods-labeling",
                EndpointFamily::AnalyticsReports,
            ),
            range,
        );
        self.single(token, request, &["report"]).await
    }

    /// Gets sales per region over `range`.
    pub async fn region_sale(&self, token: &ApiToken, range: &DateRange) -> WbResult<Vec<Row>> {
        let request = Self::with_period(
            self.get("/api/v1/analytics/region-sale", EndpointFamily::AnalyticsReports),
            range,
        );
        self.single(token, request, &["report"]).await
    }

    /// Gets the brand's share of sales over `range`.
    pub async fn brand_share(
        &self,
        token: &ApiToken,
        range: &DateRange,
        filter: &BrandShareFilter,
    ) -> WbResult<Vec<Row>> {
        let request = Self::with_period(
            self.get("/api/v1/analytics/brand-share", EndpointFamily::AnalyticsReports)
                .query_params(filter)?,
            range,
        );
        self.single(token, request, &["report"]).await
    }

    /// Gets goods blocked from sale.
    pub async fn blocked_products(&self, token: &ApiToken) -> WbResult<Vec<Row>> {
        self.banned_products_of(token, "blocked").await
    }

    /// Gets goods hidden from search.
    pub async fn shadowed_products(&self, token: &ApiToken) -> WbResult<Vec<Row>> {
        self.banned_products_of(token, "shadowed").await
    }

    /// Gets blocked and hidden goods together. Each row carries `banType`
    /// (`blocked` or `shadowed`).
    pub async fn banned_products(&self, token: &ApiToken) -> WbResult<Vec<Row>> {
        let mut rows = self.blocked_products(token).await?;
        rows.extend(self.shadowed_products(token).await?);
        Ok(rows)
    }

    async fn banned_products_of(&self, token: &ApiToken, kind: &str) -> WbResult<Vec<Row>> {
        let request = self
            .get(
                &format!("/api/v1/analytics/banned-products/{}", kind),
                EndpointFamily::AnalyticsReports,
            )
            .query("sort", "nmId")
            .query("order", "desc");

        let mut rows = self.single(token, request, &["report"]).await?;
        for row in &mut rows {
            row.insert("banType".to_string(), Value::String(kind.to_string()));
        }
        Ok(rows)
    }

    /// Gets returns and transfers of goods to the seller over `range`.
    pub async fn goods_return(&self, token: &ApiToken, range: &DateRange) -> WbResult<Vec<Row>> {
        let request = Self::with_period(
            self.get("/api/v1/analytics/goods-return", EndpointFamily::AnalyticsReports),
            range,
        );
        self.single(token, request, &["report"]).await
    }
}
