//! Named report registry.
//!
//! Front ends (chat bots, dashboards) offer a fixed menu of reports. The
//! registry maps each menu entry to the typed call that produces its rows;
//! names are resolved once, so a typo fails at startup rather than when a
//! user picks the entry.

use crate::auth::ApiToken;
use crate::client::WbClient;
use crate::errors::WbResult;
use crate::services::{BrandShareFilter, WarehouseRemainsParams};
use crate::types::{DateRange, Row};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A report name that is not in the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown report: {0:?}")]
pub struct UnknownReport(pub String);

/// Reports offered to sellers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Stock per warehouse.
    Stocks,
    /// Goods labeling fines.
    Marking,
    /// Withholdings (self-purchases, incorrect attachments).
    Withholdings,
    /// Paid acceptance.
    PaidAcceptance,
    /// Paid storage.
    PaidStorage,
    /// Sales per region.
    SalesByRegions,
    /// Brand share of sales.
    BrandShare,
    /// Blocked and hidden goods.
    HiddenGoods,
    /// Returns and transfers to the seller.
    ReturnsTransfers,
}

impl ReportKind {
    /// Every report, in menu order.
    pub const ALL: [ReportKind; 9] = [
        Self::Stocks,
        Self::Marking,
        Self::Withholdings,
        Self::PaidAcceptance,
        Self::PaidStorage,
        Self::SalesByRegions,
        Self::BrandShare,
        Self::HiddenGoods,
        Self::ReturnsTransfers,
    ];

    /// Registry name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stocks => "stocks",
            Self::Marking => "marking",
            Self::Withholdings => "withholdings",
            Self::PaidAcceptance => "paid-acceptance",
            Self::PaidStorage => "paid-storage",
            Self::SalesByRegions => "sales-by-regions",
            Self::BrandShare => "brand-share",
            Self::HiddenGoods => "hidden-goods",
            Self::ReturnsTransfers => "returns-transfers",
        }
    }

    /// Whether the report covers a date range. Snapshots ignore
    /// [`ReportParams`].
    pub fn uses_period(&self) -> bool {
        !matches!(self, Self::Stocks | Self::HiddenGoods)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = UnknownReport;

    /// Accepts registry names as well as `snake_case` and `get_report_*`
    /// spellings.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = name.trim().to_ascii_lowercase();
        let normalized = normalized
            .strip_prefix("get_report_")
            .unwrap_or(&normalized)
            .replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownReport(name.to_string()))
    }
}

/// Parameters shared by all registry reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportParams {
    /// First day.
    pub date_from: NaiveDate,
    /// Last day.
    pub date_to: NaiveDate,
}

impl ReportParams {
    /// Parameters for an explicit range.
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self { date_from, date_to }
    }

    /// The last `days` days up to today.
    pub fn last_days(days: i64) -> Self {
        let range = DateRange::last_days(days);
        Self::new(range.from, range.to)
    }

    /// The period as a [`DateRange`].
    pub fn range(&self) -> DateRange {
        DateRange::new(self.date_from, self.date_to)
    }
}

impl Default for ReportParams {
    fn default() -> Self {
        Self::last_days(30)
    }
}

/// A report implementation.
pub type ReportFn =
    for<'a> fn(&'a WbClient, &'a ApiToken, &'a ReportParams) -> BoxFuture<'a, WbResult<Vec<Row>>>;

/// A resolved registry entry.
#[derive(Clone, Copy)]
pub struct ReportHandle {
    kind: ReportKind,
    run: ReportFn,
}

impl ReportHandle {
    /// Which report this is.
    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Produces the report rows.
    pub async fn run(
        &self,
        client: &WbClient,
        token: &ApiToken,
        params: &ReportParams,
    ) -> WbResult<Vec<Row>> {
        (self.run)(client, token, params).await
    }
}

impl fmt::Debug for ReportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportHandle").field("kind", &self.kind).finish()
    }
}

/// Maps report kinds to their implementations.
#[derive(Default)]
pub struct ReportRegistry {
    handlers: HashMap<ReportKind, ReportFn>,
}

impl ReportRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every [`ReportKind`] wired to its WB call.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(ReportKind::Stocks, stocks);
        registry.register(ReportKind::Marking, marking);
        registry.register(ReportKind::Withholdings, withholdings);
        registry.register(ReportKind::PaidAcceptance, paid_acceptance);
        registry.register(ReportKind::PaidStorage, paid_storage);
        registry.register(ReportKind::SalesByRegions, sales_by_regions);
        registry.register(ReportKind::BrandShare, brand_share);
        registry.register(ReportKind::HiddenGoods, hidden_goods);
        registry.register(ReportKind::ReturnsTransfers, returns_transfers);
        registry
    }

    /// Adds or replaces the implementation of `kind`.
    pub fn register(&mut self, kind: ReportKind, run: ReportFn) {
        self.handlers.insert(kind, run);
    }

    /// Looks up a registered report.
    pub fn get(&self, kind: ReportKind) -> Option<ReportHandle> {
        self.handlers
            .get(&kind)
            .map(|run| ReportHandle { kind, run: *run })
    }

    /// Resolves a report by name.
    pub fn resolve(&self, name: &str) -> Result<ReportHandle, UnknownReport> {
        let kind: ReportKind = name.parse()?;
        self.get(kind).ok_or_else(|| UnknownReport(name.to_string()))
    }

    /// Resolves several names at once, failing on the first unknown one.
    pub fn resolve_all<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Vec<ReportHandle>, UnknownReport> {
        names.into_iter().map(|name| self.resolve(name)).collect()
    }

    /// Registered kinds in menu order.
    pub fn kinds(&self) -> Vec<ReportKind> {
        ReportKind::ALL
            .into_iter()
            .filter(|kind| self.handlers.contains_key(kind))
            .collect()
    }
}

fn tagged(mut rows: Vec<Row>, key: &str, value: &str) -> Vec<Row> {
    for row in &mut rows {
        row.insert(key.to_string(), Value::String(value.to_string()));
    }
    rows
}

fn stocks<'a>(
    client: &'a WbClient,
    token: &'a ApiToken,
    _params: &'a ReportParams,
) -> BoxFuture<'a, WbResult<Vec<Row>>> {
    Box::pin(async move {
        client
            .reports()
            .warehouse_remains(token, &WarehouseRemainsParams::default())
            .await
    })
}

fn marking<'a>(
    client: &'a WbClient,
    token: &'a ApiToken,
    params: &'a ReportParams,
) -> BoxFuture<'a, WbResult<Vec<Row>>> {
    Box::pin(async move { client.reports().goods_labeling(token, &params.range()).await })
}

fn withholdings<'a>(
    client: &'a WbClient,
    token: &'a ApiToken,
    params: &'a ReportParams,
) -> BoxFuture<'a, WbResult<Vec<Row>>> {
    Box::pin(async move {
        let reports = client.reports();
        let range = params.range();
        let mut rows = tagged(
            reports.antifraud_details(token, &range).await?,
            "withholdingType",
            "antifraud",
        );
        rows.extend(tagged(
            reports.incorrect_attachments(token, &range).await?,
            "withholdingType",
            "incorrect-attachments",
        ));
        Ok(rows)
    })
}

fn paid_acceptance<'a>(
    client: &'a WbClient,
    token: &'a ApiToken,
    params: &'a ReportParams,
) -> BoxFuture<'a, WbResult<Vec<Row>>> {
    Box::pin(async move { client.reports().paid_acceptance(token, &params.range()).await })
}

fn paid_storage<'a>(
    client: &'a WbClient,
    token: &'a ApiToken,
    params: &'a ReportParams,
) -> BoxFuture<'a, WbResult<Vec<Row>>> {
    Box::pin(async move { client.reports().paid_storage(token, &params.range()).await })
}

fn sales_by_regions<'a>(
    client: &'a WbClient,
    token: &'a ApiToken,
    params: &'a ReportParams,
) -> BoxFuture<'a, WbResult<Vec<Row>>> {
    Box::pin(async move { client.reports().region_sale(token, &params.range()).await })
}

fn brand_share<'a>(
    client: &'a WbClient,
    token: &'a ApiToken,
    params: &'a ReportParams,
) -> BoxFuture<'a, WbResult<Vec<Row>>> {
    Box::pin(async move {
        client
            .reports()
            .brand_share(token, &params.range(), &BrandShareFilter::default())
            .await
    })
}

fn hidden_goods<'a>(
    client: &'a WbClient,
    token: &'a ApiToken,
    _params: &'a ReportParams,
) -> BoxFuture<'a, WbResult<Vec<Row>>> {
    Box::pin(async move { client.reports().banned_products(token).await })
}

fn returns_transfers<'a>(
    client: &'a WbClient,
    token: &'a ApiToken,
    params: &'a ReportParams,
) -> BoxFuture<'a, WbResult<Vec<Row>>> {
    Box::pin(async move { client.reports().goods_return(token, &params.range()).await })
}
