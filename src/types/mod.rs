//! Core data types for the WB API.

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One report row keyed by column name.
pub type Row = Map<String, Value>;

/// Canonical account balance.
///
/// `total` and `available` mirror `current` and `for_withdraw` for callers
/// that still read the older names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Currency code, e.g. `RUB`.
    pub currency: String,
    /// Current balance.
    pub current: f64,
    /// Amount available for withdrawal.
    pub for_withdraw: f64,
    /// Alias of `current`.
    pub total: f64,
    /// Alias of `for_withdraw`.
    pub available: f64,
}

impl Balance {
    /// Builds a balance, filling in the aliases.
    pub fn new(currency: impl Into<String>, current: f64, for_withdraw: f64) -> Self {
        Self {
            currency: currency.into(),
            current,
            for_withdraw,
            total: current,
            available: for_withdraw,
        }
    }
}

/// Seller profile from the common API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerInfo {
    /// Legal name.
    #[serde(default)]
    pub name: Option<String>,
    /// Seller id.
    #[serde(default)]
    pub sid: Option<String>,
    /// Trade mark shown on the storefront.
    #[serde(default, rename = "tradeMark")]
    pub trade_mark: Option<String>,
    /// Fields this client does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Inclusive calendar date range for report endpoints (`YYYY-MM-DD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First day.
    pub from: NaiveDate,
    /// Last day.
    pub to: NaiveDate,
}

impl DateRange {
    /// Creates a range.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// The last `days` days up to and including today (UTC).
    pub fn last_days(days: i64) -> Self {
        let to = Utc::now().date_naive();
        Self {
            from: to - ChronoDuration::days(days),
            to,
        }
    }

    /// `from` as `YYYY-MM-DD`.
    pub fn start_date(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    /// `to` as `YYYY-MM-DD`.
    pub fn end_date(&self) -> String {
        self.to.format("%Y-%m-%d").to_string()
    }

    /// Detail reports want full timestamps: start of `from`, end of `to`.
    pub fn as_period(&self) -> Period {
        Period {
            begin: format!("{} 00:00:00", self.start_date()),
            end: format!("{} 23:59:59", self.end_date()),
        }
    }

    /// History reports want bare dates.
    pub fn as_date_period(&self) -> Period {
        Period {
            begin: self.start_date(),
            end: self.end_date(),
        }
    }
}

/// Period object of analytics request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Start of the period.
    pub begin: String,
    /// End of the period.
    pub end: String,
}

/// Sort order of nm-report detail cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Metric to sort by.
    pub field: String,
    /// `asc` or `desc`.
    pub sort: String,
}

impl Default for OrderBy {
    fn default() -> Self {
        Self {
            field: "openCard".to_string(),
            sort: "desc".to_string(),
        }
    }
}

/// Granularity of history reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationLevel {
    /// Per day.
    Day,
    /// Per week.
    Week,
    /// Per month.
    Month,
}

/// Default reporting timezone.
pub const DEFAULT_TIMEZONE: &str = "Europe/Moscow";

/// Body of `POST /api/v2/nm-report/detail`.
#[derive(Debug, Clone, Serialize)]
pub struct NmReportDetailRequest {
    /// Brand filter.
    #[serde(rename = "brandNames")]
    pub brand_names: Vec<String>,
    /// Subject filter.
    #[serde(rename = "objectIDs")]
    pub object_ids: Vec<u64>,
    /// Tag filter.
    #[serde(rename = "tagIDs")]
    pub tag_ids: Vec<u64>,
    /// Article filter.
    #[serde(rename = "nmIDs")]
    pub nm_ids: Vec<u64>,
    /// Reporting timezone.
    pub timezone: String,
    /// Reporting period.
    pub period: Period,
    /// Sort order.
    #[serde(rename = "orderBy")]
    pub order_by: OrderBy,
    /// One-based page number.
    pub page: u32,
}

impl NmReportDetailRequest {
    /// Unfiltered request for `range`, first page.
    pub fn new(range: DateRange) -> Self {
        Self {
            brand_names: Vec::new(),
            object_ids: Vec::new(),
            tag_ids: Vec::new(),
            nm_ids: Vec::new(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            period: range.as_period(),
            order_by: OrderBy::default(),
            page: 1,
        }
    }

    /// Restricts the report to the given articles.
    pub fn nm_ids(mut self, nm_ids: Vec<u64>) -> Self {
        self.nm_ids = nm_ids;
        self
    }

    /// Restricts the report to the given brands.
    pub fn brand_names(mut self, brands: Vec<String>) -> Self {
        self.brand_names = brands;
        self
    }

    /// Sets the timezone.
    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Sets the page to start from.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }
}

/// Body of `POST /api/v2/nm-report/detail/history`.
#[derive(Debug, Clone, Serialize)]
pub struct NmReportHistoryRequest {
    /// Articles to report on.
    #[serde(rename = "nmIDs")]
    pub nm_ids: Vec<u64>,
    /// Reporting period (dates).
    pub period: Period,
    /// Reporting timezone.
    pub timezone: String,
    /// Granularity.
    #[serde(rename = "aggregationLevel")]
    pub aggregation_level: AggregationLevel,
}

impl NmReportHistoryRequest {
    /// Daily history of `nm_ids` over `range`.
    pub fn new(nm_ids: Vec<u64>, range: DateRange) -> Self {
        Self {
            nm_ids,
            period: range.as_date_period(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            aggregation_level: AggregationLevel::Day,
        }
    }
}

/// Body of `POST /api/v2/nm-report/grouped/history`.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedHistoryRequest {
    /// Subject filter.
    #[serde(rename = "objectIDs")]
    pub object_ids: Vec<u64>,
    /// Brand filter.
    #[serde(rename = "brandNames")]
    pub brand_names: Vec<String>,
    /// Tag filter.
    #[serde(rename = "tagIDs")]
    pub tag_ids: Vec<u64>,
    /// Reporting period (dates).
    pub period: Period,
    /// Reporting timezone.
    pub timezone: String,
    /// Granularity.
    #[serde(rename = "aggregationLevel")]
    pub aggregation_level: AggregationLevel,
}

impl GroupedHistoryRequest {
    /// Daily history of all groups over `range`.
    pub fn new(range: DateRange) -> Self {
        Self {
            object_ids: Vec::new(),
            brand_names: Vec::new(),
            tag_ids: Vec::new(),
            period: range.as_date_period(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            aggregation_level: AggregationLevel::Day,
        }
    }
}

/// Date period of search reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPeriod {
    /// First day.
    pub start: String,
    /// Last day.
    pub end: String,
}

impl From<DateRange> for SearchPeriod {
    fn from(range: DateRange) -> Self {
        Self {
            start: range.start_date(),
            end: range.end_date(),
        }
    }
}

/// Sort order of search reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOrderBy {
    /// Metric to sort by.
    pub field: String,
    /// `asc` or `desc`.
    pub mode: String,
}

/// Body of `POST /api/v2/search-report/report`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReportRequest {
    /// Reporting period.
    pub current_period: SearchPeriod,
    /// Article filter.
    pub nm_ids: Vec<u64>,
    /// Subject filter.
    pub subject_ids: Vec<u64>,
    /// Brand filter.
    pub brand_names: Vec<String>,
    /// Tag filter.
    pub tag_ids: Vec<u64>,
    /// Sort order.
    pub order_by: SearchOrderBy,
    /// Position cluster (`all`, `firstHundred`, …).
    pub position_cluster: String,
    /// Include SKUs substituted by the storefront.
    #[serde(rename = "includeSubstitutedSKUs")]
    pub include_substituted_skus: bool,
    /// Include search queries.
    pub include_search_texts: bool,
    /// Page size.
    pub limit: u32,
    /// Offset of the first group.
    pub offset: u32,
}

impl SearchReportRequest {
    /// Report over `range` ordered by average position.
    pub fn new(range: DateRange) -> Self {
        Self {
            current_period: range.into(),
            nm_ids: Vec::new(),
            subject_ids: Vec::new(),
            brand_names: Vec::new(),
            tag_ids: Vec::new(),
            order_by: SearchOrderBy {
                field: "avgPosition".to_string(),
                mode: "asc".to_string(),
            },
            position_cluster: "all".to_string(),
            include_substituted_skus: true,
            include_search_texts: false,
            limit: 130,
            offset: 0,
        }
    }
}

/// Body of `POST /api/v2/search-report/product/search-texts`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTextsRequest {
    /// Reporting period.
    pub current_period: SearchPeriod,
    /// Articles to report on.
    pub nm_ids: Vec<u64>,
    /// Metric ranking the top queries.
    pub top_order_by: String,
    /// Sort order.
    pub order_by: SearchOrderBy,
    /// Number of queries per article.
    pub limit: u32,
}

impl SearchTextsRequest {
    /// Top queries of `nm_ids` by opened cards.
    pub fn new(nm_ids: Vec<u64>, range: DateRange) -> Self {
        Self {
            current_period: range.into(),
            nm_ids,
            top_order_by: "openCard".to_string(),
            order_by: SearchOrderBy {
                field: "avgPosition".to_string(),
                mode: "asc".to_string(),
            },
            limit: 30,
        }
    }
}

/// Outcome of probing one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCheck {
    /// The call succeeded.
    pub ok: bool,
    /// Wall-clock duration in milliseconds.
    pub ms: u64,
    /// Classified error message when the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of probing a token against the main endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingReport {
    /// Seller info probe.
    #[serde(rename = "seller-info")]
    pub seller_info: EndpointCheck,
    /// Live balance probe.
    #[serde(rename = "account-balance")]
    pub account_balance: EndpointCheck,
}

impl PingReport {
    /// Both probes succeeded.
    pub fn all_ok(&self) -> bool {
        self.seller_info.ok && self.account_balance.ok
    }
}
