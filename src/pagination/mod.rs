//! Multi-page aggregation for WB analytics and statistics responses.
//!
//! Two cursor styles exist upstream: a page number (nm-report detail) and a
//! high-water mark taken from the last item of a chunk (sales statistics).
//! Both aggregators are bounded by a page ceiling and keep whatever was
//! collected when a later call fails.

use crate::envelope::extract_items;
use crate::errors::WbResult;
use crate::observability::TracingHooks;
use serde_json::Value;
use std::future::Future;
use tracing::warn;

/// Why an aggregation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The page ceiling was reached.
    MaxPages,
    /// A page had no items.
    EmptyPage,
    /// Upstream reported the last page.
    LastPage,
    /// The cursor did not advance.
    CursorStalled,
    /// A call after the first one failed.
    Failed,
}

impl StopReason {
    /// Name used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxPages => "max_pages",
            Self::EmptyPage => "empty_page",
            Self::LastPage => "last_page",
            Self::CursorStalled => "cursor_stalled",
            Self::Failed => "failed",
        }
    }
}

/// Items collected by an aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated<T> {
    /// Items in upstream order.
    pub items: Vec<T>,
    /// Number of calls that returned items or ended the run.
    pub pages: u32,
    /// What ended the run.
    pub stop: StopReason,
}

impl<T> Aggregated<T> {
    fn finish(items: Vec<T>, pages: u32, stop: StopReason) -> Self {
        TracingHooks::on_aggregation_stop(stop.as_str(), pages, items.len());
        Self { items, pages, stop }
    }

    /// Consumes the result, keeping only the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

fn is_last_page(payload: &Value) -> bool {
    matches!(payload.get("isNextPage"), Some(Value::Bool(false)))
}

/// Fetches pages `start_page, start_page + 1, ...` and concatenates their items.
///
/// `fetch` receives the page number and returns the decoded page. An error
/// on the first page is returned; a later error ends the run with the pages
/// collected so far. At most `max_pages` calls are made (`0` counts as `1`).
pub async fn aggregate_pages<F, Fut>(
    mut fetch: F,
    start_page: u32,
    max_pages: u32,
) -> WbResult<Aggregated<Value>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = WbResult<Value>>,
{
    let max_pages = max_pages.max(1);
    let mut page = start_page.max(1);

    let first = fetch(page).await?;
    let mut items = extract_items(&first);
    let mut fetched = 1;

    if items.is_empty() {
        return Ok(Aggregated::finish(items, fetched, StopReason::EmptyPage));
    }
    if is_last_page(&first) {
        return Ok(Aggregated::finish(items, fetched, StopReason::LastPage));
    }

    while fetched < max_pages {
        let Some(next) = page.checked_add(1) else {
            return Ok(Aggregated::finish(items, fetched, StopReason::LastPage));
        };
        page = next;
        let payload = match fetch(page).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(page = page, error = %e, "Page fetch failed, keeping collected items");
                return Ok(Aggregated::finish(items, fetched, StopReason::Failed));
            }
        };
        fetched += 1;

        let chunk = extract_items(&payload);
        if chunk.is_empty() {
            return Ok(Aggregated::finish(items, fetched, StopReason::EmptyPage));
        }
        items.extend(chunk);

        if is_last_page(&payload) {
            return Ok(Aggregated::finish(items, fetched, StopReason::LastPage));
        }
    }

    Ok(Aggregated::finish(items, fetched, StopReason::MaxPages))
}

/// Fetches chunks keyed by a high-water mark.
///
/// The first call uses `start`; each following call uses the `cursor_field`
/// of the last item of the previous chunk. Stops on an empty chunk, a
/// missing or non-advancing cursor, or after `max_chunks` calls. Error
/// handling matches [`aggregate_pages`].
pub async fn aggregate_by_cursor<F, Fut>(
    mut fetch: F,
    start: String,
    cursor_field: &str,
    max_chunks: u32,
) -> WbResult<Aggregated<Value>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = WbResult<Vec<Value>>>,
{
    let max_chunks = max_chunks.max(1);
    let mut cursor = start;
    let mut items: Vec<Value> = Vec::new();
    let mut fetched = 0;

    while fetched < max_chunks {
        let chunk = match fetch(cursor.clone()).await {
            Ok(chunk) => chunk,
            Err(e) if fetched == 0 => return Err(e),
            Err(e) => {
                warn!(cursor = %cursor, error = %e, "Chunk fetch failed, keeping collected items");
                return Ok(Aggregated::finish(items, fetched, StopReason::Failed));
            }
        };
        fetched += 1;

        if chunk.is_empty() {
            return Ok(Aggregated::finish(items, fetched, StopReason::EmptyPage));
        }

        let next = chunk
            .last()
            .and_then(|item| item.get(cursor_field))
            .and_then(Value::as_str)
            .map(str::to_string);
        items.extend(chunk);

        match next {
            Some(next) if next > cursor => cursor = next,
            _ => return Ok(Aggregated::finish(items, fetched, StopReason::CursorStalled)),
        }
    }

    Ok(Aggregated::finish(items, fetched, StopReason::MaxPages))
}
