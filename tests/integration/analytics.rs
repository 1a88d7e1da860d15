//! nm-report paging, search reports and rate limiting.

use super::*;
use integrations_wb::types::{NmReportDetailRequest, NmReportHistoryRequest, SearchReportRequest};
use integrations_wb::auth::fingerprint;
use integrations_wb::mocks::{CacheOp, RecordingCache};
use integrations_wb::{DateRange, EndpointFamily, RateLimitConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use wiremock::matchers::body_partial_json;

fn detail_page(page: u32, cards: serde_json::Value, is_next: bool) -> ResponseTemplate {
    success_response(json!({
        "data": {"page": page, "isNextPage": is_next, "cards": cards}
    }))
}

#[tokio::test]
async fn test_nm_report_detail_collects_every_page() {
    let server = setup_mock_server().await;

    for (page, cards) in [(1, json!([{"nmID": 1}, {"nmID": 2}])), (2, json!([{"nmID": 3}]))] {
        mock_with_auth("/api/v2/nm-report/detail", "POST")
            .and(body_partial_json(json!({"page": page})))
            .respond_with(detail_page(page, cards, true))
            .expect(1)
            .mount(&server)
            .await;
    }
    mock_with_auth("/api/v2/nm-report/detail", "POST")
        .and(body_partial_json(json!({"page": 3})))
        .respond_with(detail_page(3, json!([]), false))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let request = NmReportDetailRequest::new(DateRange::last_days(7));
    let cards = client
        .analytics()
        .nm_report_detail_all(&token(), &request, 20)
        .await
        .unwrap();

    let ids: Vec<_> = cards.iter().map(|card| card["nmID"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn test_nm_report_detail_stops_at_max_pages() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v2/nm-report/detail", "POST")
        .respond_with(detail_page(1, json!([{"nmID": 9}]), true))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let request = NmReportDetailRequest::new(DateRange::last_days(7));
    let cards = client
        .analytics()
        .nm_report_detail_all(&token(), &request, 3)
        .await
        .unwrap();

    assert_eq!(cards.len(), 3);
}

#[tokio::test]
async fn test_nm_report_detail_body_shape() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v2/nm-report/detail", "POST")
        .and(body_partial_json(json!({
            "nmIDs": [111, 222],
            "timezone": "Europe/Moscow",
            "orderBy": {"field": "openCard", "sort": "desc"},
            "page": 1
        })))
        .respond_with(detail_page(1, json!([{"nmID": 111}]), false))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let request = NmReportDetailRequest::new(DateRange::last_days(7)).nm_ids(vec![111, 222]);
    let page = client
        .analytics()
        .nm_report_detail(&token(), &request)
        .await
        .unwrap();

    assert_eq!(page["cards"][0]["nmID"], json!(111));
}

#[tokio::test]
async fn test_nm_report_history_rows() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v2/nm-report/detail/history", "POST")
        .respond_with(success_response(json!({
            "data": [
                {"nmID": 111, "history": [{"dt": "2024-05-01", "openCardCount": 10}]},
                {"nmID": 222, "history": []}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let request = NmReportHistoryRequest::new(vec![111, 222], DateRange::last_days(7));
    let rows = client
        .analytics()
        .nm_report_history(&token(), &request)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["nmID"], json!(222));
}

#[tokio::test]
async fn test_search_report_is_returned_as_is() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v2/search-report/report", "POST")
        .and(body_partial_json(json!({"includeSubstitutedSKUs": true})))
        .respond_with(success_response(json!({
            "data": {"commonInfo": {"supplierRating": {"current": 4.8}}, "groups": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let report = client
        .analytics()
        .search_report(&token(), &SearchReportRequest::new(DateRange::last_days(7)))
        .await
        .unwrap();

    assert_eq!(report["commonInfo"]["supplierRating"]["current"], json!(4.8));
}

#[tokio::test]
async fn test_calls_of_one_family_are_spaced() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v2/nm-report/detail", "POST")
        .respond_with(detail_page(1, json!([]), false))
        .expect(2)
        .mount(&server)
        .await;

    let client = WbClient::builder()
        .base_url(server.uri())
        .rate_limit(RateLimitConfig {
            enabled: true,
            jitter: Duration::ZERO,
            intervals: HashMap::from([(EndpointFamily::NmReport, Duration::from_millis(300))]),
        })
        .build()
        .unwrap();

    let token = token();
    let request = NmReportDetailRequest::new(DateRange::last_days(7));
    let started = Instant::now();
    client.analytics().nm_report_detail(&token, &request).await.unwrap();
    client.analytics().nm_report_detail(&token, &request).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(290));
    assert_eq!(client.metrics().snapshot().requests_rate_limited, 1);
}

#[tokio::test]
async fn test_rate_limit_ticket_is_keyed_by_fingerprint() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v2/nm-report/detail", "POST")
        .respond_with(detail_page(1, json!([]), false))
        .expect(1)
        .mount(&server)
        .await;

    let cache = RecordingCache::new();
    let client = WbClient::builder()
        .base_url(server.uri())
        .rate_limit(RateLimitConfig {
            enabled: true,
            jitter: Duration::ZERO,
            intervals: HashMap::from([(EndpointFamily::NmReport, Duration::from_millis(300))]),
        })
        .cache(Arc::new(cache.clone()))
        .build()
        .unwrap();

    let request = NmReportDetailRequest::new(DateRange::last_days(7));
    client.analytics().nm_report_detail(&token(), &request).await.unwrap();

    let key = format!("wb:rl:{}:nm-report", fingerprint(TEST_TOKEN));
    let ops = cache.operations();
    assert!(ops.contains(&CacheOp::Get(key.clone())));
    assert!(ops.contains(&CacheOp::SetEx(key, Duration::from_millis(1300))));
    assert!(cache.written_keys().iter().all(|k| !k.contains(TEST_TOKEN)));
    assert!(ops.iter().all(|op| !format!("{:?}", op).contains(TEST_TOKEN)));
}
