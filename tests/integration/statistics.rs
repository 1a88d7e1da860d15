//! Sales chunks followed by their change-date cursor.

use super::*;
use chrono::NaiveDate;
use integrations_wb::services::DEFAULT_MAX_CHUNKS;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::query_param;

#[tokio::test]
async fn test_sales_follow_last_change_date() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/supplier/sales", "GET")
        .and(query_param("dateFrom", "2024-01-01"))
        .and(query_param("flag", "0"))
        .respond_with(success_response(json!([
            {"saleID": "S1", "lastChangeDate": "2024-01-02T10:00:00"},
            {"saleID": "S2", "lastChangeDate": "2024-01-03T08:30:00"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mock_with_auth("/api/v1/supplier/sales", "GET")
        .and(query_param("dateFrom", "2024-01-03T08:30:00"))
        .respond_with(success_response(json!([
            {"saleID": "R1", "lastChangeDate": "2024-01-04T12:00:00"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mock_with_auth("/api/v1/supplier/sales", "GET")
        .and(query_param("dateFrom", "2024-01-04T12:00:00"))
        .respond_with(success_response(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rows = client
        .statistics()
        .sales(
            &token(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            DEFAULT_MAX_CHUNKS,
        )
        .await
        .unwrap();

    let ids: Vec<_> = rows.iter().map(|row| row["saleID"].clone()).collect();
    assert_eq!(ids, vec![json!("S1"), json!("S2"), json!("R1")]);
}

#[tokio::test]
async fn test_sales_keep_rows_when_a_later_chunk_fails() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/supplier/sales", "GET")
        .and(query_param("dateFrom", "2024-01-01"))
        .respond_with(success_response(json!([
            {"saleID": "S1", "lastChangeDate": "2024-01-02T10:00:00"}
        ])))
        .mount(&server)
        .await;
    mock_with_auth("/api/v1/supplier/sales", "GET")
        .and(query_param("dateFrom", "2024-01-02T10:00:00"))
        .respond_with(wiremock::ResponseTemplate::new(400).set_body_string("bad cursor"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rows = client
        .statistics()
        .sales(&token(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 5)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
}
