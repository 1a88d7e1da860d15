//! Report jobs, single-call reports and the named registry.

use super::*;
use chrono::NaiveDate;
use integrations_wb::services::WarehouseRemainsParams;
use integrations_wb::{DateRange, ReportParams, ReportRegistry, WbErrorKind};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn may_2024() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
    )
}

async fn mount_task_status(server: &wiremock::MockServer, base: &str, task: &str, statuses: &[&str]) {
    let status_path = format!("{}/tasks/{}/status", base, task);
    let (last, pending) = statuses.split_last().unwrap();
    for status in pending {
        mock_with_auth(&status_path, "GET")
            .respond_with(success_response(json!({"data": {"id": task, "status": status}})))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
    mock_with_auth(&status_path, "GET")
        .respond_with(success_response(json!({"data": {"id": task, "status": last}})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_warehouse_remains_job_end_to_end() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/warehouse_remains", "GET")
        .and(query_param("locale", "ru"))
        .and(query_param("groupByNm", "true"))
        .respond_with(success_response(json!({"data": {"taskId": "abc"}})))
        .expect(1)
        .mount(&server)
        .await;

    mount_task_status(&server, "/api/v1/warehouse_remains", "abc", &["new", "processing", "done"]).await;

    mock_with_auth("/api/v1/warehouse_remains/tasks/abc/download", "GET")
        .respond_with(success_response(json!([
            {"nmId": 1001, "warehouseName": "Коледино", "quantity": 5},
            {"nmId": 1002, "warehouseName": "Казань", "quantity": 0}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rows = client
        .reports()
        .warehouse_remains(&token(), &WarehouseRemainsParams::default())
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["nmId"], json!(1001));
    assert_eq!(rows[1]["warehouseName"], json!("Казань"));
}

#[tokio::test]
async fn test_paid_storage_spreadsheet_download() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/paid_storage", "GET")
        .and(query_param("dateFrom", "2024-05-01"))
        .and(query_param("dateTo", "2024-05-31"))
        .respond_with(success_response(json!({"data": {"taskId": 42}})))
        .expect(1)
        .mount(&server)
        .await;

    mount_task_status(&server, "/api/v1/paid_storage", "42", &["done"]).await;

    let workbook = build_xlsx(&[
        &["date", "warehouse", "warehousePrice"],
        &["2024-05-01", "Коледино", "12.5"],
        &["2024-05-02", "Коледино", "13"],
    ]);
    mock_with_auth("/api/v1/paid_storage/tasks/42/download", "GET")
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"storage.xlsx\"")
                .set_body_raw(
                    workbook,
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rows = client.reports().paid_storage(&token(), &may_2024()).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["warehouse"], json!("Коледино"));
    assert_eq!(rows[0]["warehousePrice"], json!("12.5"));
}

#[tokio::test]
async fn test_failed_job_is_server_error() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/acceptance_report", "GET")
        .respond_with(success_response(json!({"data": {"taskId": "t-1"}})))
        .mount(&server)
        .await;
    mount_task_status(&server, "/api/v1/acceptance_report", "t-1", &["processing", "failed"]).await;

    let client = test_client(&server);
    let err = client
        .reports()
        .paid_acceptance(&token(), &may_2024())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), WbErrorKind::ServerError);
}

#[tokio::test]
async fn test_job_that_never_finishes_times_out() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/paid_storage", "GET")
        .respond_with(success_response(json!({"data": {"taskId": "slow"}})))
        .mount(&server)
        .await;
    mount_task_status(&server, "/api/v1/paid_storage", "slow", &["processing"]).await;

    let client = WbClient::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .poll(PollConfig {
            interval: Duration::from_millis(20),
            timeout: Duration::from_millis(150),
        })
        .build()
        .unwrap();

    let err = client
        .reports()
        .paid_storage(&token(), &may_2024())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), WbErrorKind::JobTimeout);
}

#[tokio::test]
async fn test_create_without_task_id_is_malformed() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/paid_storage", "GET")
        .respond_with(success_response(json!({"data": {"status": "accepted"}})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .reports()
        .paid_storage(&token(), &may_2024())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), WbErrorKind::MalformedResponse);
}

#[tokio::test]
async fn test_excise_report_reads_response_data() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/analytics/excise-report", "POST")
        .and(query_param("dateFrom", "2024-05-01"))
        .respond_with(success_response(json!({
            "response": {"data": [{"fiscal_doc_number": 7, "excise_short": "0104"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rows = client
        .reports()
        .excise_report(&token(), &may_2024(), &["RU".to_string()])
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["fiscal_doc_number"], json!(7));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, json!({"countries": ["RU"]}));
}

#[tokio::test]
async fn test_banned_products_are_tagged() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/analytics/banned-products/blocked", "GET")
        .and(query_param("sort", "nmId"))
        .respond_with(success_response(json!({"report": [{"nmId": 1, "reason": "copy"}]})))
        .mount(&server)
        .await;
    mock_with_auth("/api/v1/analytics/banned-products/shadowed", "GET")
        .respond_with(success_response(json!({"report": [{"nmId": 2}, {"nmId": 3}]})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rows = client.reports().banned_products(&token()).await.unwrap();

    let tags: Vec<_> = rows.iter().map(|row| row["banType"].clone()).collect();
    assert_eq!(tags, vec![json!("blocked"), json!("shadowed"), json!("shadowed")]);
}

#[tokio::test]
async fn test_registry_runs_named_report() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/analytics/region-sale"))
        .and(query_param("dateFrom", "2024-05-01"))
        .and(query_param("dateTo", "2024-05-31"))
        .respond_with(success_response(json!({
            "report": [{"regionName": "Москва", "saleItemInvoiceQty": 12}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let registry = ReportRegistry::standard();
    let handle = registry.resolve("get_report_sales_by_regions").unwrap();
    let params = ReportParams::new(
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
    );

    let rows = handle.run(&client, &token(), &params).await.unwrap();

    assert_eq!(rows[0]["regionName"], json!("Москва"));
}

#[tokio::test]
async fn test_registry_withholdings_merges_sources() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/analytics/antifraud-details"))
        .respond_with(success_response(json!({"details": [{"nmID": 1, "sum": 100}]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/analytics/incorrect-attachments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"report": [{"nmId": 2}]})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rows = ReportRegistry::standard()
        .resolve("withholdings")
        .unwrap()
        .run(&client, &token(), &ReportParams::last_days(7))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.contains_key("withholdingType")));
}
