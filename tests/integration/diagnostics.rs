//! Token ping across seller info and balance.

use super::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_ping_reports_each_endpoint() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/seller-info", "GET")
        .respond_with(success_response(json!({"name": "ИП Иванов", "sid": "s-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account/balance"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let report = client.diagnostics().ping(&token()).await;

    assert!(report.seller_info.ok);
    assert!(report.seller_info.error.is_none());
    assert!(!report.account_balance.ok);
    assert!(report
        .account_balance
        .error
        .as_deref()
        .unwrap()
        .contains("401"));
    assert!(!report.all_ok());

    let rendered = serde_json::to_value(&report).unwrap();
    assert_eq!(rendered["seller-info"]["ok"], json!(true));
    assert_eq!(rendered["account-balance"]["ok"], json!(false));
}

#[tokio::test]
async fn test_ping_bypasses_balance_cache() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/seller-info", "GET")
        .respond_with(success_response(json!({"name": "x"})))
        .mount(&server)
        .await;
    mock_with_auth("/api/v1/account/balance", "GET")
        .respond_with(success_response(json!({
            "currency": "RUB", "current": 1, "for_withdraw": 1
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let token = token();

    client.finance().account_balance_cached(&token).await.unwrap();
    let report = client.diagnostics().ping(&token).await;

    assert!(report.all_ok());
}
