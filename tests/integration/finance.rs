//! Account balance, its normalization and caching.

use super::*;
use integrations_wb::mocks::{CacheOp, FailingCache, RecordingCache};
use integrations_wb::services::FinanceService;
use integrations_wb::{Balance, WbErrorKind};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_balance_unwraps_data_envelope() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/account/balance", "GET")
        .respond_with(success_response(json!({
            "data": {"current": 100, "for_withdraw": 40, "currency": "RUB"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let balance = client.finance().account_balance(&token()).await.unwrap();

    assert_eq!(balance, Balance::new("RUB", 100.0, 40.0));
    assert_eq!(balance.total, 100.0);
    assert_eq!(balance.available, 40.0);
}

#[tokio::test]
async fn test_balance_accepts_legacy_field_names() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/account/balance", "GET")
        .respond_with(success_response(json!({
            "data": {"currency": "RUB", "currentBalance": "1520.75", "forWithdraw": 1000}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let balance = client.finance().account_balance(&token()).await.unwrap();

    assert_eq!(balance, Balance::new("RUB", 1520.75, 1000.0));
}

#[tokio::test]
async fn test_balance_missing_fields_lists_present_keys() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/account/balance", "GET")
        .respond_with(success_response(json!({"data": {"foo": 1, "bar": 2}})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.finance().account_balance(&token()).await.unwrap_err();

    assert_eq!(err.kind(), WbErrorKind::MalformedResponse);
    assert!(err.message().contains("bar, foo"));
}

#[tokio::test]
async fn test_cached_balance_hits_upstream_once() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/account/balance", "GET")
        .respond_with(success_response(json!({
            "currency": "RUB", "current": 7, "for_withdraw": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = RecordingCache::new();
    let client = test_client_with_cache(&server, Arc::new(cache.clone()));
    let token = token();

    let first = client.finance().account_balance_cached(&token).await.unwrap();
    let second = client.finance().account_balance_cached(&token).await.unwrap();

    assert_eq!(first, second);
    let key = FinanceService::balance_cache_key(&token);
    assert!(key.starts_with("wb:balance:"));
    assert!(cache
        .operations()
        .contains(&CacheOp::SetEx(key, Duration::from_secs(60))));
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/account/balance", "GET")
        .respond_with(success_response(json!({
            "currency": "RUB", "current": 7, "for_withdraw": 3
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let token = token();

    client.finance().account_balance_cached(&token).await.unwrap();
    client.finance().invalidate_balance(&token).await;
    client.finance().account_balance_cached(&token).await.unwrap();
}

#[tokio::test]
async fn test_cache_outage_falls_back_to_upstream() {
    let server = setup_mock_server().await;

    mock_with_auth("/api/v1/account/balance", "GET")
        .respond_with(success_response(json!({
            "currency": "RUB", "current": 7, "for_withdraw": 3
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client_with_cache(&server, Arc::new(FailingCache));
    let token = token();

    for _ in 0..2 {
        let balance = client.finance().account_balance_cached(&token).await.unwrap();
        assert_eq!(balance.current, 7.0);
    }
}
