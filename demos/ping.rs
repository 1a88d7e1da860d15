//! Token Diagnostics Example
//!
//! Checks what a WB API token can reach, then prints its balance and a
//! short storage report.
//!
//! ```bash
//! WB_API_TOKEN=eyJ... RUST_LOG=integrations_wb=debug cargo run --example ping
//! ```

use integrations_wb::{
    ApiToken, InMemoryCache, ReportKind, ReportParams, ReportRegistry, WbClient, WbConfig,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let token = ApiToken::sanitize(&std::env::var("WB_API_TOKEN")?)?;
    let client = WbClient::new(WbConfig::from_env()?, Arc::new(InMemoryCache::new()))?;

    let report = client.diagnostics().ping(&token).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.all_ok() {
        return Ok(());
    }

    let balance = client.finance().account_balance_cached(&token).await?;
    println!(
        "Balance: {:.2} {} ({:.2} available)",
        balance.current, balance.currency, balance.for_withdraw
    );

    let registry = ReportRegistry::standard();
    let storage = registry.resolve(ReportKind::PaidStorage.as_str())?;
    let rows = storage
        .run(&client, &token, &ReportParams::last_days(7))
        .await?;
    println!("{}: {} rows", storage.kind(), rows.len());

    Ok(())
}
