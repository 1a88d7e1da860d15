//! Integration tests using WireMock
//!
//! Every test runs the client against a local mock server standing in for
//! all four WB hosts, so requests, retries, report jobs and normalization
//! are exercised over real HTTP.

mod analytics;
mod diagnostics;
mod finance;
mod reports;
mod statistics;

use integrations_wb::{ApiToken, PollConfig, RetryConfig, SharedCache, WbClient};
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A token shaped like the JWTs WB issues.
pub const TEST_TOKEN: &str = "eyJhbGciOiJFUzI1NiJ9.eyJlbnQiOjF9.c2lnbmF0dXJl";

/// Helper to start a mock server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// The test token, parsed.
pub fn token() -> ApiToken {
    ApiToken::sanitize(TEST_TOKEN).expect("test token is valid")
}

/// A client pointed at `server` with fast retries, no throttling and
/// quick report polling.
pub fn test_client(server: &MockServer) -> WbClient {
    client_builder(server).build().expect("client builds")
}

/// Same as [`test_client`] over a caller-provided cache.
pub fn test_client_with_cache(server: &MockServer, cache: Arc<dyn SharedCache>) -> WbClient {
    client_builder(server)
        .cache(cache)
        .build()
        .expect("client builds")
}

fn client_builder(server: &MockServer) -> integrations_wb::WbClientBuilder {
    WbClient::builder()
        .base_url(server.uri())
        .retry(RetryConfig {
            base_backoff: Duration::from_millis(10),
            ..Default::default()
        })
        .no_rate_limit()
        .poll(PollConfig {
            interval: Duration::from_millis(20),
            timeout: Duration::from_secs(2),
        })
}

/// Helper to create a mock expecting the raw token
pub fn mock_with_auth(path_matcher: &str, method_matcher: &str) -> wiremock::MockBuilder {
    Mock::given(method(method_matcher))
        .and(path(path_matcher))
        .and(header("Authorization", TEST_TOKEN))
}

/// Helper to create success response templates
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Builds a one-sheet xlsx workbook holding `rows` as inline strings.
pub fn build_xlsx(rows: &[&[&str]]) -> Vec<u8> {
    let mut sheet = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            sheet.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                (b'A' + c as u8) as char,
                r + 1,
                value
            ));
        }
        sheet.push_str("</row>");
    }

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
                sheet
            ),
        ),
    ];

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        zip.start_file(name, zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
