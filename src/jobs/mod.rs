//! Asynchronous report jobs: create, poll status, download.
//!
//! Several WB reports are generated upstream in the background. The caller
//! creates a task, polls its status until a terminal value, then downloads
//! the result. [`run_job`] drives that state machine for any report family
//! given its three calls.

use crate::client::BinaryResponse;
use crate::envelope::{extract_items, extract_status, extract_task_id, into_rows, unwrap_envelope};
use crate::errors::{shorten, WbError, WbResult};
use crate::observability::TracingHooks;
use crate::spreadsheet::parse_spreadsheet;
use crate::types::Row;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::info;

/// Upstream statuses meaning the report is ready.
pub const DONE_STATUSES: &[&str] = &["done", "ready", "finished", "success"];

/// Upstream statuses meaning the report will never be ready.
pub const FAILED_STATUSES: &[&str] = &["failed", "error", "cancel", "canceled"];

const SPREADSHEET_TYPES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/vnd.ms-excel.sheet.binary.macroenabled.12",
    "application/vnd.ms-excel.sheet.macroenabled.12",
    "application/vnd.oasis.opendocument.spreadsheet",
];

const SPREADSHEET_EXTENSIONS: &[&str] = &[".xlsx", ".xlsm", ".xls", ".xlsb", ".ods"];

/// Lifecycle of a report job. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// The task id was received.
    Created,
    /// Upstream is still generating the report.
    Pending,
    /// The report can be downloaded.
    Done,
    /// Upstream gave up on the report.
    Failed,
}

impl JobStatus {
    /// Classifies a lower-cased upstream status string.
    pub fn from_upstream(status: &str) -> Self {
        if DONE_STATUSES.contains(&status) {
            Self::Done
        } else if FAILED_STATUSES.contains(&status) {
            Self::Failed
        } else {
            Self::Pending
        }
    }

    /// Returns true once no further polling is needed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Pending => write!(f, "pending"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A report job being polled.
#[derive(Debug, Clone)]
pub struct ReportJob {
    task_id: String,
    status: JobStatus,
    upstream_status: String,
    started: Instant,
}

impl ReportJob {
    /// Starts tracking `task_id`.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: JobStatus::Created,
            upstream_status: String::new(),
            started: Instant::now(),
        }
    }

    /// Upstream task id.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Last status string seen upstream, lower-cased.
    pub fn upstream_status(&self) -> &str {
        &self.upstream_status
    }

    /// Time since the task was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Records a status poll. A terminal status is never left again.
    pub fn observe(&mut self, upstream: &str) -> JobStatus {
        if !self.status.is_terminal() {
            self.upstream_status = upstream.trim().to_lowercase();
            self.status = JobStatus::from_upstream(&self.upstream_status);
        }
        self.status
    }
}

/// Body of a finished report download.
#[derive(Debug, Clone)]
pub enum DownloadPayload {
    /// Decoded JSON.
    Json(Value),
    /// A file.
    Binary(BinaryResponse),
}

impl DownloadPayload {
    /// Converts the payload into rows.
    ///
    /// JSON arrays are rows as-is; JSON objects yield the list held under a
    /// known container key. Files are parsed as spreadsheets when their type
    /// or name says so, or as JSON when the body decodes as JSON.
    pub fn into_rows(self) -> WbResult<Vec<Row>> {
        match self {
            Self::Json(value) => Ok(json_rows(value)),
            Self::Binary(file) => binary_rows(file),
        }
    }
}

fn json_rows(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => into_rows(items),
        Value::Null => Vec::new(),
        other => into_rows(extract_items(&other)),
    }
}

fn is_json_type(content_type: &str) -> bool {
    content_type == "application/json" || content_type.ends_with("+json") || content_type == "text/json"
}

fn looks_like_spreadsheet(file: &BinaryResponse) -> bool {
    let by_type = file
        .content_type
        .as_deref()
        .map_or(false, |ct| SPREADSHEET_TYPES.contains(&ct));
    let by_name = file.filename.as_deref().map_or(false, |name| {
        let name = name.to_ascii_lowercase();
        SPREADSHEET_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
    });
    // zip (xlsx, ods) or OLE2 (xls) container
    let by_magic = file.bytes.starts_with(b"PK\x03\x04")
        || file.bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]);
    by_type || by_name || by_magic
}

fn binary_rows(file: BinaryResponse) -> WbResult<Vec<Row>> {
    if file.content_type.as_deref().map_or(false, is_json_type) {
        let value: Value = serde_json::from_slice(&file.bytes)
            .map_err(|e| WbError::malformed_payload(e, &String::from_utf8_lossy(&file.bytes)))?;
        return Ok(json_rows(unwrap_envelope(value)));
    }

    if looks_like_spreadsheet(&file) {
        return Ok(parse_spreadsheet(&file.bytes));
    }

    if let Ok(value) = serde_json::from_slice::<Value>(&file.bytes) {
        return Ok(json_rows(unwrap_envelope(value)));
    }

    Err(WbError::unsupported_format(format!(
        "cannot read report file (content type {}, file name {})",
        file.content_type.as_deref().unwrap_or("unknown"),
        file.filename.as_deref().unwrap_or("unknown"),
    )))
}

/// Runs a report job to completion and returns its rows.
///
/// `create` starts the job and returns the response holding the task id.
/// `status` is polled with the task id every `poll_interval` until the
/// status is terminal; if `poll_timeout` passes first the job fails with
/// `JobTimeout`. `download` fetches the finished report.
pub async fn run_job<C, CF, S, SF, D, DF>(
    create: C,
    mut status: S,
    download: D,
    poll_interval: Duration,
    poll_timeout: Duration,
) -> WbResult<Vec<Row>>
where
    C: FnOnce() -> CF,
    CF: Future<Output = WbResult<Value>>,
    S: FnMut(String) -> SF,
    SF: Future<Output = WbResult<Value>>,
    D: FnOnce(String) -> DF,
    DF: Future<Output = WbResult<DownloadPayload>>,
{
    let created = create().await?;
    let task_id = extract_task_id(&created).ok_or_else(|| {
        WbError::malformed(format!(
            "report job was not created, no task id in: {}",
            shorten(&created.to_string(), 500)
        ))
    })?;

    let mut job = ReportJob::new(task_id);
    info!(task_id = %job.task_id(), "Report job created");

    loop {
        let payload = status(job.task_id().to_string()).await?;
        let upstream = extract_status(&payload).unwrap_or_default();
        let state = job.observe(&upstream);
        TracingHooks::on_job_status(job.task_id(), job.upstream_status(), job.elapsed());

        match state {
            JobStatus::Done => break,
            JobStatus::Failed => {
                return Err(WbError::server(format!(
                    "report job {} ended with status {}",
                    job.task_id(),
                    job.upstream_status()
                )))
            }
            JobStatus::Created | JobStatus::Pending => {}
        }

        let elapsed = job.elapsed();
        if elapsed >= poll_timeout {
            return Err(WbError::job_timeout(format!(
                "report job {} not ready after {}s (last status: {})",
                job.task_id(),
                elapsed.as_secs(),
                if job.upstream_status().is_empty() {
                    "none"
                } else {
                    job.upstream_status()
                }
            )));
        }
        sleep(poll_interval.min(poll_timeout - elapsed)).await;
    }

    let rows = download(job.task_id().to_string()).await?.into_rows()?;
    info!(
        task_id = %job.task_id(),
        rows = rows.len(),
        elapsed_ms = job.elapsed().as_millis() as u64,
        "Report job downloaded"
    );
    Ok(rows)
}
