//! WB API service implementations.

mod analytics;
mod common;
mod diagnostics;
mod finance;
mod reports;
mod statistics;

pub use analytics::*;
pub use common::*;
pub use diagnostics::*;
pub use finance::*;
pub use reports::*;
pub use statistics::*;

use crate::errors::{WbError, WbResult};
use serde::Serialize;
use serde_json::Value;

pub(crate) fn to_body<T: Serialize>(request: &T) -> WbResult<Value> {
    serde_json::to_value(request)
        .map_err(|e| WbError::client(format!("Failed to serialize request body: {}", e)).with_cause(e))
}
