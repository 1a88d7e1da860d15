//! API token handling.
//!
//! WB expects the raw token in the `Authorization` header, without a
//! `Bearer` prefix. The token never appears in logs or cache keys; both use
//! its sha256 fingerprint instead.

use crate::errors::{WbError, WbResult};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;

/// A plaintext WB API token.
#[derive(Clone)]
pub struct ApiToken {
    secret: SecretString,
    fingerprint: String,
}

impl ApiToken {
    /// Wraps a token as-is.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let fingerprint = fingerprint(&token);
        Self {
            secret: SecretString::new(token),
            fingerprint,
        }
    }

    /// Cleans up a pasted token and checks that it looks like a JWT.
    ///
    /// Surrounding quotes and whitespace, a leading `Bearer ` and any
    /// whitespace or control characters inside are removed. The result must
    /// consist of three non-empty base64url segments.
    pub fn sanitize(raw: &str) -> WbResult<Self> {
        let mut token = raw.trim().trim_matches('"').trim_matches('\'');
        if let Some(prefix) = token.get(..7) {
            if prefix.eq_ignore_ascii_case("bearer ") {
                token = token[7..].trim();
            }
        }
        let token: String = token
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .collect();

        if token.is_empty() {
            return Err(WbError::unauthorized("WB API token is empty"));
        }
        if !looks_like_jwt(&token) {
            let preview: String = token.chars().take(10).collect();
            return Err(WbError::unauthorized(format!(
                "WB API token looks malformed (not a JWT): {}...",
                preview
            )));
        }

        Ok(Self::new(token))
    }

    /// Value for the `Authorization` header.
    pub(crate) fn header_value(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Hex sha256 of the token, safe to use in keys and logs.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Short fingerprint prefix for log lines.
    pub fn log_id(&self) -> &str {
        &self.fingerprint[..12]
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiToken")
            .field("fingerprint", &self.log_id())
            .finish()
    }
}

impl From<&str> for ApiToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for ApiToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// Hex-encoded sha256 of `token`.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn looks_like_jwt(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}
