//! Response fixture files.
//!
//! A fixture is a small TOML document describing one canned response:
//!
//! ```toml
//! status = 200
//! body = "hello world"
//! chunks = 3
//! delay = "250ms"
//!
//! [headers]
//! Content-Type = "text/plain"
//! ```
//!
//! or a transport error:
//!
//! ```toml
//! error = "The request timed out."
//! error_code = -1001
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use mockwire_delivery::{HeaderMap, ResponseSpec, TransportError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    pub status: Option<u16>,
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<String>,
    pub chunks: Option<usize>,
    pub delay: Option<String>,
    pub error: Option<String>,
    pub error_code: Option<i64>,
}

/// A fixture that parses as TOML but does not describe a response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FixtureError {
    #[error("fixture sets both `error` and `status`")]
    ErrorWithStatus,

    #[error("fixture sets `{0}` together with `error`")]
    ErrorWithField(&'static str),

    #[error("fixture needs either `status` or `error`")]
    MissingStatus,

    #[error("invalid duration {0:?} (expected e.g. \"250ms\" or \"2s\")")]
    InvalidDuration(String),
}

impl Fixture {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing fixture {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Build the response this fixture describes.
    pub fn to_spec(&self) -> Result<ResponseSpec, FixtureError> {
        if let Some(message) = &self.error {
            if self.status.is_some() {
                return Err(FixtureError::ErrorWithStatus);
            }
            for (name, set) in [
                ("headers", self.headers.is_some()),
                ("body", self.body.is_some()),
                ("chunks", self.chunks.is_some()),
                ("delay", self.delay.is_some()),
            ] {
                if set {
                    return Err(FixtureError::ErrorWithField(name));
                }
            }
            let error = match self.error_code {
                Some(code) => TransportError::with_code(code, message.as_str()),
                None => TransportError::new(message.as_str()),
            };
            return Ok(ResponseSpec::error(error));
        }

        let status = self.status.ok_or(FixtureError::MissingStatus)?;
        let headers: HeaderMap = self.headers.iter().flatten().collect();
        let body = self.body.clone().unwrap_or_default();
        let delay = match &self.delay {
            Some(s) => parse_duration(s)?,
            None => Duration::ZERO,
        };

        Ok(ResponseSpec::chunked_with_delay(
            status,
            headers,
            body,
            self.chunks.unwrap_or(0),
            delay,
        ))
    }
}

/// Parse `"<n>ms"` or `"<n>s"`.
pub fn parse_duration(s: &str) -> Result<Duration, FixtureError> {
    let trimmed = s.trim();
    let invalid = || FixtureError::InvalidDuration(s.to_string());
    if let Some(ms) = trimmed.strip_suffix("ms") {
        ms.trim().parse::<u64>().map(Duration::from_millis).map_err(|_| invalid())
    } else if let Some(secs) = trimmed.strip_suffix('s') {
        secs.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| invalid())
    } else {
        Err(invalid())
    }
}
