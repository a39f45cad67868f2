//! Check input and output types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::checker::error::CheckError;
use crate::checker::probe::PhaseTimings;

/// Body of a check request: `{"url": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    #[serde(rename = "url")]
    pub endpoint: String,
}

impl CheckRequest {
    /// Decode a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, CheckError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(CheckError::InvalidRequest("please send a request body".into()));
        }
        serde_json::from_slice(body).map_err(|e| CheckError::InvalidRequest(e.to_string()))
    }

    /// Validate the endpoint into a checkable target.
    pub fn target(&self) -> Result<Target, CheckError> {
        Target::parse(&self.endpoint)
    }
}

/// A validated check target.
///
/// Keeps the caller's string verbatim next to the parsed form, since the
/// result echoes the former and redirect detection compares against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    link: String,
    url: Url,
}

impl Target {
    pub fn parse(link: &str) -> Result<Self, CheckError> {
        let url = Url::parse(link).map_err(|e| CheckError::InvalidUrl {
            url: link.to_string(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(CheckError::UnsupportedScheme(other.to_string())),
        }
        if url.host().is_none() {
            return Err(CheckError::InvalidUrl {
                url: link.to_string(),
                reason: "missing host".into(),
            });
        }
        Ok(Self {
            link: link.to_string(),
            url,
        })
    }

    /// The URL string exactly as requested.
    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Response headers grouped by name.
pub type HeaderMap = BTreeMap<String, Vec<String>>;

/// Outcome of one check, serialized as the response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// Requested URL, echoed verbatim.
    #[serde(rename = "Link")]
    pub link: String,

    /// Terminal URL when it differs from `link`, else empty.
    #[serde(rename = "RedirectURL")]
    pub redirect_url: String,

    /// Final status code; 0 when the request did not complete.
    #[serde(rename = "StatusCode")]
    pub status_code: u16,

    /// Headers of a failure-classified response.
    #[serde(rename = "Headers")]
    pub headers: Option<HeaderMap>,

    /// Raw dump of a failure-classified response.
    #[serde(rename = "Dump")]
    pub dump: String,

    #[serde(rename = "ResponseTime")]
    pub response_time_millis: u64,

    #[serde(rename = "Timings", skip_serializing_if = "Option::is_none")]
    pub timings: Option<PhaseTimings>,

    /// Transport failure, if any.
    #[serde(rename = "Error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    /// Empty result for a target, before any network activity.
    pub fn for_link(link: &str) -> Self {
        Self {
            link: link.to_string(),
            ..Self::default()
        }
    }
}
