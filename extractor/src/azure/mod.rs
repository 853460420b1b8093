//! Minimal Azure Storage REST client shared by the queue and blob backends.
//!
//! Requests are authorized with Shared Key: every request carries `x-ms-date`
//! and `x-ms-version` and is signed with the account key.
mod account;
mod shared_key;

pub use account::StorageAccount;
pub use shared_key::SharedKeyClient;

use reqwest::StatusCode;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum AzureError {
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),
    #[error("invalid account key: {0}")]
    InvalidAccountKey(#[from] base64::DecodeError),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("storage service returned {status} ({code})")]
    Status { status: StatusCode, code: String },
    #[error("could not parse response: {0}")]
    Xml(#[from] quick_xml::DeError),
}

impl AzureError {
    /// Builds a status error from a response, keeping the service error code.
    pub fn from_response(response: &reqwest::Response) -> Self {
        AzureError::Status {
            status: response.status(),
            code: error_code(response).unwrap_or("unknown").to_string(),
        }
    }
}

pub(crate) fn error_code(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
}

/// Appends path segments to a service endpoint, which may itself carry a
/// path (emulator endpoints include the account name).
pub(crate) fn append_segments(base: &Url, segments: &[&str]) -> Result<Url, AzureError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AzureError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
