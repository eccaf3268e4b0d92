//! Error types for the endpoint prober
//!
//! A `ProbeError` never leaves the probe that produced it; it is logged and
//! turned into an unreachable verdict for that one record.

use thiserror::Error;

/// Errors that can occur while probing one endpoint
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP request error not covered by a more specific variant
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Request or read timeout
    #[error("Request timeout")]
    Timeout,

    /// Connection could not be established (DNS, refused, TLS handshake)
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Redirect cap reached
    #[error("Too many redirects")]
    TooManyRedirects,

    /// Body could not be read or decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// URL rejected by the HTTP client
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_redirect() {
            Self::TooManyRedirects
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

impl ProbeError {
    /// Short machine-friendly label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Timeout => "timeout",
            Self::Connect(_) => "connect",
            Self::TooManyRedirects => "redirects",
            Self::Decode(_) => "decode",
            Self::InvalidUrl(_) => "invalid_url",
        }
    }
}
