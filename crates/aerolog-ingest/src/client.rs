// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote time-series store write contract.
//!
//! The store's query surface is someone else's problem; all this crate
//! needs is "submit this Line Protocol body". [`StoreClient`] is that
//! contract, and [`HttpStoreClient`] implements it against an InfluxDB
//! v2-style `/api/v2/write` endpoint. The client is only constructed when
//! remote mode is selected; there are no global availability flags.

use std::time::Duration;

use thiserror::Error;

/// Store write failures. All variants are considered retryable; the sink's
/// retry policy decides when to stop.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned status {code}: {body}")]
    Status { code: u16, body: String },
}

/// Submits encoded point batches to the store.
pub trait StoreClient {
    /// Write one Line Protocol body (newline-separated points).
    fn write_lines(&self, body: &str) -> Result<(), StoreError>;
}

/// HTTP client for an InfluxDB v2-style write endpoint.
///
/// Writes with microsecond precision; the Line Protocol encoder emits
/// microsecond timestamps to match.
pub struct HttpStoreClient {
    client: reqwest::blocking::Client,
    url: String,
    org: String,
    bucket: String,
    token: String,
}

impl HttpStoreClient {
    const TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a client for `{base_url}/api/v2/write`.
    ///
    /// `org` is passed through for compatibility with v2 deployments; v3
    /// servers ignore it.
    pub fn new(
        base_url: impl Into<String>,
        org: impl Into<String>,
        bucket: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/api/v2/write", base_url.into().trim_end_matches('/')),
            org: org.into(),
            bucket: bucket.into(),
            token: token.into(),
        })
    }
}

impl StoreClient for HttpStoreClient {
    fn write_lines(&self, body: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .post(&self.url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "us"),
            ])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body.to_string())
            .send()?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().unwrap_or_default();
            Err(StoreError::Status {
                code: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_url_is_normalized() {
        let client =
            HttpStoreClient::new("http://localhost:8181/", "mav-org", "telemetry", "token")
                .expect("client");
        assert_eq!(client.url, "http://localhost:8181/api/v2/write");
    }

    #[test]
    fn test_status_error_keeps_body() {
        let err = StoreError::Status {
            code: 503,
            body: "service overloaded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "store returned status 503: service overloaded"
        );
    }
}
