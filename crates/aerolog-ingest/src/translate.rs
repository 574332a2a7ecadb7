// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Best-effort text transliteration.
//!
//! Bucket naming asks this collaborator to turn non-ASCII path components
//! into ASCII-safe text. The contract is strictly best-effort: every
//! failure mode (no endpoint configured, timeout, bad status, malformed
//! body) is recoverable and the caller falls back to the original text.

use std::time::Duration;

use thiserror::Error;

/// Transliteration failures. Never fatal for the caller.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// No translation endpoint is configured.
    #[error("translation service unavailable")]
    Unavailable,

    #[error("translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("translation service returned status {0}")]
    Status(u16),

    #[error("malformed translation response")]
    MalformedResponse,
}

/// Turns arbitrary text into an ASCII-safe approximation.
pub trait Transliterate {
    fn transliterate(&self, text: &str) -> Result<String, TranslateError>;
}

/// The pure fallback: reports the service as unavailable, which makes the
/// caller keep the original text.
pub struct NoTranslation;

impl Transliterate for NoTranslation {
    fn transliterate(&self, _text: &str) -> Result<String, TranslateError> {
        Err(TranslateError::Unavailable)
    }
}

/// HTTP translation client (LibreTranslate-style JSON API).
pub struct HttpTranslator {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpTranslator {
    /// Request timeout. Bucket naming must not stall on a slow service.
    const TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(url: impl Into<String>) -> Result<Self, TranslateError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Transliterate for HttpTranslator {
    fn transliterate(&self, text: &str) -> Result<String, TranslateError> {
        let body = serde_json::json!({
            "q": text,
            "source": "auto",
            "target": "en",
            "format": "text",
        });

        let resp = self.client.post(&self.url).json(&body).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }

        let value: serde_json::Value = resp.json()?;
        parse_translation(&value)
    }
}

/// Extract the translated text from a response body.
fn parse_translation(value: &serde_json::Value) -> Result<String, TranslateError> {
    value
        .get("translatedText")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or(TranslateError::MalformedResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_translation_reports_unavailable() {
        let err = NoTranslation.transliterate("ελληνικά").expect_err("unavailable");
        assert!(matches!(err, TranslateError::Unavailable));
    }

    #[test]
    fn test_parse_translation_extracts_text() {
        let body = json!({"translatedText": "greek"});
        assert_eq!(parse_translation(&body).expect("parse"), "greek");
    }

    #[test]
    fn test_parse_translation_rejects_malformed_body() {
        let err = parse_translation(&json!({"detail": "boom"})).expect_err("malformed");
        assert!(matches!(err, TranslateError::MalformedResponse));

        let err = parse_translation(&json!({"translatedText": 7})).expect_err("wrong type");
        assert!(matches!(err, TranslateError::MalformedResponse));
    }
}
