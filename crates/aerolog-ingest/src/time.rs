// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-file time base and timestamp normalization.
//!
//! Log records carry elapsed time in microseconds since file start
//! (`TimeUS`). To land writes in a sane absolute range, each file gets one
//! [`TimeBase`]: either taken from the decoder's clock metadata, or
//! anchored so that the first record maps to the current wall clock while
//! relative offsets are preserved.

use thiserror::Error;

/// Timestamp normalization errors.
#[derive(Debug, Error)]
pub enum TimeError {
    /// Normalization was attempted before a time base was established.
    /// Fatal for the current file only.
    #[error("no time base established for {0}")]
    MissingTimeBase(String),
}

/// Absolute-time anchor for one file.
#[derive(Debug, Clone)]
pub struct TimeBase {
    /// Identifies the file this base belongs to (used in diagnostics).
    pub file_id: String,
    /// Microseconds added to a record's elapsed time to get an absolute
    /// Unix-epoch timestamp. May be negative for anchors before the epoch.
    pub epoch_offset_us: i64,
}

impl TimeBase {
    /// Build a base from an absolute clock reported by the decoder.
    pub fn from_epoch_offset(file_id: impl Into<String>, epoch_offset_us: i64) -> Self {
        Self {
            file_id: file_id.into(),
            epoch_offset_us,
        }
    }

    /// Anchor the first observed elapsed time to the current wall clock.
    ///
    /// `normalize(first_elapsed_us)` then yields "now", and later records
    /// keep their relative offsets.
    pub fn anchored_to_wall_clock(file_id: impl Into<String>, first_elapsed_us: u64) -> Self {
        let now_us = chrono::Utc::now().timestamp_micros();
        Self {
            file_id: file_id.into(),
            epoch_offset_us: now_us - first_elapsed_us as i64,
        }
    }
}

/// Converts (time base, elapsed time) into absolute microsecond timestamps.
#[derive(Debug, Default)]
pub struct TimestampNormalizer {
    base: Option<TimeBase>,
    file_id: String,
}

impl TimestampNormalizer {
    /// Create a normalizer with no base yet; [`normalize`](Self::normalize)
    /// fails until [`set_base`](Self::set_base) is called.
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            base: None,
            file_id: file_id.into(),
        }
    }

    /// Create a normalizer with an established base.
    pub fn with_base(base: TimeBase) -> Self {
        let file_id = base.file_id.clone();
        Self {
            base: Some(base),
            file_id,
        }
    }

    /// Whether a time base has been established.
    pub fn has_base(&self) -> bool {
        self.base.is_some()
    }

    /// Establish the time base for this file.
    pub fn set_base(&mut self, base: TimeBase) {
        self.base = Some(base);
    }

    /// Convert elapsed microseconds into an absolute timestamp.
    ///
    /// Sums that would land before the epoch clamp to zero.
    pub fn normalize(&self, elapsed_us: u64) -> Result<u64, TimeError> {
        let base = self
            .base
            .as_ref()
            .ok_or_else(|| TimeError::MissingTimeBase(self.file_id.clone()))?;

        let ts = base.epoch_offset_us.saturating_add(elapsed_us as i64);
        Ok(ts.max(0) as u64)
    }
}
