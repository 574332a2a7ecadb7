// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Batching buffer for time-series points.
//!
//! Accumulates points and flushes either when the batch is full or
//! when the configured time interval has elapsed.

use std::time::{Duration, Instant};

use crate::influx::Point;

/// A batching buffer that collects points pending a remote write.
///
/// Points are accumulated until either:
/// - The buffer reaches `max_size` (size-based flush)
/// - The configured `flush_interval` has elapsed since the last flush (time-based flush)
pub struct BatchBuffer {
    points: Vec<Point>,
    max_size: usize,
    flush_interval: Duration,
    last_flush: Instant,
}

impl BatchBuffer {
    /// Create a new batch buffer.
    ///
    /// # Arguments
    /// - `max_size` - Maximum number of points before automatic flush
    /// - `flush_interval` - Maximum time between flushes
    pub fn new(max_size: usize, flush_interval: Duration) -> Self {
        Self {
            points: Vec::with_capacity(max_size),
            max_size,
            flush_interval,
            last_flush: Instant::now(),
        }
    }

    /// Add a point to the buffer.
    ///
    /// Returns `Some(batch)` if the buffer is now full and should be flushed,
    /// or `None` if there is still room.
    pub fn add(&mut self, point: Point) -> Option<Vec<Point>> {
        self.points.push(point);
        if self.points.len() >= self.max_size {
            Some(self.flush())
        } else {
            None
        }
    }

    /// Check if a time-based flush is due.
    pub fn should_flush(&self) -> bool {
        !self.points.is_empty() && self.last_flush.elapsed() >= self.flush_interval
    }

    /// Flush the buffer, returning all accumulated points and resetting the timer.
    pub fn flush(&mut self) -> Vec<Point> {
        self.last_flush = Instant::now();
        std::mem::take(&mut self.points)
    }

    /// Get the current number of buffered points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
