// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Point sinks.
//!
//! A sink receives one file's points in decode order and either writes
//! them to a local `.lp` file ([`FileSink`]) or batches them into a remote
//! store through bounded-retry writes ([`RemoteSink`]). Both encode
//! through the same [`Point::to_line_protocol`], so file and remote output
//! agree on type, tag and field semantics.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::bucket::BucketName;
use crate::buffer::BatchBuffer;
use crate::client::{StoreClient, StoreError};
use crate::config::RetryPolicy;
use crate::influx::Point;

/// Sink failures. Fatal for the current file only.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store write failed after {retries} retries: {source}")]
    RetriesExhausted {
        retries: u32,
        #[source]
        source: StoreError,
    },
}

/// Per-file totals a sink reports when the stream ends.
#[derive(Debug, Clone, Default)]
pub struct SinkSummary {
    /// Points written (lines for a file sink, accepted points for remote).
    pub points_written: u64,
    /// Batches flushed (always 0 for a file sink).
    pub batches_flushed: u64,
}

/// Outcome of one remote batch flush.
#[derive(Debug, Clone)]
pub struct BatchWriteResult {
    pub succeeded: bool,
    pub attempted_points: usize,
    pub retries_used: u32,
}

/// Receives one file's point stream in decode order.
pub trait PointSink {
    fn write_point(&mut self, point: Point) -> Result<(), SinkError>;

    /// Flush whatever is pending and report totals.
    fn finish(&mut self) -> Result<SinkSummary, SinkError>;
}

/// Creates one sink per input file.
pub trait SinkFactory {
    fn create(&self, bucket: &BucketName) -> Result<Box<dyn PointSink>, SinkError>;
}

// ---------------------------------------------------------------------------
// File sink
// ---------------------------------------------------------------------------

/// Writes points as Line Protocol text, one line per point, to
/// `<output_dir>/<bucket>.lp`.
pub struct FileSink {
    writer: BufWriter<File>,
    lines_written: u64,
}

impl FileSink {
    /// Open (truncating) the output file for a bucket, creating the output
    /// directory if needed.
    pub fn create(output_dir: &Path, bucket: &BucketName) -> Result<Self, SinkError> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(format!("{}.lp", bucket));
        let file = File::create(&path)?;
        debug!("writing line protocol to {}", path.display());

        Ok(Self {
            writer: BufWriter::new(file),
            lines_written: 0,
        })
    }
}

impl PointSink for FileSink {
    fn write_point(&mut self, point: Point) -> Result<(), SinkError> {
        let line = point.to_line_protocol();
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.lines_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<SinkSummary, SinkError> {
        self.writer.flush()?;
        Ok(SinkSummary {
            points_written: self.lines_written,
            batches_flushed: 0,
        })
    }
}

/// Factory for per-file `.lp` sinks under one output directory.
pub struct FileSinkFactory {
    output_dir: std::path::PathBuf,
}

impl FileSinkFactory {
    pub fn new(output_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl SinkFactory for FileSinkFactory {
    fn create(&self, bucket: &BucketName) -> Result<Box<dyn PointSink>, SinkError> {
        Ok(Box::new(FileSink::create(&self.output_dir, bucket)?))
    }
}

// ---------------------------------------------------------------------------
// Remote sink
// ---------------------------------------------------------------------------

/// Observability hooks for remote batch writes.
///
/// Exactly one callback fires per flush attempt: `on_batch_success` when a
/// batch is accepted, `on_batch_retry` for each intermediate retry,
/// `on_batch_error` on the terminal failure of a batch. Side effects only;
/// not part of the data-correctness contract.
pub trait WriteObserver {
    fn on_batch_success(&self, _result: &BatchWriteResult) {}
    fn on_batch_retry(&self, _attempt: u32, _delay: Duration, _error: &StoreError) {}
    fn on_batch_error(&self, _result: &BatchWriteResult, _error: &StoreError) {}
}

/// Default observer: logs through `tracing`.
pub struct LogObserver;

impl WriteObserver for LogObserver {
    fn on_batch_success(&self, result: &BatchWriteResult) {
        debug!(
            "batch accepted: {} points, {} retries",
            result.attempted_points, result.retries_used
        );
    }

    fn on_batch_retry(&self, attempt: u32, delay: Duration, error: &StoreError) {
        warn!(
            "store write failed (attempt {}), retrying in {:?}: {}",
            attempt, delay, error
        );
    }

    fn on_batch_error(&self, result: &BatchWriteResult, error: &StoreError) {
        error!(
            "batch of {} points dropped after {} retries: {}",
            result.attempted_points, result.retries_used, error
        );
    }
}

/// Batched, retry-resilient writer into the remote store.
///
/// Accumulates points until the batch threshold (or flush interval) is
/// reached, then submits the encoded batch through the store client. A
/// failed submission is retried with exponential backoff per the
/// [`RetryPolicy`]; once retries are exhausted the sink is dead for the
/// rest of its file: the error propagates and the pipeline moves on to
/// the next file.
pub struct RemoteSink {
    client: Arc<dyn StoreClient>,
    buffer: BatchBuffer,
    policy: RetryPolicy,
    observer: Box<dyn WriteObserver>,
    summary: SinkSummary,
}

impl RemoteSink {
    pub fn new(
        client: Arc<dyn StoreClient>,
        batch_size: usize,
        flush_interval: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self::with_observer(client, batch_size, flush_interval, policy, Box::new(LogObserver))
    }

    pub fn with_observer(
        client: Arc<dyn StoreClient>,
        batch_size: usize,
        flush_interval: Duration,
        policy: RetryPolicy,
        observer: Box<dyn WriteObserver>,
    ) -> Self {
        Self {
            client,
            buffer: BatchBuffer::new(batch_size, flush_interval),
            policy,
            observer,
            summary: SinkSummary::default(),
        }
    }

    /// Submit one batch, retrying per policy. Backoff sleeps block only the
    /// caller; independent files are unaffected.
    fn flush_batch(&mut self, batch: Vec<Point>) -> Result<BatchWriteResult, SinkError> {
        let body: String = batch
            .iter()
            .map(|p| p.to_line_protocol())
            .collect::<Vec<_>>()
            .join("\n");
        let attempted_points = batch.len();

        let mut attempt: u32 = 0;
        loop {
            match self.client.write_lines(&body) {
                Ok(()) => {
                    let result = BatchWriteResult {
                        succeeded: true,
                        attempted_points,
                        retries_used: attempt,
                    };
                    self.observer.on_batch_success(&result);
                    self.summary.points_written += attempted_points as u64;
                    self.summary.batches_flushed += 1;
                    return Ok(result);
                }
                Err(err) if attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    attempt += 1;
                    self.observer.on_batch_retry(attempt, delay, &err);
                    std::thread::sleep(delay);
                }
                Err(err) => {
                    let result = BatchWriteResult {
                        succeeded: false,
                        attempted_points,
                        retries_used: attempt,
                    };
                    self.observer.on_batch_error(&result, &err);
                    return Err(SinkError::RetriesExhausted {
                        retries: attempt,
                        source: err,
                    });
                }
            }
        }
    }
}

impl PointSink for RemoteSink {
    fn write_point(&mut self, point: Point) -> Result<(), SinkError> {
        if let Some(batch) = self.buffer.add(point) {
            self.flush_batch(batch)?;
        } else if self.buffer.should_flush() {
            let batch = self.buffer.flush();
            self.flush_batch(batch)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<SinkSummary, SinkError> {
        if !self.buffer.is_empty() {
            let batch = self.buffer.flush();
            self.flush_batch(batch)?;
        }
        Ok(self.summary.clone())
    }
}

/// Factory for per-file remote sinks sharing one store client.
pub struct RemoteSinkFactory {
    client: Arc<dyn StoreClient>,
    batch_size: usize,
    flush_interval: Duration,
    policy: RetryPolicy,
}

impl RemoteSinkFactory {
    pub fn new(
        client: Arc<dyn StoreClient>,
        batch_size: usize,
        flush_interval: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            batch_size,
            flush_interval,
            policy,
        }
    }
}

impl SinkFactory for RemoteSinkFactory {
    fn create(&self, _bucket: &BucketName) -> Result<Box<dyn PointSink>, SinkError> {
        Ok(Box::new(RemoteSink::new(
            Arc::clone(&self.client),
            self.batch_size,
            self.flush_interval,
            self.policy.clone(),
        )))
    }
}
