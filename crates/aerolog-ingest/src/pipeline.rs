// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Import pipeline driver.
//!
//! Sequences input files and wires decoder -> timestamp normalizer ->
//! field mapper -> point builder -> sink for each. Files are independent
//! units of work: any per-file fatal error (decode failure, output I/O,
//! exhausted-retry write) is logged and counted, and the run moves on to
//! the next file. Within one file, points are written strictly in decode
//! order; downstream consumers rely on per-file monotone timestamps.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::bucket::BucketNamer;
use crate::decoder::{DecodeError, LogDecoder};
use crate::influx::build_point;
use crate::mapping::FieldMapper;
use crate::record::Record;
use crate::sink::{SinkError, SinkFactory};
use crate::time::{TimeBase, TimeError, TimestampNormalizer};

/// Per-file fatal errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Time(#[from] TimeError),
}

/// End-of-run totals.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Input files discovered.
    pub files_found: usize,
    /// Files fully processed.
    pub files_succeeded: usize,
    /// Files abandoned on a fatal error.
    pub files_failed: usize,
    /// Points handed to sinks across all files.
    pub points_written: u64,
}

/// The wired import pipeline.
pub struct ImportPipeline {
    decoder: Box<dyn LogDecoder>,
    mapper: FieldMapper,
    namer: BucketNamer,
    sinks: Box<dyn SinkFactory>,
}

impl ImportPipeline {
    pub fn new(
        decoder: Box<dyn LogDecoder>,
        mapper: FieldMapper,
        namer: BucketNamer,
        sinks: Box<dyn SinkFactory>,
    ) -> Self {
        Self {
            decoder,
            mapper,
            namer,
            sinks,
        }
    }

    /// Process every discovered input file, isolating per-file failures.
    ///
    /// Returns `Err` only for top-level failures (the input directory not
    /// being readable); individual file failures land in the summary.
    pub fn run(&self, input_dir: &Path) -> Result<RunSummary, std::io::Error> {
        let files = discover_input_files(input_dir)?;
        let mut summary = RunSummary {
            files_found: files.len(),
            ..Default::default()
        };

        for path in &files {
            match self.process_file(path) {
                Ok(points) => {
                    info!("{}: {} points", path.display(), points);
                    summary.files_succeeded += 1;
                    summary.points_written += points;
                }
                Err(err) => {
                    warn!("{}: failed: {}", path.display(), err);
                    summary.files_failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// One file, one streaming pass.
    fn process_file(&self, path: &Path) -> Result<u64, PipelineError> {
        let file_id = path.display().to_string();
        let bucket = self.namer.derive(path);
        let mut sink = self.sinks.create(&bucket)?;

        let decoded = self.decoder.open(path)?;
        let mut normalizer = match decoded.time_base {
            Some(base) => TimestampNormalizer::with_base(base),
            None => TimestampNormalizer::new(&file_id),
        };

        for raw in decoded.records {
            let raw = raw?;

            // Records without elapsed time are filtered, not failed.
            let elapsed_us = match raw.elapsed_us {
                Some(us) => us,
                None => continue,
            };

            // No decoder-provided clock: anchor the first timed record to
            // the wall clock and keep relative offsets.
            if !normalizer.has_base() {
                normalizer.set_base(TimeBase::anchored_to_wall_clock(&file_id, elapsed_us));
            }
            let timestamp_us = normalizer.normalize(elapsed_us)?;

            let record = Record::from_raw(raw);
            let measurement = record.measurement().to_string();
            let instance = record.instance();

            let fields = record
                .fields()
                .into_iter()
                .map(|(name, value)| {
                    let canonical = self.mapper.map_field_name(&measurement, &name, instance);
                    (canonical, value)
                })
                .collect();

            let tags = vec![("bucket".to_string(), Some(bucket.to_string()))];

            // Empty field sets are no-op records; never hand them to a sink.
            let point = match build_point(&measurement, tags, fields, timestamp_us) {
                Some(point) => point,
                None => continue,
            };

            sink.write_point(point)?;
        }

        let sink_summary = sink.finish()?;
        Ok(sink_summary.points_written)
    }
}

/// Recursively collect input files with a case-insensitive `.bin`
/// extension, deduplicated and path-sorted for a deterministic order.
pub fn discover_input_files(input_dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    collect_bin_files(input_dir, &mut files)?;
    files.sort();
    files.dedup();
    Ok(files)
}

fn collect_bin_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_bin_files(&path, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("bin"))
        {
            out.push(path);
        }
    }
    Ok(())
}
