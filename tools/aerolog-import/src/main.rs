// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! aerolog-import - Import flight logs into InfluxDB or Line Protocol files.
//!
//! Usage:
//!   aerolog-import --input-dir ./logs --output-dir ./out
//!   aerolog-import --input-dir ./logs --influx-url http://localhost:8181 --influx-token TOKEN
//!   aerolog-import --input-dir ./logs --output-dir ./out --decoder-cmd "mavlogdump.py --no-bad-data"

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use tracing::info;

use aerolog_ingest::bucket::BucketNamer;
use aerolog_ingest::client::HttpStoreClient;
use aerolog_ingest::config::TuningConfig;
use aerolog_ingest::decoder::ExternalDecoder;
use aerolog_ingest::mapping::FieldMapper;
use aerolog_ingest::pipeline::ImportPipeline;
use aerolog_ingest::sink::{FileSinkFactory, RemoteSinkFactory, SinkFactory};
use aerolog_ingest::translate::{HttpTranslator, NoTranslation, Transliterate};

#[derive(Parser, Debug)]
#[command(name = "aerolog-import")]
#[command(about = "Import flight telemetry logs into InfluxDB")]
#[command(version)]
struct Args {
    /// Directory scanned recursively for .bin logs
    #[arg(long)]
    input_dir: PathBuf,

    /// Directory for .lp output files (file mode)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// InfluxDB write URL; selects remote mode
    #[arg(long)]
    influx_url: Option<String>,

    /// InfluxDB authentication token (required with --influx-url)
    #[arg(long)]
    influx_token: Option<String>,

    /// Store-level bucket (database) to write into
    #[arg(long, default_value = "telemetry")]
    influx_bucket: String,

    /// Organization name (legacy, accepted for v2 deployments)
    #[arg(long, default_value = "")]
    org: String,

    /// Decoder command producing JSON records from a .bin log
    #[arg(long, default_value = ExternalDecoder::DEFAULT_COMMAND)]
    decoder_cmd: String,

    /// Translation endpoint for non-ASCII path components (best-effort)
    #[arg(long)]
    translate_url: Option<String>,

    /// Points per remote write batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Remote flush interval in milliseconds
    #[arg(long)]
    flush_interval_ms: Option<u64>,

    /// Retries per batch before giving up on a file
    #[arg(long)]
    max_retries: Option<u32>,

    /// YAML tuning file (batch/flush/retry knobs)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging
    let filter = if args.quiet {
        tracing::Level::WARN
    } else {
        args.log_level.parse().unwrap_or(tracing::Level::INFO)
    };
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .init();

    // Tuning: YAML file first, CLI flags win.
    let mut tuning = match &args.config {
        Some(path) => TuningConfig::from_file(path)?,
        None => TuningConfig::default(),
    };
    if args.batch_size.is_some() {
        tuning.batch_size = args.batch_size;
    }
    if args.flush_interval_ms.is_some() {
        tuning.flush_interval_ms = args.flush_interval_ms;
    }
    if args.max_retries.is_some() {
        tuning.max_retries = args.max_retries;
    }

    // Sink selection: remote when an InfluxDB URL is given, files otherwise.
    let sinks: Box<dyn SinkFactory> = match &args.influx_url {
        Some(url) => {
            let token = match &args.influx_token {
                Some(token) => token.clone(),
                None => bail!("--influx-token is required with --influx-url"),
            };
            let client = HttpStoreClient::new(url.clone(), args.org.clone(), args.influx_bucket.clone(), token)?;
            Box::new(RemoteSinkFactory::new(
                Arc::new(client),
                tuning.batch_size(),
                tuning.flush_interval(),
                tuning.retry_policy(),
            ))
        }
        None => {
            let output_dir = match &args.output_dir {
                Some(dir) => dir.clone(),
                None => bail!("--output-dir is required without --influx-url"),
            };
            Box::new(FileSinkFactory::new(output_dir))
        }
    };

    let translator: Box<dyn Transliterate> = match &args.translate_url {
        Some(url) => Box::new(HttpTranslator::new(url.clone())?),
        None => Box::new(NoTranslation),
    };

    let pipeline = ImportPipeline::new(
        Box::new(ExternalDecoder::from_command_line(&args.decoder_cmd)),
        FieldMapper::with_default_rules(),
        BucketNamer::new(translator),
        sinks,
    );

    info!("aerolog-import v{}", env!("CARGO_PKG_VERSION"));
    info!("Input: {}", args.input_dir.display());
    match &args.influx_url {
        Some(url) => info!("Sink: {} (bucket {})", url, args.influx_bucket),
        None => info!(
            "Sink: {} (.lp files)",
            args.output_dir.as_deref().unwrap_or(std::path::Path::new("")).display()
        ),
    }

    let summary = pipeline.run(&args.input_dir)?;

    if summary.files_found == 0 {
        bail!("no .bin files found under {}", args.input_dir.display());
    }

    info!("Import complete");
    info!("  Files:  {} found, {} ok, {} failed", summary.files_found, summary.files_succeeded, summary.files_failed);
    info!("  Points: {}", summary.points_written);

    // Partial per-file failures still exit 0; only configuration and
    // top-level errors are fatal to the process.
    Ok(())
}
