// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Log decoder boundary.
//!
//! The binary DataFlash format is decoded by an external collaborator;
//! this crate never parses it. [`LogDecoder`] is the seam: it opens one
//! log file and yields a lazy, ordered stream of [`RawRecord`]s.
//!
//! The shipped implementation, [`ExternalDecoder`], spawns a decoder
//! command (`mavlogdump.py --format json` by default) and parses its
//! JSON-lines stdout. One line per message:
//!
//! ```text
//! {"meta": {"type": "IMU", "timestamp": 1699.5}, "data": {"TimeUS": 120, "AccX": 0.1, ...}}
//! ```
//!
//! `TimeUS` and the per-type instance discriminator (`I` for IMU, `IMU`
//! for VIBE, `Instance` otherwise) are pulled out of the data map here so
//! downstream stages never re-scan for them.

use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use thiserror::Error;

use crate::record::RawRecord;
use crate::time::TimeBase;

/// Decoder failures. Fatal for the current file only.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to spawn decoder '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("I/O error reading decoder output: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed decoder output at line {line}: {source}")]
    Parse {
        line: u64,
        source: serde_json::Error,
    },

    #[error("decoder exited with {status}")]
    DecoderFailed { status: std::process::ExitStatus },
}

/// One opened log: an optional absolute-clock anchor plus the record stream.
///
/// `time_base` is `None` when the decoder reports no absolute clock; the
/// pipeline then anchors the first record's elapsed time to wall clock.
pub struct DecodedLog {
    pub time_base: Option<TimeBase>,
    pub records: Box<dyn Iterator<Item = Result<RawRecord, DecodeError>>>,
}

/// Opens log files and produces decoded record streams.
pub trait LogDecoder {
    fn open(&self, path: &Path) -> Result<DecodedLog, DecodeError>;
}

/// Decoder collaborator driven as a subprocess emitting JSON lines.
pub struct ExternalDecoder {
    program: String,
    args: Vec<String>,
}

impl ExternalDecoder {
    /// Default decoder command.
    pub const DEFAULT_COMMAND: &'static str = "mavlogdump.py";

    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a single command-line string (`"mavlogdump.py --quiet"`).
    pub fn from_command_line(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(|s| s.to_string());
        let program = parts
            .next()
            .unwrap_or_else(|| Self::DEFAULT_COMMAND.to_string());
        Self {
            program,
            args: parts.collect(),
        }
    }
}

impl Default for ExternalDecoder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COMMAND, Vec::new())
    }
}

impl LogDecoder for ExternalDecoder {
    fn open(&self, path: &Path) -> Result<DecodedLog, DecodeError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--format")
            .arg("json")
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| DecodeError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        // stdout is piped above; take() cannot miss.
        let stdout = child.stdout.take().ok_or_else(|| DecodeError::Spawn {
            command: self.program.clone(),
            source: std::io::Error::other("decoder stdout not captured"),
        })?;

        Ok(DecodedLog {
            time_base: None,
            records: Box::new(JsonRecordIter {
                child,
                lines: BufReader::new(stdout).lines(),
                line_no: 0,
                done: false,
            }),
        })
    }
}

/// Lazily parses decoder stdout; checks the exit status at end-of-stream.
struct JsonRecordIter {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    line_no: u64,
    done: bool,
}

impl Iterator for JsonRecordIter {
    type Item = Result<RawRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    self.line_no += 1;
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Some(parse_record(&line).map_err(|source| DecodeError::Parse {
                        line: self.line_no,
                        source,
                    }));
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(DecodeError::Io(err)));
                }
                None => {
                    self.done = true;
                    return match self.child.wait() {
                        Ok(status) if status.success() => None,
                        Ok(status) => Some(Err(DecodeError::DecoderFailed { status })),
                        Err(err) => Some(Err(DecodeError::Io(err))),
                    };
                }
            }
        }
    }
}

impl Drop for JsonRecordIter {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Parse one decoder output line into a raw record.
pub fn parse_record(line: &str) -> Result<RawRecord, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(line)?;

    let message_type = value
        .get("meta")
        .and_then(|m| m.get("type"))
        .and_then(|t| t.as_str())
        .unwrap_or("UNKNOWN")
        .to_string();

    let mut elapsed_us = None;
    let mut instance = None;
    let mut fields = Vec::new();

    let discriminator = instance_key(&message_type);

    if let Some(serde_json::Value::Object(data)) = value.get("data") {
        for (key, val) in data {
            if key == "TimeUS" {
                elapsed_us = val.as_u64();
                continue;
            }
            if key == discriminator {
                instance = val.as_u64().map(|i| i as u32);
                continue;
            }
            fields.push((key.clone(), val.clone()));
        }
    }

    Ok(RawRecord {
        message_type,
        fields,
        elapsed_us,
        instance,
    })
}

/// The key carrying the sensor instance index for a message type.
fn instance_key(message_type: &str) -> &'static str {
    match message_type {
        "IMU" => "I",
        "VIBE" => "IMU",
        _ => "Instance",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_imu_record() {
        let line = r#"{"meta": {"type": "IMU", "timestamp": 1699.25},
            "data": {"TimeUS": 120500, "I": 0, "AccX": 0.12, "AccY": -0.05, "GyrZ": 0.01}}"#;
        let line = line.replace('\n', " ");

        let record = parse_record(&line).expect("parse");
        assert_eq!(record.message_type, "IMU");
        assert_eq!(record.elapsed_us, Some(120_500));
        assert_eq!(record.instance, Some(0));

        // TimeUS and the discriminator are consumed, the rest survives in order.
        let keys: Vec<&str> = record.fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["AccX", "AccY", "GyrZ"]);
    }

    #[test]
    fn test_parse_vibe_record_uses_imu_discriminator() {
        let line = r#"{"meta": {"type": "VIBE"}, "data": {"TimeUS": 7, "IMU": 1, "Clip": 3}}"#;

        let record = parse_record(line).expect("parse");
        assert_eq!(record.message_type, "VIBE");
        assert_eq!(record.instance, Some(1));
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.fields[0].0, "Clip");
    }

    #[test]
    fn test_parse_record_without_time_us() {
        let line = r#"{"meta": {"type": "MSG"}, "data": {"Message": "ArduCopter V4.5"}}"#;

        let record = parse_record(line).expect("parse");
        assert_eq!(record.elapsed_us, None);
        assert_eq!(record.fields.len(), 1);
    }

    #[test]
    fn test_parse_record_rejects_garbage() {
        assert!(parse_record("FMT, 128, 89").is_err());
    }

    #[test]
    fn test_from_command_line_splits_program_and_args() {
        let decoder = ExternalDecoder::from_command_line("mavlogdump.py --quiet --no-bad-data");
        assert_eq!(decoder.program, "mavlogdump.py");
        assert_eq!(decoder.args, vec!["--quiet", "--no-bad-data"]);
    }

    #[test]
    fn test_open_missing_decoder_is_a_spawn_error() {
        let decoder = ExternalDecoder::new("aerolog-no-such-decoder", Vec::new());
        let err = decoder
            .open(Path::new("flight.bin"))
            .err()
            .expect("spawn failure");
        assert!(matches!(err, DecodeError::Spawn { .. }));
    }
}
