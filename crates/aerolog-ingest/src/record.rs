// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed telemetry records.
//!
//! The decoder collaborator hands over loosely shaped key/value maps
//! ([`RawRecord`]). Known message types get a fixed, strongly typed field
//! set here; everything else falls through to [`Record::Generic`], which
//! carries the raw mapping untouched. Consumers never do stringly-typed
//! field lookups on known types.

use crate::influx::FieldValue;

/// A decoded record as produced by the log decoder, scoped to one file.
///
/// `elapsed_us` (microseconds since file start) and the per-type instance
/// discriminator are extracted by the decoder adapter; the consumed keys do
/// not reappear in `fields`.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Message-type label (e.g. `IMU`, `VIBE`, `GPS`).
    pub message_type: String,
    /// Remaining key/value pairs in decode order.
    pub fields: Vec<(String, serde_json::Value)>,
    /// Microseconds since file start (`TimeUS`), if present.
    pub elapsed_us: Option<u64>,
    /// Sensor instance index, if present.
    pub instance: Option<u32>,
}

/// Accelerometer/gyro sample (`IMU`).
#[derive(Debug, Clone, Default)]
pub struct ImuRecord {
    pub instance: Option<u32>,
    pub acc_x: Option<f64>,
    pub acc_y: Option<f64>,
    pub acc_z: Option<f64>,
    pub gyr_x: Option<f64>,
    pub gyr_y: Option<f64>,
    pub gyr_z: Option<f64>,
    /// Sensor temperature, decoded from the `T` key.
    pub temp_c: Option<f64>,
}

/// Vibration sample (`VIBE`).
#[derive(Debug, Clone, Default)]
pub struct VibeRecord {
    pub instance: Option<u32>,
    pub vibe_x: Option<f64>,
    pub vibe_y: Option<f64>,
    pub vibe_z: Option<f64>,
    pub clip: Option<i64>,
}

/// Any other message type, carried as the raw mapping.
#[derive(Debug, Clone)]
pub struct GenericRecord {
    pub message_type: String,
    pub fields: Vec<(String, serde_json::Value)>,
    pub instance: Option<u32>,
}

/// A telemetry record, typed where the message type is known.
#[derive(Debug, Clone)]
pub enum Record {
    Imu(ImuRecord),
    Vibe(VibeRecord),
    Generic(GenericRecord),
}

impl Record {
    /// Build a typed record from the decoder's raw form.
    pub fn from_raw(raw: RawRecord) -> Self {
        match raw.message_type.as_str() {
            "IMU" => Record::Imu(ImuRecord {
                instance: raw.instance,
                acc_x: lookup_f64(&raw.fields, "AccX"),
                acc_y: lookup_f64(&raw.fields, "AccY"),
                acc_z: lookup_f64(&raw.fields, "AccZ"),
                gyr_x: lookup_f64(&raw.fields, "GyrX"),
                gyr_y: lookup_f64(&raw.fields, "GyrY"),
                gyr_z: lookup_f64(&raw.fields, "GyrZ"),
                temp_c: lookup_f64(&raw.fields, "T"),
            }),
            "VIBE" => Record::Vibe(VibeRecord {
                instance: raw.instance,
                vibe_x: lookup_f64(&raw.fields, "VibeX"),
                vibe_y: lookup_f64(&raw.fields, "VibeY"),
                vibe_z: lookup_f64(&raw.fields, "VibeZ"),
                clip: lookup_i64(&raw.fields, "Clip"),
            }),
            _ => Record::Generic(GenericRecord {
                message_type: raw.message_type,
                fields: raw.fields,
                instance: raw.instance,
            }),
        }
    }

    /// The measurement name this record maps to.
    pub fn measurement(&self) -> &str {
        match self {
            Record::Imu(_) => "IMU",
            Record::Vibe(_) => "VIBE",
            Record::Generic(g) => &g.message_type,
        }
    }

    /// Sensor instance context, if any.
    pub fn instance(&self) -> Option<u32> {
        match self {
            Record::Imu(r) => r.instance,
            Record::Vibe(r) => r.instance,
            Record::Generic(g) => g.instance,
        }
    }

    /// Field set with canonical base names, absent values kept as `None`.
    ///
    /// Name qualification (e.g. instance suffixes) is the field mapper's
    /// job, not this one's.
    pub fn fields(&self) -> Vec<(String, Option<FieldValue>)> {
        match self {
            Record::Imu(r) => vec![
                ("AccX".to_string(), r.acc_x.map(FieldValue::Float)),
                ("AccY".to_string(), r.acc_y.map(FieldValue::Float)),
                ("AccZ".to_string(), r.acc_z.map(FieldValue::Float)),
                ("GyrX".to_string(), r.gyr_x.map(FieldValue::Float)),
                ("GyrY".to_string(), r.gyr_y.map(FieldValue::Float)),
                ("GyrZ".to_string(), r.gyr_z.map(FieldValue::Float)),
                ("TempC".to_string(), r.temp_c.map(FieldValue::Float)),
            ],
            Record::Vibe(r) => vec![
                ("VibeX".to_string(), r.vibe_x.map(FieldValue::Float)),
                ("VibeY".to_string(), r.vibe_y.map(FieldValue::Float)),
                ("VibeZ".to_string(), r.vibe_z.map(FieldValue::Float)),
                ("Clip".to_string(), r.clip.map(FieldValue::Integer)),
            ],
            Record::Generic(g) => g
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                .collect(),
        }
    }
}

fn lookup_f64(fields: &[(String, serde_json::Value)], key: &str) -> Option<f64> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.as_f64())
}

fn lookup_i64(fields: &[(String, serde_json::Value)], key: &str) -> Option<i64> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.as_i64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(message_type: &str, fields: Vec<(&str, serde_json::Value)>) -> RawRecord {
        RawRecord {
            message_type: message_type.to_string(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            elapsed_us: Some(1),
            instance: None,
        }
    }

    #[test]
    fn test_imu_typed_extraction() {
        let record = Record::from_raw(raw(
            "IMU",
            vec![
                ("AccX", json!(0.1)),
                ("AccY", json!(-0.2)),
                ("AccZ", json!(-9.8)),
                ("GyrX", json!(0.01)),
                ("GyrY", json!(0.02)),
                ("GyrZ", json!(0.03)),
                ("T", json!(34.5)),
            ],
        ));

        assert_eq!(record.measurement(), "IMU");
        let fields = record.fields();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0].0, "AccX");
        assert_eq!(fields[0].1, Some(FieldValue::Float(0.1)));
        // `T` is renamed to its canonical output name.
        assert_eq!(fields[6].0, "TempC");
        assert_eq!(fields[6].1, Some(FieldValue::Float(34.5)));
    }

    #[test]
    fn test_imu_partial_sample_keeps_absent_fields_none() {
        let record = Record::from_raw(raw("IMU", vec![("AccX", json!(1.0))]));
        let fields = record.fields();

        assert_eq!(fields[0].1, Some(FieldValue::Float(1.0)));
        assert!(fields[1..].iter().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn test_vibe_typed_extraction() {
        let mut r = raw(
            "VIBE",
            vec![
                ("VibeX", json!(0.5)),
                ("VibeY", json!(0.6)),
                ("VibeZ", json!(0.7)),
                ("Clip", json!(3)),
            ],
        );
        r.instance = Some(1);
        let record = Record::from_raw(r);

        assert_eq!(record.measurement(), "VIBE");
        assert_eq!(record.instance(), Some(1));

        let fields = record.fields();
        assert_eq!(fields[3].0, "Clip");
        assert_eq!(fields[3].1, Some(FieldValue::Integer(3)));
    }

    #[test]
    fn test_unknown_type_falls_through_to_generic() {
        let record = Record::from_raw(raw(
            "GPS",
            vec![
                ("Lat", json!(48.8566)),
                ("Lng", json!(2.3522)),
                ("NSats", json!(12)),
                ("Status", json!(null)),
            ],
        ));

        assert_eq!(record.measurement(), "GPS");
        let fields = record.fields();
        assert_eq!(fields.len(), 4);
        // Decode order is preserved.
        assert_eq!(fields[0].0, "Lat");
        assert_eq!(fields[2].1, Some(FieldValue::Integer(12)));
        // Nulls stay as absent values; the point builder drops them.
        assert_eq!(fields[3].1, None);
    }
}
