// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Canonical field naming.
//!
//! Some decoded field names are ambiguous and need schema-qualified
//! replacements before they hit the store. The rules live in a lookup
//! keyed by `(message_type, field_name)` returning a naming function, so
//! adding a rule never touches call sites.
//!
//! Default behavior is identity. The one shipped rule: `VIBE.Clip` becomes
//! `Clip0`/`Clip1`/`Clip2` depending on the sensor instance, matching the
//! store schema the analysis side queries against.

use std::collections::HashMap;

/// A naming function: base field name + instance context -> canonical name.
pub type RenameFn = fn(&str, Option<u32>) -> String;

/// Rewrites ambiguous field names into schema-qualified ones.
pub struct FieldMapper {
    rules: HashMap<(String, String), RenameFn>,
}

impl FieldMapper {
    /// Create an empty mapper (identity for every field).
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Create a mapper with the shipped rule set.
    pub fn with_default_rules() -> Self {
        let mut mapper = Self::new();
        mapper.register("VIBE", "Clip", instance_suffixed);
        mapper
    }

    /// Register a naming rule for `(message_type, field_name)`.
    pub fn register(&mut self, message_type: &str, field_name: &str, rename: RenameFn) {
        self.rules
            .insert((message_type.to_string(), field_name.to_string()), rename);
    }

    /// Map a field name to its canonical form.
    pub fn map_field_name(
        &self,
        message_type: &str,
        field_name: &str,
        instance: Option<u32>,
    ) -> String {
        match self
            .rules
            .get(&(message_type.to_string(), field_name.to_string()))
        {
            Some(rename) => rename(field_name, instance),
            None => field_name.to_string(),
        }
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// Suffix the base name with the instance index, identity when absent.
fn instance_suffixed(base: &str, instance: Option<u32>) -> String {
    match instance {
        Some(i) => format!("{}{}", base, i),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        let mapper = FieldMapper::with_default_rules();

        assert_eq!(mapper.map_field_name("IMU", "AccX", Some(0)), "AccX");
        assert_eq!(mapper.map_field_name("GPS", "NSats", None), "NSats");
    }

    #[test]
    fn test_vibe_clip_is_instance_qualified() {
        let mapper = FieldMapper::with_default_rules();

        assert_eq!(mapper.map_field_name("VIBE", "Clip", Some(1)), "Clip1");
        assert_eq!(mapper.map_field_name("VIBE", "Clip", Some(0)), "Clip0");
    }

    #[test]
    fn test_vibe_clip_without_instance_stays_generic() {
        let mapper = FieldMapper::with_default_rules();

        assert_eq!(mapper.map_field_name("VIBE", "Clip", None), "Clip");
    }

    #[test]
    fn test_rule_is_scoped_to_message_type() {
        let mapper = FieldMapper::with_default_rules();

        // Clip on some other message type is untouched.
        assert_eq!(mapper.map_field_name("RCOU", "Clip", Some(1)), "Clip");
    }

    #[test]
    fn test_registering_a_rule_needs_no_call_site_change() {
        let mut mapper = FieldMapper::with_default_rules();
        mapper.register("ESC", "RPM", |base, instance| match instance {
            Some(i) => format!("{}_{}", base, i),
            None => base.to_string(),
        });

        assert_eq!(mapper.map_field_name("ESC", "RPM", Some(2)), "RPM_2");
    }
}
