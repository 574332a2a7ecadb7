// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bucket names derived from log file paths.
//!
//! Every input file gets a stable identifier built from its directory
//! hierarchy, used both as the output `.lp` file name and as the `bucket`
//! correlation tag on every point from that file.
//!
//! Derivation walks up from the file's parent collecting up to three
//! ancestor directory names, transliterates non-ASCII components through
//! the translation collaborator (falling back to the original component on
//! any failure), joins with underscores, appends the file stem, then
//! sanitizes to `[a-z0-9_-]`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::translate::Transliterate;

/// Name used when sanitization leaves nothing.
pub const FALLBACK_BUCKET: &str = "unnamed-log";

/// How many ancestor directories contribute to the name.
const ANCESTOR_COMPONENTS: usize = 3;

/// A sanitized per-file identifier. Always matches `[a-z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketName(String);

impl BucketName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives bucket names from file paths.
///
/// Transliteration outcomes (including the fall-back-to-original case) are
/// memoized per component, so deriving the same path twice yields the same
/// name even if the translation service becomes unavailable in between.
pub struct BucketNamer {
    translator: Box<dyn Transliterate>,
    cache: RefCell<HashMap<String, String>>,
}

impl BucketNamer {
    pub fn new(translator: Box<dyn Transliterate>) -> Self {
        Self {
            translator,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Derive the bucket name for a log file path.
    pub fn derive(&self, path: &Path) -> BucketName {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let mut ancestors: Vec<String> = Vec::new();
        let mut dir = path.parent();
        while let Some(d) = dir {
            if ancestors.len() == ANCESTOR_COMPONENTS {
                break;
            }
            match d.file_name().and_then(|n| n.to_str()) {
                Some(name) if !name.is_empty() => ancestors.push(name.to_string()),
                _ => break,
            }
            dir = d.parent();
        }

        let raw = if ancestors.len() == ANCESTOR_COMPONENTS {
            // Collected bottom-up; emit root-first.
            ancestors.reverse();
            let joined: Vec<String> = ancestors
                .iter()
                .map(|c| self.ascii_component(c))
                .collect();
            format!("{}_{}", joined.join("_"), stem)
        } else {
            stem.to_string()
        };

        let sanitized: String = raw
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();

        if sanitized.is_empty() {
            BucketName(FALLBACK_BUCKET.to_string())
        } else {
            BucketName(sanitized)
        }
    }

    /// Resolve one path component into ASCII-safe text, best-effort.
    fn ascii_component(&self, component: &str) -> String {
        if !needs_transliteration(component) {
            return component.to_string();
        }

        if let Some(cached) = self.cache.borrow().get(component) {
            return cached.clone();
        }

        let resolved = match self.translator.transliterate(component) {
            Ok(translated) => translated,
            Err(err) => {
                debug!("transliteration of {:?} failed, keeping original: {}", component, err);
                component.to_string()
            }
        };

        self.cache
            .borrow_mut()
            .insert(component.to_string(), resolved.clone());
        resolved
    }
}

/// Whether a component contains characters the store-safe alphabet cannot
/// represent without help.
fn needs_transliteration(component: &str) -> bool {
    component
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !matches!(c, '_' | '-' | '.' | ' '))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{NoTranslation, TranslateError, Transliterate};
    use std::cell::Cell;
    use std::path::PathBuf;

    fn namer() -> BucketNamer {
        BucketNamer::new(Box::new(NoTranslation))
    }

    #[test]
    fn test_three_ancestors_plus_stem() {
        let name = namer().derive(Path::new("/logs/site-a/day-02/flight.bin"));
        assert_eq!(name.as_str(), "logs_site-a_day-02_flight");
    }

    #[test]
    fn test_deep_path_uses_nearest_three_ancestors() {
        let name = namer().derive(Path::new("/srv/data/logs/site-a/day-02/flight.bin"));
        assert_eq!(name.as_str(), "logs_site-a_day-02_flight");
    }

    #[test]
    fn test_shallow_path_falls_back_to_stem() {
        let name = namer().derive(Path::new("day-02/flight.bin"));
        assert_eq!(name.as_str(), "flight");

        let name = namer().derive(Path::new("flight.bin"));
        assert_eq!(name.as_str(), "flight");
    }

    #[test]
    fn test_sanitizes_and_lowercases() {
        let name = namer().derive(Path::new("/Logs/Site A/Day.02/Flight 7.bin"));
        assert_eq!(name.as_str(), "logs_site_a_day_02_flight_7");
    }

    #[test]
    fn test_non_ascii_ancestors_without_translation_are_sanitized() {
        // Hebrew/Greek ancestor names, translation unavailable: components
        // stay untranslated and sanitize to underscores, stem survives.
        let name = namer().derive(Path::new("α/עב/βγ/flight.bin"));
        assert_eq!(name.as_str(), "________flight");
        assert!(name.as_str().ends_with("_flight"));
        assert!(name.as_str().chars().all(|c| c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || c == '_'
            || c == '-'));
    }

    #[test]
    fn test_translation_is_used_when_available() {
        struct Fixed;
        impl Transliterate for Fixed {
            fn transliterate(&self, _text: &str) -> Result<String, TranslateError> {
                Ok("hebrew".to_string())
            }
        }

        let namer = BucketNamer::new(Box::new(Fixed));
        let name = namer.derive(Path::new("a/עברית/b/flight.bin"));
        assert_eq!(name.as_str(), "a_hebrew_b_flight");
    }

    #[test]
    fn test_derivation_is_deterministic_and_idempotent() {
        let path = PathBuf::from("/logs/site-a/day-02/flight.bin");
        let namer = namer();
        assert_eq!(namer.derive(&path), namer.derive(&path));
    }

    #[test]
    fn test_idempotent_when_translator_becomes_unavailable() {
        // Succeeds once, then errors on every later call.
        struct Flaky {
            calls: Cell<u32>,
        }
        impl Transliterate for Flaky {
            fn transliterate(&self, _text: &str) -> Result<String, TranslateError> {
                let n = self.calls.get();
                self.calls.set(n + 1);
                if n == 0 {
                    Ok("site".to_string())
                } else {
                    Err(TranslateError::Unavailable)
                }
            }
        }

        let namer = BucketNamer::new(Box::new(Flaky { calls: Cell::new(0) }));
        let path = PathBuf::from("a/چکاد/b/flight.bin");

        let first = namer.derive(&path);
        let second = namer.derive(&path);
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "a_site_b_flight");
    }

    #[test]
    fn test_empty_result_uses_fallback_name() {
        let name = namer().derive(Path::new("日本語.bin"));
        // Stem is entirely non-ASCII and sanitizes to underscores, which is
        // still non-empty; an empty stem hits the fixed fallback.
        assert!(!name.as_str().is_empty());

        let name = namer().derive(Path::new(""));
        assert_eq!(name.as_str(), FALLBACK_BUCKET);
    }
}
