use crate::util::{dotted_extension, format_mb, format_mb_limit};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::error;

/// Extensions that get a pixel-dimension probe on top of size/format checks.
const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".bmp", ".webp"];

/// Per-mode upload constraints. All four fields are required; deserializing
/// a partial rule table fails rather than defaulting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub max_size_bytes: u64,
    /// Lowercase, with leading dot.
    pub allowed_extensions: Vec<String>,
    pub min_dimension: u32,
    pub max_dimension: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub accepted: bool,
    pub reasons: Vec<String>,
}

impl CheckReport {
    fn rejected(reason: String) -> Self {
        Self {
            accepted: false,
            reasons: vec![reason],
        }
    }
}

pub struct FileChecker {
    rules: BTreeMap<String, RuleSet>,
}

impl Default for FileChecker {
    fn default() -> Self {
        let common_extensions: Vec<String> =
            [".jpg", ".jpeg", ".png", ".bmp", ".webp", ".pdf", ".doc", ".docx"]
                .iter()
                .map(|s| s.to_string())
                .collect();

        let mut rules = BTreeMap::new();
        rules.insert(
            "table_ocr".to_string(),
            RuleSet {
                max_size_bytes: 10 * 1024 * 1024,
                allowed_extensions: common_extensions.clone(),
                min_dimension: 20,
                max_dimension: 10000,
            },
        );
        rules.insert(
            "extract_ocr".to_string(),
            RuleSet {
                max_size_bytes: 50 * 1024 * 1024,
                allowed_extensions: common_extensions,
                min_dimension: 20,
                max_dimension: 10000,
            },
        );
        Self { rules }
    }
}

impl FileChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in rules plus any extra `[rules.<mode>]` entries from config.
    pub fn with_extra_rules(extra: &BTreeMap<String, RuleSet>) -> Self {
        let mut checker = Self::default();
        for (mode, rule) in extra {
            checker.rules.insert(mode.clone(), rule.clone());
        }
        checker
    }

    pub fn supported_modes(&self) -> Vec<String> {
        self.rules.keys().cloned().collect()
    }

    pub fn rule(&self, mode: &str) -> Option<&RuleSet> {
        self.rules.get(mode)
    }

    /// Register a rule-set under a new or existing mode name.
    pub fn register(&mut self, mode: &str, rule: RuleSet) {
        self.rules.insert(mode.to_string(), rule);
    }

    /// Register from untyped data (e.g. a config fragment). A value missing
    /// any required field is rejected and the registry is left untouched.
    pub fn register_value(&mut self, mode: &str, value: &serde_json::Value) -> Result<()> {
        let rule: RuleSet = serde_json::from_value(value.clone())
            .with_context(|| format!("invalid rule-set for mode {mode}"))?;
        self.rules.insert(mode.to_string(), rule);
        Ok(())
    }

    /// Check one candidate file against the named mode's rules. Violations
    /// accumulate; the file is accepted only with an empty reason list.
    pub fn check(&self, path: &Path, mode: &str) -> CheckReport {
        let Some(rule) = self.rules.get(mode) else {
            return CheckReport::rejected(format!("unknown API mode: {mode}"));
        };

        if !path.is_file() {
            return CheckReport::rejected(format!("file not found: {}", path.display()));
        }

        let mut reasons = Vec::new();

        match std::fs::metadata(path) {
            Ok(meta) => {
                if meta.len() > rule.max_size_bytes {
                    reasons.push(format!(
                        "file too large: current size {}, limit {}",
                        format_mb(meta.len()),
                        format_mb_limit(rule.max_size_bytes)
                    ));
                }
            }
            Err(e) => reasons.push(format!("file read error: {e}")),
        }

        let ext = dotted_extension(path).unwrap_or_default();
        if !rule.allowed_extensions.iter().any(|a| a == &ext) {
            reasons.push(format!(
                "unsupported file format: {}, allowed: {}",
                if ext.is_empty() { "(none)" } else { ext.as_str() },
                rule.allowed_extensions.join(", ")
            ));
        }

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            match image::image_dimensions(path) {
                Ok((width, height)) => {
                    if width < rule.min_dimension
                        || height < rule.min_dimension
                        || width > rule.max_dimension
                        || height > rule.max_dimension
                    {
                        reasons.push(format!(
                            "image dimensions out of range: {}x{}, required {}-{}",
                            width, height, rule.min_dimension, rule.max_dimension
                        ));
                    }
                }
                Err(e) => {
                    error!("dimension probe failed for {}: {e}", path.display());
                    reasons.push(format!("image read error: {e}"));
                }
            }
        }

        CheckReport {
            accepted: reasons.is_empty(),
            reasons,
        }
    }
}
