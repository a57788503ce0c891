use crate::validator::RuleSet;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub table: Table,
    #[serde(default)]
    pub extract: Extract,
    /// Extra validator rule-sets, keyed by mode name. Each entry must carry
    /// all four fields; a partial table is a parse error.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSet>,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Default::default(),
            http: Default::default(),
            paths: Default::default(),
            table: Default::default(),
            extract: Default::default(),
            rules: Default::default(),
            logging: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub app_id: String,
    pub secret_code: String,
}
impl Default for Credentials {
    fn default() -> Self {
        Self {
            app_id: "".into(),
            secret_code: "".into(),
        }
    }
}

impl Credentials {
    /// Both tokens are opaque; the only local check is non-emptiness.
    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() || self.secret_code.trim().is_empty() {
            anyhow::bail!("credentials.app_id and credentials.secret_code must be non-empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Http {
    pub table_endpoint: String,
    pub extract_endpoint: String,
    pub timeout_seconds: u64,
}
impl Default for Http {
    fn default() -> Self {
        Self {
            table_endpoint: "https://api.textin.com/ai/service/v2/recognize/table/multipage"
                .into(),
            extract_endpoint: "https://api.textin.com/ai/service/v1/entity_extraction".into(),
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub table_out_dir: String,
    pub extract_out_dir: String,
    /// Subdirectory of the mode's out_dir holding archival JSON responses.
    pub json_subdir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            table_out_dir: "output_table".into(),
            extract_out_dir: "output_extract".into(),
            json_subdir: "json_files".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Passed through verbatim as the `output_order` query parameter.
    pub output_order: String,
}
impl Default for Table {
    fn default() -> Self {
        Self {
            output_order: "perpendicula".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extract {
    /// Extraction hints, comma-joined into the `key` query parameter.
    pub field_keys: Vec<String>,
    /// Comma-joined into the `table_header` query parameter; also the
    /// preferred column ordering for projected table cells.
    pub table_header_keys: Vec<String>,
    pub output_filename: String,
    pub occurrence_policy: OccurrencePolicy,
    /// Also write one standalone workbook per input next to the merged one.
    pub export_single_files: bool,
}
impl Default for Extract {
    fn default() -> Self {
        Self {
            field_keys: Vec::new(),
            table_header_keys: Vec::new(),
            output_filename: "combined.xlsx".into(),
            occurrence_policy: OccurrencePolicy::First,
            export_single_files: false,
        }
    }
}

/// How multiple value occurrences of one field within a single detail
/// structure are flattened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccurrencePolicy {
    #[default]
    First,
    Last,
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
