use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use walkdir::WalkDir;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Every regular file under `dir`, recursively, in a stable (sorted) order.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("input directory does not exist: {}", dir.display());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        if entry.file_type().is_file() {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

/// Bytes rendered as megabytes with two decimals, e.g. `15.00MB`.
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / 1024.0 / 1024.0)
}

/// Whole-megabyte rendering for limits, e.g. `10MB`. Falls back to the
/// two-decimal form when the limit is not MiB-aligned.
pub fn format_mb_limit(bytes: u64) -> String {
    if bytes % (1024 * 1024) == 0 {
        format!("{}MB", bytes / 1024 / 1024)
    } else {
        format_mb(bytes)
    }
}

/// Lowercased extension with leading dot, if any.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}
