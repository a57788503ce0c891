use crate::{
    api::{extract::ExtractClient, table::TableClient},
    config::Config,
    util::{ensure_dir, walk_files},
    validator::FileChecker,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sheetpipe")]
#[command(about = "Batch OCR recognition client (table + entity extraction) with spreadsheet projection")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./sheetpipe.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate files against a mode's upload rules. No network.
    Check {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "table_ocr")]
        mode: String,
    },
    /// Table recognition: one standalone workbook per input.
    Table {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long = "url")]
        urls: Vec<String>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Entity extraction: merged Fields/TableCells workbook per batch.
    Extract {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long = "url")]
        urls: Vec<String>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Check { input, mode } => {
            let _guard = init_logging(&args, &cfg, None)?;
            check(&cfg, input, mode)
        }
        Command::Table {
            input,
            urls,
            out_dir,
        } => {
            let out = out_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&cfg.paths.table_out_dir));
            let _guard = init_logging(&args, &cfg, Some(&out))?;
            table(&cfg, input.as_deref(), urls, &out)
        }
        Command::Extract {
            input,
            urls,
            out_dir,
        } => {
            let out = out_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&cfg.paths.extract_out_dir));
            let _guard = init_logging(&args, &cfg, Some(&out))?;
            extract(&cfg, input.as_deref(), urls, &out)
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("sheetpipe.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("sheetpipe.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, out_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = resolve_log_path(cfg, out_dir) {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(&path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config, out_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(
        out_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetpipe.log"),
    )
}

fn check(cfg: &Config, input: &Path, mode: &str) -> Result<()> {
    let checker = FileChecker::with_extra_rules(&cfg.rules);
    let files = walk_files(input)?;

    let mut valid = 0usize;
    let mut rejected = Vec::new();
    for file in &files {
        let report = checker.check(file, mode);
        if report.accepted {
            valid += 1;
        } else {
            rejected.push(serde_json::json!({
                "file": file,
                "reasons": report.reasons,
            }));
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "mode": mode,
            "total": files.len(),
            "valid": valid,
            "rejected": rejected,
        }))?
    );
    Ok(())
}

/// Walk and validate, keeping only files that pass the mode's rules.
/// Rejections are logged per file; they never abort the batch.
fn collect_valid_files(
    cfg: &Config,
    input: Option<&Path>,
    mode: &str,
) -> Result<Vec<PathBuf>> {
    let Some(dir) = input else {
        return Ok(Vec::new());
    };
    let checker = FileChecker::with_extra_rules(&cfg.rules);
    let files = walk_files(dir)?;
    let total = files.len();

    let mut valid = Vec::new();
    for file in files {
        let report = checker.check(&file, mode);
        if report.accepted {
            valid.push(file);
        } else {
            warn!("rejected {}: {}", file.display(), report.reasons.join("; "));
        }
    }

    info!("{}/{} files pass {} rules", valid.len(), total, mode);
    Ok(valid)
}

fn table(cfg: &Config, input: Option<&Path>, urls: &[String], out_dir: &Path) -> Result<()> {
    let files = collect_valid_files(cfg, input, "table_ocr")?;
    if files.is_empty() && urls.is_empty() {
        warn!("nothing to recognize");
        return Ok(());
    }

    let mut client = TableClient::new(cfg, out_dir)?;
    let reports = client.recognize_batch(&files, urls);
    let ok = reports.iter().filter(|r| r.ok).count();
    info!("table batch done: {}/{} inputs succeeded", ok, reports.len());
    Ok(())
}

fn extract(cfg: &Config, input: Option<&Path>, urls: &[String], out_dir: &Path) -> Result<()> {
    let files = collect_valid_files(cfg, input, "extract_ocr")?;
    if files.is_empty() && urls.is_empty() {
        warn!("nothing to recognize");
        return Ok(());
    }

    let mut client = ExtractClient::new(cfg, out_dir)?;
    let report = client.recognize_batch(&files, urls);

    let report_path = out_dir.join("batch_report.json");
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("writing {}", report_path.display()))?;

    let ok = report.inputs.iter().filter(|r| r.ok).count();
    info!(
        "extract batch done: {}/{} inputs succeeded, report at {}",
        ok,
        report.inputs.len(),
        report_path.display()
    );
    Ok(())
}
