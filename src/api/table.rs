use super::{ApiMode, HttpSession, RecognitionInput, ResponseArchive, status, status_code};
use crate::config::Config;
use crate::error::RecognizeError;
use crate::report::InputReport;
use crate::util::ensure_dir;
use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Table-recognition client. Each input yields one standalone workbook,
/// decoded from the base64 blob in the response; there is no merge step in
/// this mode.
pub struct TableClient {
    session: HttpSession,
    archive: ResponseArchive,
    endpoint: String,
    out_dir: PathBuf,
    output_order: String,
    url_count: u64,
}

impl TableClient {
    pub fn new(cfg: &Config, out_dir: &Path) -> Result<Self> {
        let session = HttpSession::new(&cfg.credentials, cfg.http.timeout_seconds)?;
        ensure_dir(out_dir)?;
        Ok(Self {
            session,
            archive: ResponseArchive::new(&out_dir.join(&cfg.paths.json_subdir)),
            endpoint: cfg.http.table_endpoint.clone(),
            out_dir: out_dir.to_path_buf(),
            output_order: cfg.table.output_order.clone(),
            url_count: 0,
        })
    }

    /// Recognize every input in order. A failed input is logged and skipped;
    /// the batch always runs to the end.
    pub fn recognize_batch(&mut self, files: &[PathBuf], urls: &[String]) -> Vec<InputReport> {
        let mut reports = Vec::new();

        let inputs = files
            .iter()
            .map(|p| RecognitionInput::File(p.clone()))
            .chain(urls.iter().map(|u| RecognitionInput::Url(u.clone())));

        for input in inputs {
            match self.recognize_one(&input) {
                Ok((archived, output)) => {
                    info!("saved table workbook: {}", output.display());
                    let mut entry = InputReport::ok(input.label());
                    entry.archived_json = Some(archived.display().to_string());
                    entry.output = Some(output.display().to_string());
                    reports.push(entry);
                }
                Err(err) => {
                    warn!(
                        kind = err.kind(),
                        input = %input.label(),
                        "input skipped: {err}"
                    );
                    reports.push(InputReport::failed(input.label(), &err));
                }
            }
        }

        reports
    }

    /// One outbound call; on success the decoded workbook blob is written
    /// next to the archival JSON.
    fn recognize_one(
        &mut self,
        input: &RecognitionInput,
    ) -> Result<(PathBuf, PathBuf), RecognizeError> {
        let query = [
            ("excel", "1".to_string()),
            ("output_order", self.output_order.clone()),
        ];
        let payload = self.session.post(&self.endpoint, &query, input)?;

        let code = status_code(&payload).ok_or_else(|| RecognizeError::MalformedResponse {
            input: input.label(),
            detail: "missing status code".to_string(),
        })?;
        if !status::is_success(code) {
            return Err(RecognizeError::Api {
                input: input.label(),
                code,
                description: status::describe(code, ApiMode::TableOcr),
            });
        }

        let (_, archived) = self.archive.save(&payload)?;

        let blob = payload
            .pointer("/result/excel")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| RecognizeError::MalformedResponse {
                input: input.label(),
                detail: "missing result.excel".to_string(),
            })?;
        let bytes = STANDARD
            .decode(blob)
            .map_err(|source| RecognizeError::Decode {
                input: input.label(),
                source,
            })?;

        let name = self.output_name(input);
        let output = self.out_dir.join(name);
        std::fs::write(&output, bytes)?;
        Ok((archived, output))
    }

    /// File inputs are named by their stem; URL inputs by a counter.
    fn output_name(&mut self, input: &RecognitionInput) -> String {
        match input {
            RecognitionInput::File(path) => {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("output");
                format!("{stem}.xlsx")
            }
            RecognitionInput::Url(_) => {
                let name = format!("url_{}.xlsx", self.url_count);
                self.url_count += 1;
                name
            }
        }
    }
}
