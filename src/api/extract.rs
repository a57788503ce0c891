use super::{ApiMode, HttpSession, RecognitionInput, ResponseArchive, status, status_code};
use crate::config::Config;
use crate::error::RecognizeError;
use crate::project::{FlatRecord, ProjectOptions, Projection, project};
use crate::report::{BatchReport, InputReport};
use crate::sink;
use crate::util::{ensure_dir, now_rfc3339};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Entity-extraction client. Per-input results are projected into
/// FlatRecords, accumulated across the batch, and merged into one workbook
/// (sheets `Fields` and `TableCells`) at batch end.
pub struct ExtractClient {
    session: HttpSession,
    archive: ResponseArchive,
    endpoint: String,
    out_dir: PathBuf,
    /// The hint keys double as the preferred column ordering.
    options: ProjectOptions,
    output_filename: String,
    export_single_files: bool,
}

impl ExtractClient {
    pub fn new(cfg: &Config, out_dir: &Path) -> Result<Self> {
        let session = HttpSession::new(&cfg.credentials, cfg.http.timeout_seconds)?;
        ensure_dir(out_dir)?;
        Ok(Self {
            session,
            archive: ResponseArchive::new(&out_dir.join(&cfg.paths.json_subdir)),
            endpoint: cfg.http.extract_endpoint.clone(),
            out_dir: out_dir.to_path_buf(),
            options: ProjectOptions {
                field_order: cfg.extract.field_keys.clone(),
                table_order: cfg.extract.table_header_keys.clone(),
                occurrence: cfg.extract.occurrence_policy,
            },
            output_filename: cfg.extract.output_filename.clone(),
            export_single_files: cfg.extract.export_single_files,
        })
    }

    /// Recognize every input in order, then write the merged artifact once.
    /// Per-input failures are collected into the report, never escalated.
    pub fn recognize_batch(&mut self, files: &[PathBuf], urls: &[String]) -> BatchReport {
        let started = now_rfc3339();
        let mut all_fields: Vec<FlatRecord> = Vec::new();
        let mut all_table_cells: Vec<FlatRecord> = Vec::new();
        let mut reports = Vec::new();

        let inputs = files
            .iter()
            .map(|p| RecognitionInput::File(p.clone()))
            .chain(urls.iter().map(|u| RecognitionInput::Url(u.clone())));

        for input in inputs {
            match self.recognize_one(&input) {
                Ok((projection, index, archived)) => {
                    let mut entry = InputReport::ok(input.label());
                    entry.archived_json = Some(archived.display().to_string());
                    entry.fields_rows = Some(
                        projection
                            .fields
                            .as_ref()
                            .map_or(0, FlatRecord::row_count),
                    );
                    entry.table_cell_rows = Some(
                        projection
                            .table_cells
                            .as_ref()
                            .map_or(0, FlatRecord::row_count),
                    );
                    reports.push(entry);

                    if self.export_single_files {
                        self.write_single_files(&projection, index);
                    }
                    if let Some(fields) = projection.fields {
                        if !fields.is_empty() {
                            all_fields.push(fields);
                        }
                    }
                    if let Some(cells) = projection.table_cells {
                        if !cells.is_empty() {
                            all_table_cells.push(cells);
                        }
                    }
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

        let artifact = self.out_dir.join(&self.output_filename);
        sink::export(&all_fields, &artifact, "Fields");
        sink::export(&all_table_cells, &artifact, "TableCells");
        info!("batch finished, output under {}", self.out_dir.display());

        BatchReport {
            mode: ApiMode::ExtractOcr.as_str().to_string(),
            started,
            finished: now_rfc3339(),
            accepted_inputs: files.len() + urls.len(),
            inputs: reports,
        }
    }

    fn recognize_one(
        &mut self,
        input: &RecognitionInput,
    ) -> Result<(Projection, u64, PathBuf), RecognizeError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if !self.options.field_order.is_empty() {
            query.push(("key", self.options.field_order.join(",")));
        }
        if !self.options.table_order.is_empty() {
            query.push(("table_header", self.options.table_order.join(",")));
        }

        let payload = self.session.post(&self.endpoint, &query, input)?;

        let code = status_code(&payload).ok_or_else(|| RecognizeError::MalformedResponse {
            input: input.label(),
            detail: "missing status code".to_string(),
        })?;
        if !status::is_success(code) {
            return Err(RecognizeError::Api {
                input: input.label(),
                code,
                description: status::describe(code, ApiMode::ExtractOcr),
            });
        }

        let (index, archived) = self.archive.save(&payload)?;
        let projection = project(&payload, &self.options);
        Ok((projection, index, archived))
    }

    /// Standalone per-input workbooks under `single_files/`, numbered by the
    /// archival counter. Write failures are logged like any export failure.
    fn write_single_files(&self, projection: &Projection, index: u64) {
        let dir = self.out_dir.join("single_files");
        if let Some(fields) = &projection.fields {
            sink::export(
                std::slice::from_ref(fields),
                &dir.join(format!("{index}_fields.xlsx")),
                "Fields",
            );
        }
        if let Some(cells) = &projection.table_cells {
            sink::export(
                std::slice::from_ref(cells),
                &dir.join(format!("{index}_table_cells.xlsx")),
                "TableCells",
            );
        }
    }
}
