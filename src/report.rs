use crate::error::RecognizeError;
use serde::{Deserialize, Serialize};

/// Outcome of one whole batch run, serialized next to the artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub mode: String,
    pub started: String,
    pub finished: String,
    pub accepted_inputs: usize,
    pub inputs: Vec<InputReport>,
}

/// Per-input outcome. Failures carry their kind and message so a batch can
/// be diagnosed without halting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputReport {
    pub input: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_cell_rows: Option<usize>,
}

impl InputReport {
    pub fn ok(input: String) -> Self {
        Self {
            input,
            ok: true,
            error_kind: None,
            error: None,
            archived_json: None,
            output: None,
            fields_rows: None,
            table_cell_rows: None,
        }
    }

    pub fn failed(input: String, err: &RecognizeError) -> Self {
        Self {
            input,
            ok: false,
            error_kind: Some(err.kind().to_string()),
            error: Some(err.to_string()),
            archived_json: None,
            output: None,
            fields_rows: None,
            table_cell_rows: None,
        }
    }
}
