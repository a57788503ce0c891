pub mod extract;
pub mod status;
pub mod table;

use crate::config::Credentials;
use crate::error::RecognizeError;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// The two recognition kinds, each with its own endpoint, parameters and
/// validator rule-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMode {
    TableOcr,
    ExtractOcr,
}

impl ApiMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMode::TableOcr => "table_ocr",
            ApiMode::ExtractOcr => "extract_ocr",
        }
    }

    /// Upload ceiling enforced remotely, used for error-code wording.
    pub fn max_size_mb(&self) -> u64 {
        match self {
            ApiMode::TableOcr => 10,
            ApiMode::ExtractOcr => 50,
        }
    }
}

/// One recognition input: a local file or a remote URL. Consumed once.
#[derive(Debug, Clone)]
pub enum RecognitionInput {
    File(PathBuf),
    Url(String),
}

impl RecognitionInput {
    /// Input identity for logs and reports.
    pub fn label(&self) -> String {
        match self {
            RecognitionInput::File(p) => p.display().to_string(),
            RecognitionInput::Url(u) => u.clone(),
        }
    }
}

/// Blocking HTTP session shared by both client variants. Calls are strictly
/// sequential; there is one attempt per input and no retry.
pub struct HttpSession {
    client: Client,
    app_id: String,
    secret_code: String,
}

impl HttpSession {
    pub fn new(credentials: &Credentials, timeout_seconds: u64) -> Result<Self> {
        credentials.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self {
            client,
            app_id: credentials.app_id.clone(),
            secret_code: credentials.secret_code.clone(),
        })
    }

    /// POST one input to `endpoint` and parse the response body as JSON.
    /// URL inputs go as `text/plain` with the URL text as body; file inputs
    /// as `application/octet-stream` with the raw bytes.
    pub fn post(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        input: &RecognitionInput,
    ) -> Result<Value, RecognizeError> {
        let request = self
            .client
            .post(endpoint)
            .query(query)
            .header("x-ti-app-id", &self.app_id)
            .header("x-ti-secret-code", &self.secret_code);

        let request = match input {
            RecognitionInput::File(path) => {
                let bytes = std::fs::read(path)?;
                request
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .body(bytes)
            }
            RecognitionInput::Url(url) => {
                request.header(CONTENT_TYPE, "text/plain").body(url.clone())
            }
        };

        debug!("POST {endpoint} input={}", input.label());
        let response = request.send().map_err(|source| RecognizeError::Transport {
            input: input.label(),
            source,
        })?;

        response
            .json::<Value>()
            .map_err(|source| RecognizeError::Transport {
                input: input.label(),
                source,
            })
    }
}

/// The response's status field. `None` means the response is structurally
/// valid JSON but not a recognition response at all.
pub fn status_code(payload: &Value) -> Option<i64> {
    payload.get("code").and_then(Value::as_i64)
}

/// Writes raw responses for audit, named by a per-client counter that is
/// never reset between modes.
pub struct ResponseArchive {
    dir: PathBuf,
    counter: u64,
}

impl ResponseArchive {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            counter: 0,
        }
    }

    /// Persist one raw response; returns the sequence number used and the
    /// file path.
    pub fn save(&mut self, payload: &Value) -> std::io::Result<(u64, PathBuf)> {
        std::fs::create_dir_all(&self.dir)?;
        let index = self.counter;
        let path = self.dir.join(format!("{index}_response.json"));
        let pretty = serde_json::to_vec_pretty(payload).map_err(std::io::Error::other)?;
        std::fs::write(&path, pretty)?;
        self.counter += 1;
        debug!("archived response to {}", path.display());
        Ok((index, path))
    }
}
