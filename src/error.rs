use thiserror::Error;

/// Failure of a single recognition input. The batch loop collects one
/// `Result<_, RecognizeError>` per input; nothing here aborts the run.
#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("transport error for {input}: {source}")]
    Transport {
        input: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API status {code} for {input}: {description}")]
    Api {
        input: String,
        code: i64,
        description: String,
    },

    #[error("malformed response for {input}: {detail}")]
    MalformedResponse { input: String, detail: String },

    #[error("base64 decode failed for {input}: {source}")]
    Decode {
        input: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecognizeError {
    /// Short machine-friendly kind for the batch report.
    pub fn kind(&self) -> &'static str {
        match self {
            RecognizeError::Transport { .. } => "transport",
            RecognizeError::Api { .. } => "api_status",
            RecognizeError::MalformedResponse { .. } => "malformed_response",
            RecognizeError::Decode { .. } => "decode",
            RecognizeError::Io(_) => "io",
        }
    }
}
