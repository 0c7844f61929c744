//! Error types for the harness.
//!
//! Remote failures keep their [`OpenAiError`] shape; everything the harness
//! adds on top (tool dispatch, polling limits, configuration, reports) lives
//! in [`Error`].

use thiserror::Error;

use crate::OpenAiError;

#[derive(Error, Debug)]
pub enum Error {
    /// The remote API rejected a call, or the transport failed.
    #[error("API error: {0}")]
    Api(#[from] OpenAiError),

    /// A tool call carried arguments that could not be decoded.
    #[error("invalid arguments for tool `{tool}`: {source}")]
    ToolArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    /// A tool call named a function that is not in the registry.
    #[error("unknown tool `{0}`")]
    UnknownTool(String),

    /// Polling stopped because the cancellation token fired.
    #[error("polling of run {run_id} was cancelled")]
    Cancelled { run_id: String },

    /// Polling stopped because the deadline passed.
    #[error("run {run_id} did not finish before the deadline")]
    DeadlineExceeded { run_id: String },

    /// A batch test finished with scenarios that stopped early.
    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("report error: {0}")]
    Report(#[from] rust_xlsxwriter::XlsxError),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, Error>;
