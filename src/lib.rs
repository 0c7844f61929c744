use serde::{Deserialize, Serialize};
use std::env;

pub mod api;
pub mod assistants;
pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod driver;
pub mod embeddings;
pub mod error;
pub mod files;
pub mod harness;
pub mod models;
pub mod tools;

pub use api::AssistantsApi;
pub use client::OpenAiClient;
pub use error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenAiError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl OpenAiError {
    pub fn new(message: String, error_type: String) -> OpenAiError {
        OpenAiError {
            message,
            error_type,
            param: None,
            code: None,
        }
    }
}

impl std::fmt::Display for OpenAiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for OpenAiError {}

impl From<reqwest::Error> for OpenAiError {
    fn from(value: reqwest::Error) -> Self {
        OpenAiError::new(value.to_string(), "http".to_string())
    }
}

impl From<std::io::Error> for OpenAiError {
    fn from(value: std::io::Error) -> Self {
        OpenAiError::new(value.to_string(), "io".to_string())
    }
}

/// Result of any call against the remote API.
pub type ApiResponseOrError<T> = std::result::Result<T, OpenAiError>;

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// API key and base URL used to build an [`OpenAiClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Credentials {
    /// Creates credentials, making sure the base URL ends with a slash so
    /// routes can be appended directly.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Credentials {
            api_key: api_key.into(),
            base_url,
        }
    }

    /// Reads `OPENAI_KEY` and `OPENAI_BASE_URL` from the environment.
    ///
    /// ## Examples
    ///
    /// Use environment variables defined from a `.env` file:
    ///
    /// ```rust,no_run
    /// use assistant_cli::Credentials;
    /// use dotenvy::dotenv;
    ///
    /// dotenv().ok();
    /// let credentials = Credentials::from_env().unwrap();
    /// ```
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_KEY").map_err(|_| {
            Error::Config("environment variable `OPENAI_KEY` should be defined".to_string())
        })?;
        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Credentials::new(api_key, base_url))
    }
}
