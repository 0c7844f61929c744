use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    client::{Deleted, List, OpenAiClient},
    ApiResponseOrError, OpenAiError,
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct File {
    pub id: String,
    pub object: String,
    pub bytes: u64,
    pub created_at: u64,
    pub filename: String,
    pub purpose: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FilePurpose {
    Assistants,
    AssistantsOutput,
    Batch,
    BatchOutput,
    FineTune,
    FineTuneResults,
    Vision,
}

impl OpenAiClient {
    pub async fn list_files(&self) -> ApiResponseOrError<Vec<File>> {
        // The files endpoint ignores cursor parameters on older deployments,
        // so a single page is requested.
        let files: List<File> = self.get("files").await?;
        Ok(files.data)
    }

    pub async fn get_file(&self, file_id: &str) -> ApiResponseOrError<File> {
        self.get(format!("files/{file_id}")).await
    }

    pub async fn delete_file(&self, file_id: &str) -> ApiResponseOrError<Deleted> {
        self.delete(format!("files/{file_id}")).await
    }

    pub async fn upload_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        purpose: FilePurpose,
    ) -> ApiResponseOrError<File> {
        let file_part = Part::bytes(bytes).file_name(filename.to_string());

        let form = Form::new()
            .part("file", file_part)
            .text("purpose", purpose.to_string());

        self.post_multipart("files", form).await
    }

    /// Uploads a local file for use by assistants.
    pub async fn create_file(&self, path: impl AsRef<Path>) -> ApiResponseOrError<File> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                OpenAiError::new(
                    format!("`{}` does not name a file", path.display()),
                    "io".to_string(),
                )
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;

        let file = self
            .upload_file(&filename, bytes, FilePurpose::Assistants)
            .await?;
        info!(file_id = %file.id, filename = %file.filename, "file uploaded");
        Ok(file)
    }
}
