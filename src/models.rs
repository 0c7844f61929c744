//! List the models available to the configured key.

use serde::{Deserialize, Serialize};

use crate::{
    client::{List, OpenAiClient},
    ApiResponseOrError,
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Model {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub owned_by: String,
}

impl OpenAiClient {
    pub async fn list_models(&self) -> ApiResponseOrError<Vec<Model>> {
        let models: List<Model> = self.get("models").await?;
        Ok(models.data)
    }
}
