//! Get a vector representation of a given input that can be easily consumed by machine learning models and algorithms.

use serde::{Deserialize, Serialize};

use crate::{client::OpenAiClient, ApiResponseOrError, OpenAiError};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Serialize, Debug, Clone)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<Embedding>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Embedding {
    pub index: usize,
    #[serde(rename = "embedding")]
    pub vec: Vec<f32>,
}

impl OpenAiClient {
    /// Embeds every input, returning the vectors in input order.
    pub async fn create_embeddings(
        &self,
        model: &str,
        input: &[String],
    ) -> ApiResponseOrError<Vec<Vec<f32>>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let response: EmbeddingResponse = self
            .post("embeddings", EmbeddingRequest { model, input })
            .await?;
        let mut data = response.data;
        if data.len() != input.len() {
            return Err(OpenAiError::new(
                format!(
                    "expected {} embeddings, received {}",
                    input.len(),
                    data.len()
                ),
                "invalid_response".to_string(),
            ));
        }
        data.sort_by_key(|embedding| embedding.index);

        Ok(data.into_iter().map(|embedding| embedding.vec).collect())
    }
}
