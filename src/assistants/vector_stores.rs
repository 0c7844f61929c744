use std::collections::HashMap;

use crate::{
    client::{ListOrder, OpenAiClient},
    ApiResponseOrError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VectorStore {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub usage_bytes: u64,
    pub file_counts: FileCounts,
    pub status: VectorStoreStatus,
    #[serde(default)]
    pub expires_after: Option<ExpiresAfter>,
    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub last_active_at: Option<u64>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FileCounts {
    pub in_progress: u32,
    pub completed: u32,
    pub failed: u32,
    pub cancelled: u32,
    pub total: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreStatus {
    Expired,
    InProgress,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExpiresAfter {
    pub anchor: String,
    pub days: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VectorStoreFile {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    pub vector_store_id: String,
    #[serde(default)]
    pub usage_bytes: u64,
    pub status: VectorStoreFileStatus,
    #[serde(default)]
    pub last_error: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreFileStatus {
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

impl OpenAiClient {
    pub async fn list_vector_stores(&self) -> ApiResponseOrError<Vec<VectorStore>> {
        self.list("vector_stores", ListOrder::Desc).await
    }

    pub async fn get_vector_store(&self, vector_store_id: &str) -> ApiResponseOrError<VectorStore> {
        self.get(format!("vector_stores/{vector_store_id}")).await
    }

    pub async fn list_vector_store_files(
        &self,
        vector_store_id: &str,
    ) -> ApiResponseOrError<Vec<VectorStoreFile>> {
        self.list(format!("vector_stores/{vector_store_id}/files"), ListOrder::Desc)
            .await
    }
}
