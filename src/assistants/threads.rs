use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::{assistants::ToolResources, client::OpenAiClient, ApiResponseOrError};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Thread {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    /// Resources made available to the assistant's tools in this thread.
    #[serde(default)]
    pub tool_resources: Option<ToolResources>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl OpenAiClient {
    /// Creates an empty thread.
    pub async fn create_thread(&self) -> ApiResponseOrError<Thread> {
        self.post("threads", json!({})).await
    }
}
