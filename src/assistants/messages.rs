use crate::{
    assistants::Tool,
    client::{ListOrder, OpenAiClient},
    ApiResponseOrError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    /// The thread ID that this message belongs to.
    pub thread_id: String,
    /// The status of the message, which can be either in_progress, incomplete, or completed.
    #[serde(default)]
    pub status: Option<String>,
    /// The entity that produced the message. One of user or assistant
    pub role: Role,
    /// The content of the message.
    pub content: Vec<Content>,
    /// The assistant that produced the message.
    #[serde(default)]
    pub assistant_id: Option<String>,
    /// The ID of the run associated with the creation of this message. Value is null when messages are created manually using the create message or create thread endpoints.
    #[serde(default)]
    pub run_id: Option<String>,
    /// A list of files attached to the message.
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl Message {
    /// Concatenated text of every text part.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(Content::as_text)
            .map(|text| text.value.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: Text },
    ImageFile { image_file: ImageFile },
    ImageUrl { image_url: ImageUrl },
    Refusal { refusal: String },
    #[serde(other)]
    Unsupported,
}

impl Content {
    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Content::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Text {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    FileCitation {
        /// The marker in the message text that is being replaced.
        text: String,
        file_citation: FileCitation,
        start_index: u32,
        end_index: u32,
    },
    FilePath {
        text: String,
        file_path: FilePath,
        start_index: u32,
        end_index: u32,
    },
}

impl Annotation {
    /// The quoted passage of a file citation, when the API supplied one.
    pub fn quote(&self) -> Option<&str> {
        match self {
            Annotation::FileCitation { file_citation, .. } => file_citation
                .quote
                .as_deref()
                .filter(|quote| !quote.is_empty()),
            Annotation::FilePath { .. } => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileCitation {
    pub file_id: String,
    #[serde(default)]
    pub quote: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FilePath {
    pub file_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageFile {
    pub file_id: String,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Attachment {
    pub file_id: String,
    pub tools: Vec<Tool>,
}

impl Attachment {
    /// Attaches a file for both file search and code interpreter.
    pub fn searchable(file_id: impl Into<String>) -> Self {
        Attachment {
            file_id: file_id.into(),
            tools: vec![Tool::file_search(), Tool::CodeInterpreter],
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CreateMessageRequest {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl CreateMessageRequest {
    pub fn user(content: impl Into<String>, file_ids: Vec<String>) -> Self {
        let attachments = (!file_ids.is_empty())
            .then(|| file_ids.into_iter().map(Attachment::searchable).collect());
        CreateMessageRequest {
            role: Role::User,
            content: content.into(),
            attachments,
            metadata: None,
        }
    }
}

impl OpenAiClient {
    pub async fn create_message(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> ApiResponseOrError<Message> {
        self.post(format!("threads/{thread_id}/messages"), request)
            .await
    }

    /// Lists every message of a thread, oldest first.
    pub async fn list_messages(&self, thread_id: &str) -> ApiResponseOrError<Vec<Message>> {
        self.list(format!("threads/{thread_id}/messages"), ListOrder::Asc)
            .await
    }
}
