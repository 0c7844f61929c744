use std::collections::HashMap;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{
    client::{Deleted, ListOrder, OpenAiClient},
    config::UserProfile,
    tools::ToolRegistry,
    ApiResponseOrError, AssistantsApi, Error, Result,
};

pub const DEFAULT_ASSISTANT_NAME: &str = "智能客服";
pub const DEFAULT_ASSISTANT_MODEL: &str = "gpt-4-turbo-preview";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Assistant {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    /// The name of the assistant. The maximum length is 256 characters.
    pub name: Option<String>,
    /// ID of the model to use.
    pub model: String,
    /// The system instructions that the assistant uses. The maximum length is 256,000 characters.
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    /// A set of resources that are used by the assistant's tools. The code_interpreter tool requires a list of file IDs, while the file_search tool requires a list of vector store IDs.
    pub tool_resources: Option<ToolResources>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    CodeInterpreter,
    FileSearch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_search: Option<FileSearch>,
    },
    Function {
        function: FunctionDefinition,
    },
}

impl Tool {
    pub fn file_search() -> Self {
        Tool::FileSearch { file_search: None }
    }

    pub fn function(function: FunctionDefinition) -> Self {
        Tool::Function { function }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the arguments object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct FileSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_num_results: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ToolResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_interpreter: Option<CodeInterpreterResources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_search: Option<FileSearchResources>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CodeInterpreterResources {
    /// A list of file IDs made available to the `code_interpreter` tool. There can be a maximum of 20 files associated with the tool.
    #[serde(default)]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct FileSearchResources {
    /// The vector stores attached to this assistant. There can be a maximum of 1 vector store attached to the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vector_store_ids: Vec<String>,
    /// Vector stores to create from file ids when the assistant is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_stores: Option<Vec<NewVectorStore>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct NewVectorStore {
    pub file_ids: Vec<String>,
}

#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct CreateAssistantRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// Everything needed to stand up a customer-service assistant.
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(pattern = "owned")]
#[builder(name = "AssistantSpecBuilder")]
#[builder(setter(into))]
pub struct AssistantSpec {
    #[builder(default = "DEFAULT_ASSISTANT_MODEL.to_string()")]
    pub model: String,
    #[builder(default = "DEFAULT_ASSISTANT_NAME.to_string()")]
    pub name: String,
    #[builder(default)]
    pub instructions: Option<String>,
    /// Uploaded files; a non-empty list enables code interpreter and file search.
    #[builder(default)]
    pub file_ids: Vec<String>,
    /// Existing vector stores to search.
    #[builder(default)]
    pub vector_store_ids: Vec<String>,
}

impl AssistantSpec {
    pub fn builder() -> AssistantSpecBuilder {
        AssistantSpecBuilder::default()
    }

    /// Renders the request body, declaring every tool in `registry`.
    ///
    /// An assistant searches at most one vector store, so uploaded files and
    /// existing vector stores cannot be combined.
    pub fn request(&self, registry: &ToolRegistry) -> Result<CreateAssistantRequest> {
        let with_files = !self.file_ids.is_empty();
        let with_stores = !self.vector_store_ids.is_empty();
        if with_files && with_stores {
            return Err(Error::Config(
                "an assistant takes either file ids or vector store ids, not both".to_string(),
            ));
        }

        let mut tools = Vec::new();
        if with_files {
            tools.push(Tool::CodeInterpreter);
        }
        if with_files || with_stores {
            tools.push(Tool::file_search());
        }
        tools.extend(registry.declarations());

        let tool_resources = (with_files || with_stores).then(|| ToolResources {
            code_interpreter: None,
            file_search: Some(FileSearchResources {
                vector_store_ids: self.vector_store_ids.clone(),
                vector_stores: with_files.then(|| {
                    vec![NewVectorStore {
                        file_ids: self.file_ids.clone(),
                    }]
                }),
            }),
        });

        Ok(CreateAssistantRequest {
            model: self.model.clone(),
            name: Some(self.name.clone()),
            instructions: self.instructions.clone(),
            tools,
            tool_resources,
            ..Default::default()
        })
    }

    pub async fn create<A>(&self, api: &A, registry: &ToolRegistry) -> Result<Assistant>
    where
        A: AssistantsApi + ?Sized,
    {
        let assistant = api.create_assistant(self.request(registry)?).await?;
        info!(assistant_id = %assistant.id, model = %assistant.model, "assistant created");
        Ok(assistant)
    }
}

/// System instructions for the customer-service persona, listing what is
/// known about the user.
pub fn customer_service_instructions(profile: &UserProfile) -> String {
    let mut instructions = String::from("你是一位客服。\n\n底下是使用者的資訊：\n");
    for (key, value) in profile.iter() {
        instructions.push_str(&format!("{key}: {value}\n"));
    }
    instructions
}

impl OpenAiClient {
    pub async fn create_assistant(
        &self,
        request: CreateAssistantRequest,
    ) -> ApiResponseOrError<Assistant> {
        self.post("assistants", request).await
    }

    pub async fn list_assistants(&self) -> ApiResponseOrError<Vec<Assistant>> {
        self.list("assistants", ListOrder::Desc).await
    }

    pub async fn get_assistant(&self, assistant_id: &str) -> ApiResponseOrError<Assistant> {
        self.get(format!("assistants/{}", assistant_id)).await
    }

    pub async fn delete_assistant(&self, assistant_id: &str) -> ApiResponseOrError<Deleted> {
        self.delete(format!("assistants/{}", assistant_id)).await
    }
}
