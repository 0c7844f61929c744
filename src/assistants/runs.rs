use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{client::OpenAiClient, ApiResponseOrError, Usage};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Run {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    /// The ID of the assistant used for this run.
    pub assistant_id: String,
    /// The ID of the thread associated with this run.
    pub thread_id: String,
    /// The status of the run.
    pub status: Status,
    /// Details on the action required to continue the run. Will be null if no action is required.
    #[serde(default)]
    pub required_action: Option<RequiredAction>,

    /// The last error that occurred during this run.
    #[serde(default)]
    pub last_error: Option<LastError>,

    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub started_at: Option<u64>,
    #[serde(default)]
    pub completed_at: Option<u64>,
    #[serde(default)]
    pub cancelled_at: Option<u64>,
    #[serde(default)]
    pub failed_at: Option<u64>,

    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,

    /// Token usage, present once the run is terminal.
    #[serde(default)]
    pub usage: Option<Usage>,

    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl Run {
    /// Tool calls the run is blocked on, empty unless the status is `requires_action`.
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        match &self.required_action {
            Some(RequiredAction::SubmitToolOutputs {
                submit_tool_outputs,
            }) => &submit_tool_outputs.tool_calls,
            None => &[],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl Status {
    /// Whether the remote service will never move the run again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Cancelled
                | Status::Failed
                | Status::Completed
                | Status::Expired
                | Status::Incomplete
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequiredAction {
    SubmitToolOutputs {
        submit_tool_outputs: PendingToolCalls,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PendingToolCalls {
    pub tool_calls: Vec<ToolCall>,
}

/// A request from the model to run a local function.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    /// Always `function` for calls that need a local answer.
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    /// The arguments as generated by the model, in JSON format. The model
    /// does not always generate valid JSON.
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LastError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SubmitToolOutputsRequest {
    pub tool_outputs: Vec<ToolOutput>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

#[derive(Serialize, Builder, Debug, Clone, Default, PartialEq)]
#[builder(pattern = "owned")]
#[builder(name = "CreateRunBuilder")]
#[builder(setter(strip_option, into))]
pub struct CreateRunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub model: Option<String>,
    /// Appended to the assistant's instructions for this run only.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub additional_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub max_completion_tokens: Option<u32>,
}

impl CreateRunRequest {
    pub fn new(assistant_id: impl Into<String>) -> Self {
        CreateRunRequest {
            assistant_id: assistant_id.into(),
            ..Default::default()
        }
    }
}

impl OpenAiClient {
    pub async fn create_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> ApiResponseOrError<Run> {
        self.post(format!("threads/{thread_id}/runs"), request)
            .await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> ApiResponseOrError<Run> {
        self.get(format!("threads/{thread_id}/runs/{run_id}")).await
    }

    pub async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        request: SubmitToolOutputsRequest,
    ) -> ApiResponseOrError<Run> {
        self.post(
            format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            request,
        )
        .await
    }
}
