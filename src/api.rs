//! The slice of the remote API that conversations are driven through.
//!
//! Chat sessions, the run driver and the test harness only see this trait,
//! so tests can script the remote side.

use async_trait::async_trait;

use crate::{
    assistants::{
        messages::{CreateMessageRequest, Message},
        runs::{CreateRunRequest, Run, SubmitToolOutputsRequest},
        threads::Thread,
        Assistant, CreateAssistantRequest,
    },
    client::OpenAiClient,
    ApiResponseOrError,
};

#[async_trait]
pub trait AssistantsApi: Send + Sync {
    async fn create_assistant(&self, request: CreateAssistantRequest)
        -> ApiResponseOrError<Assistant>;

    async fn create_thread(&self) -> ApiResponseOrError<Thread>;

    async fn create_message(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> ApiResponseOrError<Message>;

    /// Every message of the thread, oldest first.
    async fn list_messages(&self, thread_id: &str) -> ApiResponseOrError<Vec<Message>>;

    async fn create_run(&self, thread_id: &str, request: CreateRunRequest)
        -> ApiResponseOrError<Run>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> ApiResponseOrError<Run>;

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        request: SubmitToolOutputsRequest,
    ) -> ApiResponseOrError<Run>;

    /// One vector per input, in input order.
    async fn create_embeddings(
        &self,
        model: &str,
        input: &[String],
    ) -> ApiResponseOrError<Vec<Vec<f32>>>;
}

#[async_trait]
impl AssistantsApi for OpenAiClient {
    async fn create_assistant(
        &self,
        request: CreateAssistantRequest,
    ) -> ApiResponseOrError<Assistant> {
        OpenAiClient::create_assistant(self, request).await
    }

    async fn create_thread(&self) -> ApiResponseOrError<Thread> {
        OpenAiClient::create_thread(self).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> ApiResponseOrError<Message> {
        OpenAiClient::create_message(self, thread_id, request).await
    }

    async fn list_messages(&self, thread_id: &str) -> ApiResponseOrError<Vec<Message>> {
        OpenAiClient::list_messages(self, thread_id).await
    }

    async fn create_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> ApiResponseOrError<Run> {
        OpenAiClient::create_run(self, thread_id, request).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> ApiResponseOrError<Run> {
        OpenAiClient::get_run(self, thread_id, run_id).await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        request: SubmitToolOutputsRequest,
    ) -> ApiResponseOrError<Run> {
        OpenAiClient::submit_tool_outputs(self, thread_id, run_id, request).await
    }

    async fn create_embeddings(
        &self,
        model: &str,
        input: &[String],
    ) -> ApiResponseOrError<Vec<Vec<f32>>> {
        OpenAiClient::create_embeddings(self, model, input).await
    }
}
