#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use assistant_cli::{
    assistants::{
        messages::{CreateMessageRequest, Message},
        runs::{CreateRunRequest, Run, SubmitToolOutputsRequest},
        threads::Thread,
        Assistant, CreateAssistantRequest,
    },
    ApiResponseOrError, AssistantsApi, OpenAiError,
};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const REPLY: &str = "请提供您的会员帐号，我们将协助您重设密码。";

pub fn run(id: &str, thread_id: &str, status: &str) -> Run {
    serde_json::from_value(json!({
        "id": id,
        "object": "thread.run",
        "created_at": 1700000000,
        "assistant_id": "asst_1",
        "thread_id": thread_id,
        "status": status,
    }))
    .unwrap()
}

/// A `requires_action` snapshot asking for `calls` as `(id, name, arguments)`.
pub fn requires_action(id: &str, thread_id: &str, calls: &[(&str, &str, &str)]) -> Run {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(call_id, name, arguments)| {
            json!({
                "id": call_id,
                "type": "function",
                "function": { "name": name, "arguments": arguments }
            })
        })
        .collect();
    serde_json::from_value(json!({
        "id": id,
        "object": "thread.run",
        "created_at": 1700000000,
        "assistant_id": "asst_1",
        "thread_id": thread_id,
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_outputs",
            "submit_tool_outputs": { "tool_calls": tool_calls }
        }
    }))
    .unwrap()
}

pub fn message(id: &str, thread_id: &str, role: &str, text: &str) -> Message {
    serde_json::from_value(json!({
        "id": id,
        "object": "thread.message",
        "created_at": 1700000000,
        "thread_id": thread_id,
        "role": role,
        "content": [{ "type": "text", "text": { "value": text, "annotations": [] } }]
    }))
    .unwrap()
}

/// In-memory stand-in for the remote service.
///
/// `get_run` pops scripted snapshots in order; once the script is exhausted
/// every run reports `completed`, and the first time a run completes an
/// assistant reply is appended to its thread.
#[derive(Default)]
pub struct FakeApi {
    script: Mutex<VecDeque<Run>>,
    threads: Mutex<HashMap<String, Vec<Message>>>,
    answered: Mutex<Vec<String>>,
    pub polls: AtomicUsize,
    pub threads_created: AtomicUsize,
    pub runs_created: AtomicUsize,
    pub assistants: Mutex<Vec<CreateAssistantRequest>>,
    pub runs: Mutex<Vec<CreateRunRequest>>,
    pub message_requests: Mutex<Vec<CreateMessageRequest>>,
    pub submissions: Mutex<Vec<SubmitToolOutputsRequest>>,
    /// Every observable call in order, e.g. `get_run`, `submit`.
    pub calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(snapshots: impl IntoIterator<Item = Run>) -> Self {
        let api = Self::default();
        api.script.lock().unwrap().extend(snapshots);
        api
    }

    pub fn messages(&self, thread_id: &str) -> Vec<Message> {
        self.threads
            .lock()
            .unwrap()
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl AssistantsApi for FakeApi {
    async fn create_assistant(
        &self,
        request: CreateAssistantRequest,
    ) -> ApiResponseOrError<Assistant> {
        let mut assistants = self.assistants.lock().unwrap();
        let assistant = serde_json::from_value(json!({
            "id": format!("asst_{}", assistants.len() + 1),
            "object": "assistant",
            "created_at": 1700000000,
            "name": request.name,
            "model": request.model,
            "instructions": request.instructions,
            "tools": request.tools,
        }))
        .unwrap();
        assistants.push(request);
        Ok(assistant)
    }

    async fn create_thread(&self) -> ApiResponseOrError<Thread> {
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("thread_{n}");
        self.threads.lock().unwrap().insert(id.clone(), Vec::new());
        Ok(serde_json::from_value(json!({
            "id": id,
            "object": "thread",
            "created_at": 1700000000,
        }))
        .unwrap())
    }

    async fn create_message(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> ApiResponseOrError<Message> {
        let mut threads = self.threads.lock().unwrap();
        let messages = threads
            .get_mut(thread_id)
            .ok_or_else(|| OpenAiError::new(format!("no thread {thread_id}"), "not_found".to_string()))?;
        let message = message(
            &format!("msg_{}", messages.len() + 1),
            thread_id,
            "user",
            &request.content,
        );
        messages.push(message.clone());
        self.message_requests.lock().unwrap().push(request);
        Ok(message)
    }

    async fn list_messages(&self, thread_id: &str) -> ApiResponseOrError<Vec<Message>> {
        Ok(self.messages(thread_id))
    }

    async fn create_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> ApiResponseOrError<Run> {
        let n = self.runs_created.fetch_add(1, Ordering::SeqCst) + 1;
        self.runs.lock().unwrap().push(request);
        self.log("create_run");
        Ok(run(&format!("run_{n}"), thread_id, "queued"))
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> ApiResponseOrError<Run> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.log("get_run");
        let snapshot = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| run(run_id, thread_id, "completed"));

        if snapshot.status.is_terminal() {
            let mut answered = self.answered.lock().unwrap();
            if !answered.iter().any(|id| id == run_id) {
                answered.push(run_id.to_string());
                if let Some(messages) = self.threads.lock().unwrap().get_mut(thread_id) {
                    let mut reply = message(
                        &format!("msg_{}", messages.len() + 1),
                        thread_id,
                        "assistant",
                        REPLY,
                    );
                    reply.run_id = Some(run_id.to_string());
                    messages.push(reply);
                }
            }
        }
        Ok(snapshot)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        request: SubmitToolOutputsRequest,
    ) -> ApiResponseOrError<Run> {
        self.log("submit");
        self.submissions.lock().unwrap().push(request);
        Ok(run(run_id, thread_id, "queued"))
    }

    async fn create_embeddings(
        &self,
        _model: &str,
        input: &[String],
    ) -> ApiResponseOrError<Vec<Vec<f32>>> {
        // Two-dimensional toy embedding: mentions of 密码 versus everything else.
        Ok(input
            .iter()
            .map(|text| {
                if text.contains("密码") {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect())
    }
}
