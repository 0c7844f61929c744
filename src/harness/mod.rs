//! Batch test runs: replay a scripted conversation against fresh assistants,
//! several times in parallel, and collect what came back.

pub mod knowledge;
pub mod report;
pub mod transcript;

use std::{future::Future, path::Path, time::Duration};

use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    assistants::{
        messages::CreateMessageRequest,
        runs::{CreateRunRequest, Status, ToolCall},
        AssistantSpec, DEFAULT_ASSISTANT_MODEL, DEFAULT_ASSISTANT_NAME,
    },
    driver::{RunDriver, DEFAULT_POLL_INTERVAL},
    tools::ToolRegistry,
    AssistantsApi, Error, Result, Usage,
};

use knowledge::{render_instructions, retrieval_query, KnowledgeIndex, RETRIEVAL_WINDOW};

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_TOP_K: usize = 3;

fn default_model() -> String {
    DEFAULT_ASSISTANT_MODEL.to_string()
}

fn default_times() -> usize {
    1
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// A scripted conversation and how often to replay it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlan {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_times")]
    pub times: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Falls back to the customer-service instructions from the profile.
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
    /// User messages, sent one per turn.
    pub messages: Vec<String>,
    /// JSON file of documents for retrieval-augmented runs.
    #[serde(default)]
    pub knowledge: Option<std::path::PathBuf>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Per-run polling limit, in seconds.
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

impl TestPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read test plan {}: {e}", path.display())))?;
        let plan: TestPlan = serde_json::from_str(&text)?;
        if plan.messages.is_empty() {
            return Err(Error::Config(format!(
                "test plan {} has no messages",
                path.display()
            )));
        }
        Ok(plan)
    }
}

/// A tool invocation seen while a turn's run was blocked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    /// Parsed arguments, or the raw string when it is not valid JSON.
    pub arguments: Value,
}

impl From<&ToolCall> for ToolCallRecord {
    fn from(call: &ToolCall) -> Self {
        let arguments = serde_json::from_str(&call.function.arguments)
            .unwrap_or_else(|_| Value::String(call.function.arguments.clone()));
        ToolCallRecord {
            name: call.function.name.clone(),
            arguments,
        }
    }
}

/// One scripted turn of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultItem {
    pub user_message: String,
    pub assistant_messages: Vec<String>,
    pub quote: Option<String>,
    pub status: Option<Status>,
    pub usage: Option<Usage>,
    pub tool_calls: Vec<ToolCallRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub index: usize,
    pub items: Vec<TestResultItem>,
    /// Set when the scenario stopped early; `items` is then empty.
    pub error: Option<String>,
}

/// Fails with [`Error::ScenariosFailed`] when any scenario stopped early.
pub fn ensure_passed(scenarios: &[ScenarioReport]) -> Result<()> {
    let failed = scenarios.iter().filter(|s| s.error.is_some()).count();
    if failed > 0 {
        return Err(Error::ScenariosFailed {
            failed,
            total: scenarios.len(),
        });
    }
    Ok(())
}

/// Runs `times` jobs with at most `limit` in flight. Outputs keep job order.
pub async fn run_bounded<T, F, Fut>(times: usize, limit: usize, job: F) -> Vec<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(0..times)
        .map(job)
        .buffered(limit.max(1))
        .collect()
        .await
}

struct TurnRecord {
    status: Status,
    usage: Option<Usage>,
    tool_calls: Vec<ToolCallRecord>,
}

pub struct Harness<'a, A: ?Sized> {
    api: &'a A,
    registry: &'a ToolRegistry,
    plan: &'a TestPlan,
    instructions: String,
    knowledge: Option<&'a KnowledgeIndex>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl<'a, A> Harness<'a, A>
where
    A: AssistantsApi + ?Sized,
{
    pub fn new(
        api: &'a A,
        registry: &'a ToolRegistry,
        plan: &'a TestPlan,
        instructions: impl Into<String>,
    ) -> Self {
        Harness {
            api,
            registry,
            plan,
            instructions: instructions.into(),
            knowledge: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    pub fn knowledge(mut self, knowledge: Option<&'a KnowledgeIndex>) -> Self {
        self.knowledge = knowledge;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Shared by every scenario's run driver.
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs every scenario. A failing scenario is reported, not fatal.
    pub async fn run(&self) -> Vec<ScenarioReport> {
        info!(
            times = self.plan.times,
            concurrency = self.plan.concurrency,
            turns = self.plan.messages.len(),
            "starting test run"
        );
        run_bounded(self.plan.times, self.plan.concurrency, |index| async move {
            match self.run_scenario(index).await {
                Ok(items) => ScenarioReport {
                    index,
                    items,
                    error: None,
                },
                Err(error) => {
                    warn!(scenario = index, %error, "scenario failed");
                    ScenarioReport {
                        index,
                        items: Vec::new(),
                        error: Some(error.to_string()),
                    }
                }
            }
        })
        .await
    }

    /// Replays the scripted messages on a new assistant and thread.
    pub async fn run_scenario(&self, index: usize) -> Result<Vec<TestResultItem>> {
        let spec = AssistantSpec {
            model: self.plan.model.clone(),
            name: DEFAULT_ASSISTANT_NAME.to_string(),
            instructions: Some(self.instructions.clone()),
            file_ids: self.plan.file_ids.clone(),
            vector_store_ids: self.plan.vector_store_ids.clone(),
        };
        let assistant = spec.create(self.api, self.registry).await?;
        let thread = self.api.create_thread().await?;
        info!(scenario = index, assistant_id = %assistant.id, thread_id = %thread.id, "scenario started");

        let driver = RunDriver::new(self.api, self.registry)
            .poll_interval(self.poll_interval)
            .timeout(self.plan.run_timeout_secs.map(Duration::from_secs))
            .cancellation(self.cancel.clone());

        let mut history: Vec<String> = Vec::with_capacity(self.plan.messages.len());
        let mut turns: Vec<TurnRecord> = Vec::with_capacity(self.plan.messages.len());
        for message in &self.plan.messages {
            self.api
                .create_message(&thread.id, CreateMessageRequest::user(message, Vec::new()))
                .await?;
            history.push(message.clone());

            let mut request = CreateRunRequest::new(assistant.id.clone());
            if let Some(knowledge) = self.knowledge {
                let query = retrieval_query(&history, RETRIEVAL_WINDOW);
                let hits = knowledge.search(self.api, &query, self.plan.top_k).await?;
                request.additional_instructions = render_instructions(&hits);
            }

            let mut tool_calls = Vec::new();
            let run = driver
                .create_and_drive(&thread.id, request, |calls| {
                    tool_calls.extend(calls.iter().map(ToolCallRecord::from))
                })
                .await?;
            turns.push(TurnRecord {
                status: run.status,
                usage: run.usage,
                tool_calls,
            });
        }

        let messages = self.api.list_messages(&thread.id).await?;
        let exchanges = transcript::exchanges(&messages);
        info!(scenario = index, exchanges = exchanges.len(), "scenario finished");

        Ok(self
            .plan
            .messages
            .iter()
            .zip(turns)
            .enumerate()
            .map(|(turn, (message, record))| {
                let reply = exchanges
                    .get(turn)
                    .and_then(|exchange| exchange.reply.clone())
                    .unwrap_or_default();
                TestResultItem {
                    user_message: message.clone(),
                    assistant_messages: reply.texts,
                    quote: reply.quote,
                    status: Some(record.status),
                    usage: record.usage,
                    tool_calls: record.tool_calls,
                }
            })
            .collect())
    }
}
