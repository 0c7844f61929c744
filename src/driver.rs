//! Drives a run from creation to a terminal status.
//!
//! The run is polled at a fixed interval. While it is blocked on
//! `requires_action`, every pending tool call is answered through the
//! [`ToolRegistry`] and the outputs are submitted as one batch.

use std::time::Duration;

use futures::future::try_join_all;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    assistants::runs::{CreateRunRequest, Run, Status, SubmitToolOutputsRequest, ToolCall},
    tools::ToolRegistry,
    AssistantsApi, Error, Result,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub struct RunDriver<'a, A: ?Sized> {
    api: &'a A,
    registry: &'a ToolRegistry,
    poll_interval: Duration,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<'a, A> RunDriver<'a, A>
where
    A: AssistantsApi + ?Sized,
{
    pub fn new(api: &'a A, registry: &'a ToolRegistry) -> Self {
        RunDriver {
            api,
            registry,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Gives up on a run that is still going after `timeout`.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stops polling as soon as `cancel` fires.
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.registry
    }

    /// Starts a run on the thread and drives it.
    pub async fn create_and_drive<F>(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
        observe: F,
    ) -> Result<Run>
    where
        F: FnMut(&[ToolCall]),
    {
        let run = self.api.create_run(thread_id, request).await?;
        info!(run_id = %run.id, thread_id, status = %run.status, "run created");
        self.drive_observed(thread_id, &run.id, observe).await
    }

    pub async fn drive(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.drive_observed(thread_id, run_id, |_| {}).await
    }

    /// Polls until the run is terminal and returns the last snapshot.
    ///
    /// `observe` sees each batch of tool calls before any of them is
    /// executed. Errors from a tool or from the submission end the loop.
    pub async fn drive_observed<F>(
        &self,
        thread_id: &str,
        run_id: &str,
        mut observe: F,
    ) -> Result<Run>
    where
        F: FnMut(&[ToolCall]),
    {
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);

        loop {
            self.wait(run_id, deadline).await?;

            let run = self.api.get_run(thread_id, run_id).await?;
            debug!(run_id, status = %run.status, "polled run");

            if run.status.is_terminal() {
                if run.status != Status::Completed {
                    warn!(run_id, status = %run.status, last_error = ?run.last_error, "run ended without completing");
                }
                return Ok(run);
            }

            if run.status == Status::RequiresAction {
                self.answer_tool_calls(&run, &mut observe).await?;
            }
        }
    }

    async fn answer_tool_calls<F>(&self, run: &Run, observe: &mut F) -> Result<()>
    where
        F: FnMut(&[ToolCall]),
    {
        let calls = run.pending_tool_calls();
        if calls.is_empty() {
            warn!(run_id = %run.id, "run requires action but carries no tool calls");
            return Ok(());
        }

        observe(calls);

        let tool_outputs =
            try_join_all(calls.iter().map(|call| self.registry.answer(run, call))).await?;
        info!(run_id = %run.id, count = tool_outputs.len(), "submitting tool outputs");

        self.api
            .submit_tool_outputs(
                &run.thread_id,
                &run.id,
                SubmitToolOutputsRequest { tool_outputs },
            )
            .await?;
        Ok(())
    }

    async fn wait(&self, run_id: &str, deadline: Option<Instant>) -> Result<()> {
        let mut wake = Instant::now() + self.poll_interval;
        let mut expires = false;
        if let Some(deadline) = deadline {
            if deadline <= wake {
                wake = deadline;
                expires = true;
            }
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(Error::Cancelled { run_id: run_id.to_string() });
            }
            _ = sleep_until(wake) => {}
        }

        if expires {
            return Err(Error::DeadlineExceeded {
                run_id: run_id.to_string(),
            });
        }
        Ok(())
    }
}
