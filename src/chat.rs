//! Interactive chat against one assistant, one line per user turn.

use std::{io::Write, sync::OnceLock, time::Duration};

use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::Instant;
use tracing::info;

use crate::{
    assistants::{
        messages::{CreateMessageRequest, Message},
        runs::{CreateRunRequest, Run},
        threads::Thread,
    },
    driver::RunDriver,
    AssistantsApi, Result,
};

/// Uploaded file ids mentioned inline, e.g. `file-abc123...`.
fn file_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"file-[A-Za-z0-9_]{24}").expect("valid file id pattern"))
}

/// File ids referenced in a line of input, in order of appearance.
pub fn extract_file_ids(input: &str) -> Vec<String> {
    file_id_pattern()
        .find_iter(input)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// `duration: 1,234ms`
pub fn format_duration(elapsed: Duration) -> String {
    let digits = elapsed.as_millis().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("duration: {grouped}ms")
}

/// Outcome of one user line.
#[derive(Debug, Clone)]
pub struct Turn {
    pub run: Run,
    /// Every message of the thread, oldest first.
    pub messages: Vec<Message>,
    pub elapsed: Duration,
}

pub struct ChatSession<'a, A: ?Sized> {
    api: &'a A,
    driver: RunDriver<'a, A>,
    assistant_id: String,
    thread: Option<Thread>,
}

impl<'a, A> ChatSession<'a, A>
where
    A: AssistantsApi + ?Sized,
{
    pub fn new(api: &'a A, driver: RunDriver<'a, A>, assistant_id: impl Into<String>) -> Self {
        ChatSession {
            api,
            driver,
            assistant_id: assistant_id.into(),
            thread: None,
        }
    }

    /// The conversation thread, once the first line has been sent.
    pub fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }

    async fn thread_id(&mut self) -> Result<String> {
        if let Some(thread) = &self.thread {
            return Ok(thread.id.clone());
        }
        let thread = self.api.create_thread().await?;
        info!(thread_id = %thread.id, "thread created");
        let id = thread.id.clone();
        self.thread = Some(thread);
        Ok(id)
    }

    /// Sends one user line and waits for the assistant to finish.
    pub async fn send(&mut self, input: &str) -> Result<Turn> {
        let started = Instant::now();
        let thread_id = self.thread_id().await?;

        self.api
            .create_message(
                &thread_id,
                CreateMessageRequest::user(input, extract_file_ids(input)),
            )
            .await?;
        let run = self
            .driver
            .create_and_drive(
                &thread_id,
                CreateRunRequest::new(self.assistant_id.clone()),
                |_| {},
            )
            .await?;
        let messages = self.api.list_messages(&run.thread_id).await?;

        Ok(Turn {
            run,
            messages,
            elapsed: started.elapsed(),
        })
    }

    /// Reads lines until the input closes, printing the thread after each
    /// turn. An error in any turn ends the session.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();

        write!(out, "> ")?;
        out.flush()?;
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let turn = self.send(line).await?;
            serde_json::to_writer_pretty(&mut *out, &turn.messages)?;
            writeln!(out)?;
            writeln!(out, "{}", format_duration(turn.elapsed))?;
            write!(out, "> ")?;
            out.flush()?;
        }
        Ok(())
    }
}
