use std::{path::Path, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use assistant_cli::{
    assistants::{customer_service_instructions, AssistantSpec, DEFAULT_ASSISTANT_MODEL},
    chat::ChatSession,
    cli::{
        default_log_filter, AssistantCommand, Cli, Command, FileCommand, MessageCommand,
        ModelCommand, RunCommand, VectorStoreCommand,
    },
    config::Config,
    driver::RunDriver,
    embeddings::DEFAULT_EMBEDDING_MODEL,
    harness::{
        ensure_passed,
        knowledge::KnowledgeIndex,
        report::{self, DEFAULT_REPORT_PATH},
        Harness, TestPlan,
    },
    tools::ToolRegistry,
    OpenAiClient,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let client = OpenAiClient::new(config.credentials.clone())?;

    match cli.command {
        Command::Assistant(command) => match command {
            AssistantCommand::Ls => print_json(&client.list_assistants().await?),
            AssistantCommand::Get { id } => print_json(&client.get_assistant(&id).await?),
            AssistantCommand::Del { id } => print_json(&client.delete_assistant(&id).await?),
        },
        Command::Model(ModelCommand::Ls) => print_json(&client.list_models().await?),
        Command::File(command) => match command {
            FileCommand::Ls => print_json(&client.list_files().await?),
            FileCommand::Get { id } => print_json(&client.get_file(&id).await?),
            FileCommand::Create { path } => print_json(
                &client
                    .create_file(&path)
                    .await
                    .with_context(|| format!("uploading {}", path.display()))?,
            ),
            FileCommand::Del { id } => print_json(&client.delete_file(&id).await?),
        },
        Command::VectorStore(command) => match command {
            VectorStoreCommand::Ls => print_json(&client.list_vector_stores().await?),
            VectorStoreCommand::Get { id } => print_json(&client.get_vector_store(&id).await?),
            VectorStoreCommand::Files { id } => {
                print_json(&client.list_vector_store_files(&id).await?)
            }
        },
        Command::Message(MessageCommand::Ls { thread_id }) => {
            print_json(&client.list_messages(&thread_id).await?)
        }
        Command::Run(RunCommand::Get { thread_id, run_id }) => {
            print_json(&client.get_run(&thread_id, &run_id).await?)
        }
        Command::Start { model } => start(&client, &config, model).await,
        Command::Test { output, plan } => {
            let output = output.unwrap_or_else(|| DEFAULT_REPORT_PATH.into());
            test(&client, &config, &plan, &output).await
        }
    }
}

/// Cancelled on the first Ctrl-C so in-flight run polling stops.
fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling run polling");
            on_signal.cancel();
        }
    });
    token
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn start(client: &OpenAiClient, config: &Config, model: Option<String>) -> anyhow::Result<()> {
    let model = model
        .or_else(|| config.model.clone())
        .unwrap_or_else(|| DEFAULT_ASSISTANT_MODEL.to_string());
    let registry = ToolRegistry::default();

    let spec = AssistantSpec::builder()
        .model(model)
        .instructions(customer_service_instructions(&config.user_profile))
        .build()?;
    let assistant = spec.create(client, &registry).await?;
    eprintln!("assistant {} ({}) ready, type a message", assistant.id, assistant.model);

    let driver = RunDriver::new(client, &registry).cancellation(interrupt_token());
    let mut session = ChatSession::new(client, driver, assistant.id);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    session.run(stdin, &mut std::io::stdout()).await?;
    Ok(())
}

async fn test(
    client: &OpenAiClient,
    config: &Config,
    plan_path: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    let mut plan = TestPlan::load(plan_path)?;
    if let Some(model) = &config.model {
        if plan.model == DEFAULT_ASSISTANT_MODEL {
            plan.model = model.clone();
        }
    }
    let registry = ToolRegistry::default();
    let instructions = plan
        .instructions
        .clone()
        .unwrap_or_else(|| customer_service_instructions(&config.user_profile));

    let knowledge = match &plan.knowledge {
        Some(path) => {
            let documents = KnowledgeIndex::load_documents(path)
                .with_context(|| format!("loading knowledge from {}", path.display()))?;
            Some(KnowledgeIndex::build(client, DEFAULT_EMBEDDING_MODEL, documents).await?)
        }
        None => None,
    };

    let scenarios = Harness::new(client, &registry, &plan, instructions)
        .knowledge(knowledge.as_ref())
        .cancellation(interrupt_token())
        .run()
        .await;

    let failed = scenarios.iter().filter(|s| s.error.is_some()).count();
    let sheet = report::layout(&plan.messages, &scenarios);
    report::write_report(output, &sheet)?;
    eprintln!(
        "wrote {} ({} scenarios, {failed} failed)",
        output.display(),
        scenarios.len()
    );
    ensure_passed(&scenarios)?;
    Ok(())
}
