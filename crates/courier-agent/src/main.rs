use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::time::{Duration, Instant, sleep};
use tracing::info;
use uuid::Uuid;

use courier_core::config::AgentConfig;
use courier_core::domain::{Task, TaskType};
use courier_core::executor::{ExecutorRegistry, ShellExecutor};
use courier_core::processor::TaskProcessor;
use courier_core::queue::{InMemoryTaskQueue, RedisTaskQueue, TaskQueue};
use courier_core::store::{InMemoryTaskStore, RedisTaskStore, TaskStore};

#[derive(Parser)]
#[command(name = "courier-agent", version, about = "Queue-driven shell task agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the agent loop against the configured Redis.
    Run,
    /// Push a task onto an agent's queue and print its id.
    Submit {
        /// Human label for the task.
        #[arg(long, default_value = "cli task")]
        name: String,
        /// What kind of work the payload is.
        #[arg(long, value_enum, default_value_t = TaskTypeArg::Shell)]
        task_type: TaskTypeArg,
        /// Target agent; defaults to the configured agent id.
        #[arg(long)]
        agent: Option<String>,
        /// The payload, e.g. a command line for shell tasks.
        payload: String,
    },
    /// Look up a task record and print it.
    Status {
        /// Task id as printed by submit.
        task_id: String,
    },
    /// Self-contained smoke run on the in-memory backends; no Redis needed.
    Demo,
}

#[derive(Clone, Copy, ValueEnum)]
enum TaskTypeArg {
    Shell,
    PythonScript,
}

impl From<TaskTypeArg> for TaskType {
    fn from(value: TaskTypeArg) -> Self {
        match value {
            TaskTypeArg::Shell => TaskType::Shell,
            TaskTypeArg::PythonScript => TaskType::PythonScript,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so every subcommand sees the same surface
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AgentConfig::from_env().context("reading configuration")?;

    match cli.command {
        Command::Run => run(config).await,
        Command::Submit {
            name,
            task_type,
            agent,
            payload,
        } => submit(config, name, task_type.into(), agent, payload).await,
        Command::Status { task_id } => status(config, &task_id).await,
        Command::Demo => demo().await,
    }
}

async fn run(config: AgentConfig) -> anyhow::Result<()> {
    let url = config.redis_url();
    let client_name = format!("courier-agent:{}", config.agent_id);

    // refuse to start on a dead backend rather than spin a useless loop
    let store = RedisTaskStore::connect(&url, &client_name)
        .await
        .context("connecting task store")?;
    let queue = RedisTaskQueue::connect(&url, &client_name)
        .await
        .context("connecting task queue")?
        .with_key_prefix(&config.queue_prefix);

    let mut registry = ExecutorRegistry::new();
    registry.register(
        TaskType::Shell,
        Arc::new(ShellExecutor::new().with_timeout(config.exec_timeout)),
    )?;

    info!(agent_id = %config.agent_id, url = %url, "starting agent");

    let handle = TaskProcessor::new(
        &config.agent_id,
        Arc::new(queue),
        Arc::new(store),
        Arc::new(registry),
    )
    .with_poll_timeout(config.poll_timeout)
    .spawn();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("shutdown requested");
    handle.shutdown_and_join(config.shutdown_grace).await;
    Ok(())
}

async fn submit(
    config: AgentConfig,
    name: String,
    task_type: TaskType,
    agent: Option<String>,
    payload: String,
) -> anyhow::Result<()> {
    let agent_id = agent.unwrap_or_else(|| config.agent_id.clone());
    let queue = RedisTaskQueue::connect(&config.redis_url(), "courier-submit")
        .await
        .context("connecting task queue")?
        .with_key_prefix(&config.queue_prefix);

    let task = Task::new(name, task_type, payload);
    queue.push(&agent_id, &task).await?;
    println!("{}", task.task_id);
    Ok(())
}

async fn status(config: AgentConfig, task_id: &str) -> anyhow::Result<()> {
    let task_id = Uuid::parse_str(task_id).context("task id is not a UUID")?;
    let store = RedisTaskStore::connect(&config.redis_url(), "courier-status")
        .await
        .context("connecting task store")?;

    match store.find_by_id(task_id).await? {
        Some(task) => println!("{}", serde_json::to_string_pretty(&task)?),
        None => println!("no record for task {task_id}"),
    }
    Ok(())
}

/// End-to-end smoke run: submit an echo task, process it, print the stored
/// outcome.
async fn demo() -> anyhow::Result<()> {
    let queue = Arc::new(InMemoryTaskQueue::new());
    let store = Arc::new(InMemoryTaskStore::new());

    let mut registry = ExecutorRegistry::new();
    registry.register(TaskType::Shell, Arc::new(ShellExecutor::new()))?;

    let task = Task::new("demo echo", TaskType::Shell, "echo hello from courier");
    let task_id = task.task_id;
    queue.push("agent-demo", &task).await?;
    println!("submitted task {task_id}");

    let handle = TaskProcessor::new(
        "agent-demo",
        Arc::clone(&queue) as Arc<dyn TaskQueue>,
        Arc::clone(&store) as Arc<dyn TaskStore>,
        Arc::new(registry),
    )
    .with_poll_timeout(Duration::from_millis(100))
    .spawn();

    // 完了をポーリングで待つ
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(stored) = store.find_by_id(task_id).await?
            && stored.status.is_terminal()
        {
            println!("status: {}", stored.status);
            if let Some(result) = &stored.result {
                print!("{result}");
            }
            break;
        }
        if Instant::now() >= deadline {
            anyhow::bail!("demo task did not finish in time");
        }
        sleep(Duration::from_millis(50)).await;
    }

    handle.shutdown_and_join(Duration::from_secs(1)).await;
    Ok(())
}
