use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dingsend::config::Config;
use dingsend::scheduler::{tasks, Scheduler};
use dingsend::{AtTarget, DingClient, DirectMessage, MessageVariant};

#[derive(Debug, Parser)]
#[command(name = "dingsend", about = "Send messages through chat robots")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "DINGSEND_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run all configured tasks on their cron schedules until Ctrl-C
    Run,
    /// Send one configured task right now
    Send {
        #[arg(long)]
        task: String,
    },
    /// Send an ad-hoc text message through a configured robot
    Text {
        #[arg(long)]
        robot: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        at_all: bool,
        #[arg(long = "at-mobile")]
        at_mobiles: Vec<String>,
        #[arg(long = "at-user")]
        at_users: Vec<String>,
    },
    /// Send a direct message to users through the batch-send API
    Direct {
        #[arg(long, env = "DINGSEND_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
        #[arg(long)]
        robot_code: String,
        #[arg(long, default_value = "sampleText")]
        msg_key: String,
        #[arg(long)]
        content: String,
        #[arg(long = "user", required = true)]
        users: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dingsend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!("Loading configuration from: {}", cli.config.display());
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    info!(
        "Configuration loaded: {} robot(s), {} task(s)",
        config.robots.len(),
        config.tasks.len()
    );

    let client = DingClient::new(&config.gateway).context("Failed to create gateway client")?;

    match cli.command {
        Command::Run => run_scheduler(Arc::new(client), Arc::new(config)).await,
        Command::Send { task } => {
            let task = config
                .task(&task)
                .with_context(|| format!("No task named '{}'", task))?;
            tasks::run_task(&client, &config, task).await?;
            info!("Task '{}' delivered", task.name);
            Ok(())
        }
        Command::Text {
            robot,
            content,
            at_all,
            at_mobiles,
            at_users,
        } => {
            let robot = config
                .robot(&robot)
                .with_context(|| format!("No robot named '{}'", robot))?;
            let at = AtTarget {
                mobiles: at_mobiles,
                user_ids: at_users,
                is_at_all: at_all,
            };
            client
                .send_group_message(robot, &MessageVariant::text(content, at))
                .await
                .context("Failed to send text message")?;
            Ok(())
        }
        Command::Direct {
            token,
            robot_code,
            msg_key,
            content,
            users,
        } => {
            let message = DirectMessage {
                access_token: token,
                robot_code,
                msg_key,
                content,
                user_ids: users,
            };
            let result = client
                .send_direct_message(&message)
                .await
                .context("Failed to send direct message")?;
            if let Some(key) = &result.process_query_key {
                info!("processQueryKey: {}", key);
            }
            Ok(())
        }
    }
}

async fn run_scheduler(client: Arc<DingClient>, config: Arc<Config>) -> Result<()> {
    let mut scheduler = Scheduler::new().await?;
    tasks::register_tasks(&scheduler, client, config).await?;
    scheduler.start().await?;

    info!("Waiting for Ctrl-C...");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    scheduler.shutdown().await?;
    Ok(())
}
