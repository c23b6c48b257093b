//! Task Agent - interactive terminal entry point.
//!
//! Prompts the operator for tasks and runs each one through the agent loop.

use std::sync::Arc;

use task_agent::agent::{Agent, Session, TaskOutcome};
use task_agent::config::{self, Config};
use task_agent::confirm::TerminalGate;
use task_agent::console::{Console, InterruptRouter, OperatorCommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = config::load_env_file(None);

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match dotenv {
        Ok(Some(path)) => info!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => tracing::warn!("Ignoring .env file: {}", e),
    }

    // Load configuration; a missing API key ends the process here
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={} workspace={}",
        config.default_model,
        config.workspace_path.display()
    );
    let context_window = config.context_window_tokens;

    let console = Arc::new(Console::stdio());
    let gate = Arc::new(TerminalGate::new(console.clone()));
    let agent = Agent::new(config, gate);
    let mut session = Session::new();

    let interrupts = InterruptRouter::new();
    tokio::spawn({
        let interrupts = interrupts.clone();
        async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                interrupts.interrupt().await;
            }
        }
    });
    let shutdown = interrupts.shutdown();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = console.prompt(
                "\n💬 What would you like me to do? ('reset' to start over, 'quit' to exit)\n> ",
            ) => line?,
        };
        let Some(line) = line else {
            break;
        };
        let Some(command) = OperatorCommand::parse(&line) else {
            continue;
        };

        let task = match command {
            OperatorCommand::Quit => break,
            OperatorCommand::Reset => {
                session = Session::new();
                console
                    .say("🧹 Conversation and token count cleared.\n")
                    .await?;
                continue;
            }
            OperatorCommand::Task(task) => task,
        };

        console.say(&format!("🤖 Working on... {}\n\n", task)).await?;

        let cancel = interrupts.begin_task().await;
        let report = tokio::select! {
            _ = shutdown.cancelled() => break,
            report = agent.run_task(&mut session, &task, &cancel) => report,
        };
        interrupts.end_task().await;

        match &report.outcome {
            TaskOutcome::Finished { answer } => {
                console.say(&format!("\n✅ Done: {}\n", answer)).await?;
            }
            TaskOutcome::Aborted(reason) => {
                console.say(&format!("\n❌ Aborted: {}\n", reason)).await?;
            }
        }

        console
            .say(&format!(
                "📊 Tokens used: {} ({:.1}% of {} context window)\n",
                session.ledger.total_tokens(),
                session.ledger.percent_of(context_window),
                context_window
            ))
            .await?;

        tracing::debug!(
            session = %session.id,
            iterations = report.iterations,
            log = %serde_json::to_string(&report.log).unwrap_or_default(),
            "Task log"
        );
    }

    console.say("\n👋 Goodbye!\n").await?;
    if shutdown.is_cancelled() {
        // A pending stdin read would otherwise hold the runtime open
        std::process::exit(130);
    }
    Ok(())
}
