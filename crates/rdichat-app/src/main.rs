use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use rdichat::app::{run_task_mode, run_web_server, setup_from_cli};
use rdichat::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    rdichat_logging::init_tracing(cli.verbose);

    let config = setup_from_cli(&cli).await?;

    if let Some(task) = cli.task.clone() {
        return run_task_mode(&cli, task, &config).await;
    }

    if cli.web {
        return run_web_server(&cli, config).await;
    }

    eprintln!(
        "{} pass --task \"<problem>\" to run once, or --web to serve the chat page",
        "Nothing to do:".bright_yellow().bold()
    );
    Ok(())
}
