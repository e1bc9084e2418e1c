use anyhow::Result;
use colored::Colorize;

use rdichat_agents::TranscriptSink;
use rdichat_types::Message;

use crate::app::generate::{generate, GenerateRequest};
use crate::app::AppConfig;
use crate::cli::Cli;

/// Prints each message to the terminal as it is emitted
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl TranscriptSink for ConsoleSink {
    fn append(&self, message: &Message) {
        if self.quiet {
            return;
        }
        println!(
            "{} {}",
            format!("[{}]", message.index).bright_black(),
            format!("{}:", message.sender).bright_cyan().bold()
        );
        println!("{}\n", message.content);
    }
}

/// Run in task mode - run one conversation on the problem and exit
pub async fn run_task_mode(cli: &Cli, problem: String, config: &AppConfig) -> Result<()> {
    println!("{}", "🤖 rdichat - Task Mode".bright_cyan().bold());
    println!("{}", format!("Task: {}", problem).bright_yellow());
    println!();

    let request = GenerateRequest {
        max_rounds: Some(cli.max_rounds),
        policy: Some(cli.policy.to_string()),
        ..GenerateRequest::new(problem)
    };
    let sink = ConsoleSink::new(cli.pretty);

    match generate(config, request, &sink).await {
        Ok(outcome) => {
            if cli.pretty {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!(
                    "{}",
                    format!(
                        "Conversation finished after {} messages ({})",
                        outcome.messages.len(),
                        outcome.reason
                    )
                    .green()
                );
            }
        }
        Err(e) if e.is_config_error() => {
            eprintln!("{} {}\n", "Warning:".bright_yellow().bold(), e);
        }
        Err(e) => {
            eprintln!("{} {}\n", "Error:".bright_red().bold(), e);
        }
    }

    Ok(())
}
