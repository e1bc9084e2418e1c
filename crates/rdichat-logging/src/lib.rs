// Logging module - tracing setup, conversation and request logging
pub mod conversation_logger;
pub mod request_logger;

use std::path::PathBuf;
use anyhow::{Result, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use conversation_logger::ConversationLogger;

pub use request_logger::{
    log_request_to_file,
    log_response_to_file,
    write_request_log,
    write_response_log,
    redact_key,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` switches the workspace
/// crates from `info` to `debug`.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "rdichat=debug,rdichat_agents=debug,rdichat_llm_api=debug,rdichat_retrieval=debug,tower_http=debug"
    } else {
        "rdichat=info,rdichat_agents=info,rdichat_llm_api=warn,rdichat_retrieval=info,tower_http=warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (tests, embedding) is not an error worth surfacing
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// Safely truncate a string to a maximum number of characters
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        // Reserve space for "..." suffix
        let trunc_chars = if max_chars >= 3 { max_chars - 3 } else { 0 };
        format!("{}...", s.chars().take(trunc_chars).collect::<String>())
    }
}

/// Get or create the base rdichat directory (~/.rdichat)
pub fn get_rdichat_dir() -> Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Failed to get home directory")?;

    let rdichat_dir = PathBuf::from(home_dir).join(".rdichat");

    if !rdichat_dir.exists() {
        std::fs::create_dir_all(&rdichat_dir)
            .context("Failed to create rdichat directory")?;
    }

    Ok(rdichat_dir)
}

/// Get or create the logs directory (~/.rdichat/logs)
pub fn get_logs_dir() -> Result<PathBuf> {
    let logs_dir = get_rdichat_dir()?.join("logs");

    if !logs_dir.exists() {
        std::fs::create_dir_all(&logs_dir)
            .context("Failed to create logs directory")?;
    }

    Ok(logs_dir)
}
