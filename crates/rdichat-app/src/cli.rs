use clap::Parser;
use std::path::PathBuf;

use rdichat_retrieval::DEFAULT_CHUNK_TOKEN_SIZE;
use rdichat_types::{SelectionPolicy, DEFAULT_MAX_ROUNDS};

/// CLI arguments for rdichat
#[derive(Parser, Debug, Clone)]
#[command(name = "rdichat")]
#[command(about = "Multi-agent SmartRDI test-code generation")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Problem statement to run once from the terminal, e.g. "Generate a leakage test ..."
    #[arg(long, value_name = "TEXT")]
    pub task: Option<String>,

    /// Print the task-mode transcript as pretty JSON instead of colored text
    #[arg(long)]
    pub pretty: bool,

    /// OAI config list: name of an environment variable holding the JSON,
    /// or a path to a JSON file. The environment is checked first.
    #[arg(long, value_name = "ENV_OR_PATH", env = "RDICHAT_CONFIG_LIST")]
    pub config_list: Option<String>,

    /// Model to select from the config list
    #[arg(long, value_name = "MODEL", default_value = "gpt-4o", env = "RDICHAT_MODEL")]
    pub model: String,

    /// Retrieval corpus for the assistant: files, directories or glob patterns
    #[arg(long, value_name = "PATH", num_args = 1.., env = "RDICHAT_DOCS", value_delimiter = ',')]
    pub docs: Vec<String>,

    /// Retrieval chunk size in tokens
    #[arg(long, default_value_t = DEFAULT_CHUNK_TOKEN_SIZE)]
    pub chunk_tokens: usize,

    /// Maximum number of messages per conversation
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS, env = "RDICHAT_MAX_ROUNDS")]
    pub max_rounds: usize,

    /// Speaker selection: round_robin or auto
    #[arg(long, default_value = "round_robin", value_parser = parse_policy)]
    pub policy: SelectionPolicy,

    /// Directory with role JSON files overriding the built-in roles
    #[arg(long, value_name = "DIR", default_value = "agents/roles", env = "RDICHAT_ROLES_DIR")]
    pub roles_dir: PathBuf,

    /// Write every model request and response under ~/.rdichat/logs
    #[arg(long)]
    pub log_requests: bool,

    /// Enable verbose debug output
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Enable web server
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub web: bool,

    /// Web server port
    #[arg(long, default_value = "8080", env = "RDICHAT_WEB_PORT")]
    pub web_port: u16,

    /// Web server bind address
    #[arg(long, default_value = "127.0.0.1", env = "RDICHAT_WEB_BIND")]
    pub web_bind: String,
}

fn parse_policy(s: &str) -> Result<SelectionPolicy, String> {
    s.parse().map_err(|e: rdichat_types::ParsePolicyError| e.to_string())
}
