//! rdichat application library
//!
//! Command-line and web front ends over the multi-agent SmartRDI
//! code-generation conversation.

pub use rdichat_agents as agents;
pub use rdichat_llm_api as llm_api;
pub use rdichat_types::{self as types, Message, SelectionPolicy, TerminationReason};

pub mod app;
pub mod cli;
pub mod config;
pub mod web;

pub use app::{generate, run_task_mode, run_web_server, setup_from_cli, AppConfig, GenerateRequest};
pub use cli::Cli;
pub use config::{load_config_list, ConfigError, OaiConfig};
