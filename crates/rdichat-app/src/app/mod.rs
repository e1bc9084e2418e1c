pub mod generate;
pub mod session_log;
pub mod setup;
pub mod task;
pub mod web_server;

pub use generate::{generate, GenerateError, GenerateRequest};
pub use setup::{setup_from_cli, AppConfig};
pub use task::{run_task_mode, ConsoleSink};
pub use web_server::run_web_server;
