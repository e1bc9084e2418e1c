use chrono::Local;
use serde::Serialize;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use rdichat_types::Message;

#[derive(Serialize)]
struct LogEntry<'a> {
    timestamp: String, // ISO‑8601 Local time
    session_id: String,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender: Option<&'a str>,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
}

/// Appends one JSON line per transcript message to `<dir>/logs/`
pub struct ConversationLogger {
    session_id: String,
    file_path: PathBuf,
    file: Option<tokio::fs::File>,
}

impl ConversationLogger {
    /// Create a new logger; the file name carries the local time and session id.
    pub async fn new(workspace: &Path, session_id: &str) -> Result<Self> {
        let logs_dir = workspace.join("logs");
        fs::create_dir_all(&logs_dir).await?;

        let now_local = Local::now();
        let filename = format!(
            "rdichat-{}-{}.jsonl",
            now_local.format("%Y-%m-%d-%H%M%S"),
            session_id
        );
        let file_path = logs_dir.join(filename);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await?;
        Ok(Self {
            session_id: session_id.to_string(),
            file_path,
            file: Some(file),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Record the task that started the session
    pub async fn log_task(&mut self, task: &str) {
        self.write(LogEntry {
            timestamp: Local::now().to_rfc3339(),
            session_id: self.session_id.clone(),
            kind: "task",
            sender: None,
            content: task,
            index: None,
        })
        .await;
    }

    /// Record one transcript message
    pub async fn log_message(&mut self, message: &Message) {
        self.write(LogEntry {
            timestamp: message.timestamp.clone(),
            session_id: self.session_id.clone(),
            kind: "message",
            sender: Some(&message.sender),
            content: &message.content,
            index: Some(message.index),
        })
        .await;
    }

    /// Record how the session ended (reason or error text)
    pub async fn log_outcome(&mut self, outcome: &str) {
        self.write(LogEntry {
            timestamp: Local::now().to_rfc3339(),
            session_id: self.session_id.clone(),
            kind: "outcome",
            sender: None,
            content: outcome,
            index: None,
        })
        .await;
    }

    async fn write(&mut self, entry: LogEntry<'_>) {
        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("conversation log entry not serializable: {}", e);
                return;
            }
        };
        if let Some(file) = &mut self.file {
            if let Err(e) = file.write_all(json.as_bytes()).await {
                tracing::warn!("[Logging error] {}", e);
            } else if let Err(e) = file.write_all(b"\n").await {
                tracing::warn!("[Logging error] {}", e);
            } else {
                let _ = file.flush().await;
            }
        }
    }

    /// Close the logger (explicit drop). Called on graceful shutdown.
    pub async fn shutdown(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.sync_all().await;
        }
    }
}
