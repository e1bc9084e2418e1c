use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::get_logs_dir;

/// Show the first few characters of a key followed by `***`
pub fn redact_key(api_key: &str) -> String {
    format!("{}***", api_key.chars().take(6).collect::<String>())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn file_stem(timestamp: u64, model: &str, agent_name: &str) -> String {
    format!("{}-{}-{}", timestamp, model.replace('/', "-"), agent_name)
}

/// Log an outgoing chat request to ~/.rdichat/logs.
///
/// Returns the request timestamp so the matching response log can share it.
pub fn log_request_to_file(
    url: &str,
    request: &serde_json::Value,
    model: &str,
    agent_name: &str,
    api_key: &str,
) -> Result<u64> {
    let logs_dir = get_logs_dir()?;
    let timestamp = unix_timestamp();
    let path = write_request_log(&logs_dir, timestamp, url, request, model, agent_name, api_key)?;
    tracing::debug!(path = %path.display(), "request logged");
    Ok(timestamp)
}

/// Write a request log into `logs_dir`
pub fn write_request_log(
    logs_dir: &Path,
    timestamp: u64,
    url: &str,
    request: &serde_json::Value,
    model: &str,
    agent_name: &str,
    api_key: &str,
) -> Result<PathBuf> {
    let file_path = logs_dir.join(format!("req-{}.txt", file_stem(timestamp, model, agent_name)));

    let mut log_content = String::new();
    log_content.push_str("HTTP REQUEST LOG\n");
    log_content.push_str("================\n\n");
    log_content.push_str(&format!("Timestamp: {}\n", timestamp));
    log_content.push_str(&format!("Model: {}\n", model));
    log_content.push_str(&format!("Participant: {}\n\n", agent_name));

    // Parse URL to show host and port
    if let Ok(parsed_url) = reqwest::Url::parse(url) {
        log_content.push_str(&format!("URL: {}\n", url));
        log_content.push_str(&format!("Host: {}\n", parsed_url.host_str().unwrap_or("unknown")));
        log_content.push_str(&format!("Port: {}\n",
            parsed_url.port().map(|p| p.to_string()).unwrap_or_else(||
                if parsed_url.scheme() == "https" { "443 (default)".to_string() } else { "80 (default)".to_string() }
            )
        ));
        log_content.push_str(&format!("Scheme: {}\n\n", parsed_url.scheme()));
    } else {
        log_content.push_str(&format!("URL: {}\n\n", url));
    }

    log_content.push_str("Headers:\n");
    log_content.push_str("  Content-Type: application/json\n");
    log_content.push_str(&format!("  Authorization: Bearer {}\n\n", redact_key(api_key)));

    log_content.push_str("Request Body:\n");
    match serde_json::to_string_pretty(request) {
        Ok(json) => {
            log_content.push_str(&json);
            log_content.push('\n');
        }
        Err(e) => {
            log_content.push_str(&format!("Error serializing request: {}\n", e));
        }
    }

    fs::write(&file_path, log_content)
        .with_context(|| format!("Failed to write request log to {}", file_path.display()))?;

    Ok(file_path)
}

/// Log the response matching an earlier `log_request_to_file` call
pub fn log_response_to_file(
    status: reqwest::StatusCode,
    body: &str,
    request_timestamp: u64,
    model: &str,
    agent_name: &str,
) -> Result<()> {
    let logs_dir = get_logs_dir()?;
    let path = write_response_log(&logs_dir, status, body, request_timestamp, model, agent_name)?;
    tracing::debug!(path = %path.display(), "response logged");
    Ok(())
}

/// Write a response log into `logs_dir`
pub fn write_response_log(
    logs_dir: &Path,
    status: reqwest::StatusCode,
    body: &str,
    request_timestamp: u64,
    model: &str,
    agent_name: &str,
) -> Result<PathBuf> {
    let file_path = logs_dir.join(format!(
        "resp-{}.txt",
        file_stem(request_timestamp, model, agent_name)
    ));

    let mut log_content = String::new();
    log_content.push_str("HTTP RESPONSE LOG\n");
    log_content.push_str("=================\n\n");
    log_content.push_str(&format!("Timestamp: {}\n", request_timestamp));
    log_content.push_str(&format!("Model: {}\n", model));
    log_content.push_str(&format!("Participant: {}\n\n", agent_name));
    log_content.push_str(&format!("Status: {} {}\n\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    ));

    log_content.push_str("Response Body:\n");
    // Try to pretty-print JSON, fall back to raw text
    match serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
    {
        Some(pretty) => log_content.push_str(&pretty),
        None => log_content.push_str(body),
    }
    log_content.push('\n');

    log_content.push_str("\n---\n");
    log_content.push_str(&format!("Response Size: {} bytes\n", body.len()));

    fs::write(&file_path, log_content)
        .with_context(|| format!("Failed to write response log to {}", file_path.display()))?;

    Ok(file_path)
}
