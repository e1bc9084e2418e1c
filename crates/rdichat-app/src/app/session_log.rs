use std::path::Path;

use rdichat_agents::{SessionError, SessionOutcome};
use rdichat_logging::ConversationLogger;

/// Append a finished session to a JSONL conversation log under `log_root`.
///
/// Rejected requests never started a session and are not recorded.
pub async fn record_session(
    log_root: &Path,
    task: &str,
    result: &Result<SessionOutcome, SessionError>,
) {
    if matches!(result, Err(e) if e.is_config_error() || matches!(e, SessionError::Busy)) {
        return;
    }

    let session_id = uuid::Uuid::new_v4().simple().to_string();
    let mut logger = match ConversationLogger::new(log_root, &session_id[..8]).await {
        Ok(logger) => logger,
        Err(e) => {
            tracing::warn!("conversation logging disabled: {}", e);
            return;
        }
    };

    logger.log_task(task).await;
    match result {
        Ok(outcome) => {
            for message in &outcome.messages {
                logger.log_message(message).await;
            }
            logger.log_outcome(outcome.reason.as_str()).await;
        }
        Err(e) => logger.log_outcome(&e.to_string()).await,
    }
    logger.shutdown().await;
    tracing::debug!("conversation log written to {}", logger.file_path().display());
}
