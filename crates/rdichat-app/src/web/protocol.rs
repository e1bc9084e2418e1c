use serde::{Deserialize, Serialize};

use rdichat_types::{Message, TerminationReason};

use crate::app::GenerateRequest;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Start a conversation on a problem statement
    Generate(GenerateRequest),
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// The request was accepted and the group is about to speak
    SessionStarted {
        participants: Vec<String>,
        max_rounds: usize,
    },

    /// One transcript message, in emission order
    Message { message: Message },

    SessionCompleted {
        reason: TerminationReason,
        message_count: usize,
    },

    /// Configuration problem; no session ran
    Warning { message: String },

    Error {
        message: String,
        recoverable: bool,
    },
}
