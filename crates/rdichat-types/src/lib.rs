//! Core types and structures for rdichat
//!
//! This crate provides the foundational types shared by the agent, logging
//! and application crates: the transcript message, speaker-selection policy,
//! session states and the termination predicate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Constants
// ============================================================================

/// Token a participant emits at the end of a message to end the conversation
pub const TERMINATION_TOKEN: &str = "TERMINATE";

/// Round bound used by the generation flow when none is supplied
pub const DEFAULT_MAX_ROUNDS: usize = 20;

/// Reply used by participants without a model behind them
pub const DEFAULT_AUTO_REPLY: &str = "Reply `TERMINATE` if the task is done.";

// ============================================================================
// Termination
// ============================================================================

/// Returns true when the upper-cased content ends with `TERMINATE`.
///
/// Only the last nine characters are inspected. Content shorter than the
/// token never matches.
pub fn is_termination_msg(content: &str) -> bool {
    let token_len = TERMINATION_TOKEN.chars().count();
    let upper = content.to_uppercase();
    let len = upper.chars().count();
    if len < token_len {
        return false;
    }
    upper.chars().skip(len - token_len).eq(TERMINATION_TOKEN.chars())
}

// ============================================================================
// Transcript
// ============================================================================

/// A message emitted by a participant during a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the session transcript, starting at 0
    pub index: usize,
    /// Name of the emitting participant
    pub sender: String,
    pub content: String,
    /// RFC3339 emission time
    pub timestamp: String,
}

impl Message {
    pub fn new(index: usize, sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            index,
            sender: sender.into(),
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_termination(&self) -> bool {
        is_termination_msg(&self.content)
    }
}

// ============================================================================
// Speaker selection
// ============================================================================

/// How the next speaker is chosen in a group conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Visit participants in the given order, cycling
    #[default]
    RoundRobin,
    /// Ask the manager model to pick the next speaker
    Auto,
}

impl SelectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionPolicy::RoundRobin => "round_robin",
            SelectionPolicy::Auto => "auto",
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown speaker selection policy '{0}' (expected round_robin or auto)")]
pub struct ParsePolicyError(pub String);

impl FromStr for SelectionPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "round_robin" | "round-robin" | "roundrobin" => Ok(SelectionPolicy::RoundRobin),
            "auto" => Ok(SelectionPolicy::Auto),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

// ============================================================================
// Session lifecycle
// ============================================================================

/// States of a running group conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingSpeaker,
    SpeakerEmitsMessage,
    TerminationCheck,
    Terminated,
}

/// Why a session reached the `Terminated` state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// A message ended with the termination token
    TerminationMessage,
    /// The transcript reached the round bound
    RoundLimit,
    /// An auto-reply participant used up its consecutive replies
    AutoReplyExhausted,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::TerminationMessage => "termination_message",
            TerminationReason::RoundLimit => "round_limit",
            TerminationReason::AutoReplyExhausted => "auto_reply_exhausted",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
