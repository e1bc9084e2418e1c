//! Multi-agent group conversations for rdichat
//!
//! This crate provides the participant roles, the runtime agents built from
//! them for each session, speaker selection, and the session controller that
//! drives a bounded conversation to completion.

pub mod agent;
pub mod agent_factory;
pub mod controller;
pub mod embedded_configs;
pub mod groupchat;
pub mod participant;
pub mod registry;
pub mod selection;
pub mod sink;

// Re-export commonly used types
pub use agent::{Agent, Reply};
pub use agent_factory::{build_agents, resolve_retrievers, ClientProvider, FactoryClients, Retrievers, MANAGER_NAME};
pub use controller::{reset_all, SessionController, SessionError, SessionOutcome};
pub use groupchat::GroupChat;
pub use participant::{LlmOverrides, ParticipantSpec, ReplyMode};
pub use registry::{RegistryError, RoleRegistry, DEFAULT_GROUP};
pub use sink::{CollectingSink, NullSink, TranscriptSink};

/// Opening message template for the code-generation flow
pub const INITIAL_MESSAGE_TEMPLATE: &str =
    "Retrieve relevant information and documents to support the following task: {problem}";

/// Problem statement offered when the user has not typed one
pub const DEFAULT_PROBLEM: &str = "Generate the leakage test method code using SmartRDI syntax. Now i want to set VDD33 = 5, VSS = 0.5; iRange to 100mA. Also I don't want to include any settling time";

/// Wrap a user problem statement in the opening message template.
///
/// A blank problem yields `None` so callers can reject it before a session
/// starts.
pub fn initial_message(problem: &str) -> Option<String> {
    let problem = problem.trim();
    if problem.is_empty() {
        return None;
    }
    Some(INITIAL_MESSAGE_TEMPLATE.replace("{problem}", problem))
}

/// What a session is about: the opening message and the text retrieval
/// searches with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTask {
    pub message: String,
    pub query: String,
}

impl SessionTask {
    /// Open with `message` and search on it as well
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            query: message.clone(),
            message,
        }
    }

    /// Open with the templated message, search on the bare problem
    pub fn from_problem(problem: &str) -> Self {
        Self {
            message: initial_message(problem).unwrap_or_default(),
            query: problem.trim().to_string(),
        }
    }
}
