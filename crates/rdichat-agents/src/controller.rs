use std::sync::Arc;

use rdichat_retrieval::CollectionStore;
use rdichat_types::{Message, SelectionPolicy, SessionState, TerminationReason};
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};

use crate::agent::{Agent, Reply};
use crate::agent_factory::{build_agents, resolve_retrievers, ClientProvider, Retrievers, MANAGER_NAME};
use crate::groupchat::GroupChat;
use crate::participant::ParticipantSpec;
use crate::selection::{round_robin_next, select_auto};
use crate::sink::TranscriptSink;
use crate::SessionTask;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("task must not be empty")]
    EmptyTask,

    #[error("a group conversation needs at least 2 participants, got {0}")]
    TooFewParticipants(usize),

    #[error("max_rounds must be at least 1")]
    InvalidRoundBound,

    #[error("a session is already running for this participant set")]
    Busy,

    #[error("participant '{name}' failed: {source}")]
    Participant {
        name: String,
        #[source]
        source: BoxError,
    },
}

impl SessionError {
    pub fn participant(name: impl Into<String>, err: anyhow::Error) -> Self {
        SessionError::Participant {
            name: name.into(),
            source: err.into(),
        }
    }

    /// Configuration problems are reported before any message is produced
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SessionError::EmptyTask
                | SessionError::TooFewParticipants(_)
                | SessionError::InvalidRoundBound
        )
    }
}

/// The finished transcript and why the conversation stopped
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub messages: Vec<Message>,
    pub reason: TerminationReason,
}

/// Clear every agent's conversational memory
pub fn reset_all(agents: &mut [Agent]) {
    for agent in agents {
        agent.reset();
    }
}

/// Runs group conversations for a fixed participant set, one at a time
pub struct SessionController {
    roster: Vec<ParticipantSpec>,
    clients: Arc<dyn ClientProvider>,
    collections: Arc<CollectionStore>,
    /// Opened on the first session and kept for the controller's lifetime
    retrievers: OnceCell<Retrievers>,
    in_flight: Mutex<()>,
}

impl SessionController {
    pub fn new(roster: Vec<ParticipantSpec>, clients: Arc<dyn ClientProvider>) -> Self {
        Self {
            roster,
            clients,
            collections: Arc::new(CollectionStore::new()),
            retrievers: OnceCell::new(),
            in_flight: Mutex::new(()),
        }
    }

    /// Share retrieval collections with other controllers
    pub fn with_collections(mut self, collections: Arc<CollectionStore>) -> Self {
        self.collections = collections;
        self
    }

    pub fn roster(&self) -> &[ParticipantSpec] {
        &self.roster
    }

    pub fn collections(&self) -> &Arc<CollectionStore> {
        &self.collections
    }

    /// Whether a session is currently running
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    fn validate(&self, task: &str, max_rounds: usize) -> Result<(), SessionError> {
        if task.trim().is_empty() {
            return Err(SessionError::EmptyTask);
        }
        if self.roster.len() < 2 {
            return Err(SessionError::TooFewParticipants(self.roster.len()));
        }
        if max_rounds == 0 {
            return Err(SessionError::InvalidRoundBound);
        }
        Ok(())
    }

    /// Run one group conversation on `task`.
    ///
    /// The first participant opens with the task; speakers then follow
    /// `policy` until a message ends with the termination token, the
    /// transcript holds `max_rounds` messages, or an auto-reply participant
    /// runs out of replies. Every message is handed to `sink` as it is
    /// emitted.
    pub async fn run_session(
        &self,
        task: &str,
        max_rounds: usize,
        policy: SelectionPolicy,
        sink: &dyn TranscriptSink,
    ) -> Result<SessionOutcome, SessionError> {
        let clients = Arc::clone(&self.clients);
        self.run_session_with(clients.as_ref(), &SessionTask::new(task), max_rounds, policy, sink)
            .await
    }

    /// Like [`run_session`](Self::run_session), with models supplied per
    /// call (credentials entered in the web UI) and a retrieval query apart
    /// from the opening message. The one-session-at-a-time rule still
    /// applies.
    pub async fn run_session_with(
        &self,
        clients: &dyn ClientProvider,
        task: &SessionTask,
        max_rounds: usize,
        policy: SelectionPolicy,
        sink: &dyn TranscriptSink,
    ) -> Result<SessionOutcome, SessionError> {
        self.validate(&task.message, max_rounds)?;
        let _guard = self.in_flight.try_lock().map_err(|_| SessionError::Busy)?;

        let retrievers = self
            .retrievers
            .get_or_try_init(|| resolve_retrievers(&self.roster, &self.collections))
            .await
            .map_err(|(name, e)| SessionError::participant(name, e))?;
        let mut agents = build_agents(&self.roster, clients, retrievers)
            .map_err(|(name, e)| SessionError::participant(name, e))?;
        reset_all(&mut agents);

        let manager = match policy {
            SelectionPolicy::Auto => Some(
                clients
                    .manager_client()
                    .map_err(|e| SessionError::participant(MANAGER_NAME, e))?,
            ),
            SelectionPolicy::RoundRobin => None,
        };

        let mut chat = GroupChat::new(agents, max_rounds, policy);
        tracing::info!(
            participants = ?chat.agent_names(),
            max_rounds,
            policy = %policy,
            "starting group conversation"
        );

        let mut state = SessionState::Idle;
        transition(&mut state, SessionState::AwaitingSpeaker);

        let mut speaker = 0;
        let mut opening = Some(
            chat.agents[speaker]
                .initiate(&task.message, &task.query)
                .await
                .map_err(|e| SessionError::participant(chat.agents[speaker].name(), e))?,
        );

        let reason = loop {
            let content = if let Some(content) = opening.take() {
                content
            } else {
                transition(&mut state, SessionState::AwaitingSpeaker);
                speaker = self.next_speaker(&chat, speaker, manager.as_deref()).await?;
                let agent = &mut chat.agents[speaker];
                match agent.generate_reply().await {
                    Ok(Reply::Content(content)) => content,
                    Ok(Reply::Exhausted) => {
                        tracing::info!(agent = %agent.name(), "auto replies exhausted");
                        break TerminationReason::AutoReplyExhausted;
                    }
                    Err(e) => return Err(SessionError::participant(agent.name(), e)),
                }
            };

            transition(&mut state, SessionState::SpeakerEmitsMessage);
            let message = chat.emit(speaker, content);
            tracing::debug!(index = message.index, sender = %message.sender, "message emitted");
            sink.append(message);
            let terminated = message.is_termination();

            transition(&mut state, SessionState::TerminationCheck);
            if terminated {
                break TerminationReason::TerminationMessage;
            }
            if chat.is_full() {
                break TerminationReason::RoundLimit;
            }
        };

        transition(&mut state, SessionState::Terminated);
        tracing::info!(messages = chat.messages.len(), reason = %reason, "group conversation finished");

        Ok(SessionOutcome {
            messages: chat.messages,
            reason,
        })
    }

    async fn next_speaker(
        &self,
        chat: &GroupChat,
        last: usize,
        manager: Option<&dyn rdichat_llm_api::LlmClient>,
    ) -> Result<usize, SessionError> {
        let fallback = round_robin_next(last, chat.agents.len());
        match (chat.policy, manager) {
            (SelectionPolicy::Auto, Some(manager)) => {
                let choice = select_auto(manager, &chat.agents, &chat.messages)
                    .await
                    .map_err(|e| SessionError::participant(MANAGER_NAME, e))?;
                Ok(choice.unwrap_or(fallback))
            }
            _ => Ok(fallback),
        }
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    tracing::debug!(from = ?state, to = ?next, "session state");
    *state = next;
}
