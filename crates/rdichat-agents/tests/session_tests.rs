use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rdichat_agents::{
    build_agents, reset_all, ClientProvider, CollectingSink, NullSink, ParticipantSpec, Retrievers,
    SessionController, SessionError, SessionTask,
};
use rdichat_llm_api::{ChatMessage, LlmClient, LlmResponse};
use rdichat_retrieval::{CollectionStore, RetrieveConfig};
use rdichat_types::{SelectionPolicy, TerminationReason};
use tempfile::TempDir;
use tokio::sync::Semaphore;

/// Replies from a queue, then repeats `fallback`; records prompt sizes
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    prompt_lens: Mutex<Vec<usize>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedClient {
    fn new(fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            prompt_lens: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    fn scripted(replies: &[&str], fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            fallback: fallback.to_string(),
            prompt_lens: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from(vec![Err(message.to_string())])),
            fallback: String::new(),
            prompt_lens: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    fn gated(gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: "waited".to_string(),
            prompt_lens: Mutex::new(Vec::new()),
            gate: Some(gate),
        })
    }

    fn prompt_lens(&self) -> Vec<usize> {
        self.prompt_lens.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LlmResponse> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await?;
        }
        self.prompt_lens.lock().unwrap().push(messages.len());
        let next = self.replies.lock().unwrap().pop_front();
        let content = match next {
            Some(Ok(reply)) => reply,
            Some(Err(e)) => anyhow::bail!(e),
            None => self.fallback.clone(),
        };
        Ok(LlmResponse {
            message: ChatMessage::assistant(content),
            usage: None,
        })
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

#[derive(Default, Clone)]
struct ScriptedClients {
    agents: HashMap<String, Arc<ScriptedClient>>,
    manager: Option<Arc<ScriptedClient>>,
}

impl ScriptedClients {
    fn with(mut self, name: &str, client: Arc<ScriptedClient>) -> Self {
        self.agents.insert(name.to_string(), client);
        self
    }

    fn with_manager(mut self, client: Arc<ScriptedClient>) -> Self {
        self.manager = Some(client);
        self
    }
}

impl ClientProvider for ScriptedClients {
    fn client_for(&self, spec: &ParticipantSpec) -> Result<Arc<dyn LlmClient>> {
        let client = self
            .agents
            .get(&spec.name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no scripted client for {}", spec.name))?;
        Ok(client)
    }

    fn manager_client(&self) -> Result<Arc<dyn LlmClient>> {
        let client = self
            .manager
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no scripted manager"))?;
        Ok(client)
    }
}

fn llm(name: &str) -> ParticipantSpec {
    ParticipantSpec::llm(name, &format!("{} role", name), &format!("You are {}.", name))
}

fn ping_pong() -> SessionController {
    let clients = ScriptedClients::default()
        .with("A", ScriptedClient::new("pong from A"))
        .with("B", ScriptedClient::new("pong from B"));
    SessionController::new(vec![llm("A"), llm("B")], Arc::new(clients))
}

fn senders(outcome: &rdichat_agents::SessionOutcome) -> Vec<&str> {
    outcome.messages.iter().map(|m| m.sender.as_str()).collect()
}

#[tokio::test]
async fn test_round_robin_alternates_speakers() {
    let sink = CollectingSink::new();
    let outcome = ping_pong()
        .run_session("ping", 4, SelectionPolicy::RoundRobin, &sink)
        .await
        .unwrap();

    assert_eq!(senders(&outcome), vec!["A", "B", "A", "B"]);
    assert_eq!(outcome.messages[0].content, "ping");
    assert_eq!(outcome.messages[1].content, "pong from B");
    assert_eq!(outcome.reason, TerminationReason::RoundLimit);
    assert_eq!(sink.messages(), outcome.messages);
}

#[tokio::test]
async fn test_round_bound_gives_exactly_n_messages() {
    for n in [1, 2, 5, 9] {
        let sink = CollectingSink::new();
        let outcome = ping_pong()
            .run_session("ping", n, SelectionPolicy::RoundRobin, &sink)
            .await
            .unwrap();
        assert_eq!(outcome.messages.len(), n);
        assert_eq!(sink.messages().len(), n);
        let indexes: Vec<usize> = outcome.messages.iter().map(|m| m.index).collect();
        assert_eq!(indexes, (0..n).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_terminating_task_ends_after_first_message() {
    let a = ScriptedClient::new("never");
    let clients = ScriptedClients::default()
        .with("A", a.clone())
        .with("B", ScriptedClient::new("never"));
    let controller = SessionController::new(vec![llm("A"), llm("B")], Arc::new(clients));

    let outcome = controller
        .run_session("Nothing to do. terminate", 20, SelectionPolicy::RoundRobin, &NullSink)
        .await
        .unwrap();

    assert_eq!(outcome.messages.len(), 1);
    assert_eq!(outcome.reason, TerminationReason::TerminationMessage);
    assert!(a.prompt_lens().is_empty());
}

#[tokio::test]
async fn test_reply_with_termination_token_stops_session() {
    let clients = ScriptedClients::default()
        .with("A", ScriptedClient::new("more work"))
        .with("B", ScriptedClient::scripted(&["review pending", "Approved. TERMINATE"], "x"));
    let controller = SessionController::new(vec![llm("A"), llm("B")], Arc::new(clients));

    let outcome = controller
        .run_session("write code", 20, SelectionPolicy::RoundRobin, &NullSink)
        .await
        .unwrap();

    assert_eq!(senders(&outcome), vec!["A", "B", "A", "B"]);
    assert_eq!(outcome.reason, TerminationReason::TerminationMessage);
}

#[tokio::test]
async fn test_empty_task_is_rejected_without_transcript() {
    let sink = CollectingSink::new();
    for task in ["", "   ", "\n\t"] {
        let err = ping_pong()
            .run_session(task, 4, SelectionPolicy::RoundRobin, &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyTask));
        assert!(err.is_config_error());
    }
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_invalid_roster_and_round_bound() {
    let clients = ScriptedClients::default().with("A", ScriptedClient::new("x"));
    let solo = SessionController::new(vec![llm("A")], Arc::new(clients));
    assert!(matches!(
        solo.run_session("ping", 4, SelectionPolicy::RoundRobin, &NullSink).await,
        Err(SessionError::TooFewParticipants(1))
    ));

    assert!(matches!(
        ping_pong().run_session("ping", 0, SelectionPolicy::RoundRobin, &NullSink).await,
        Err(SessionError::InvalidRoundBound)
    ));
}

#[tokio::test]
async fn test_concurrent_session_is_busy() {
    let gate = Arc::new(Semaphore::new(0));
    let clients = ScriptedClients::default()
        .with("A", ScriptedClient::new("a"))
        .with("B", ScriptedClient::gated(gate.clone()));
    let controller = Arc::new(SessionController::new(vec![llm("A"), llm("B")], Arc::new(clients)));

    let running = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .run_session("ping", 2, SelectionPolicy::RoundRobin, &NullSink)
                .await
        })
    };

    while !controller.is_busy() {
        tokio::task::yield_now().await;
    }

    let second = controller
        .run_session("ping", 2, SelectionPolicy::RoundRobin, &NullSink)
        .await;
    assert!(matches!(second, Err(SessionError::Busy)));

    gate.add_permits(1);
    let first = running.await.unwrap().unwrap();
    assert_eq!(senders(&first), vec!["A", "B"]);
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn test_auto_reply_participant_exhausts() {
    let proxy = ParticipantSpec::auto_reply("Boss_Assistant", "retrieves", "Reply `TERMINATE` if the task is done.")
        .with_max_auto_replies(1);
    let clients = ScriptedClients::default().with("Coder", ScriptedClient::new("code"));
    let controller = SessionController::new(vec![proxy, llm("Coder")], Arc::new(clients));

    let outcome = controller
        .run_session("task", 20, SelectionPolicy::RoundRobin, &NullSink)
        .await
        .unwrap();

    assert_eq!(senders(&outcome), vec!["Boss_Assistant", "Coder", "Boss_Assistant", "Coder"]);
    assert_eq!(outcome.messages[2].content, "Reply `TERMINATE` if the task is done.");
    assert_eq!(outcome.reason, TerminationReason::AutoReplyExhausted);
}

#[tokio::test]
async fn test_auto_selection_uses_manager_and_falls_back() {
    let manager = ScriptedClient::scripted(&["C", "I am not sure"], "B");
    let clients = ScriptedClients::default()
        .with("A", ScriptedClient::new("a"))
        .with("B", ScriptedClient::new("b"))
        .with("C", ScriptedClient::new("c"))
        .with_manager(manager.clone());
    let controller = SessionController::new(vec![llm("A"), llm("B"), llm("C")], Arc::new(clients));

    let outcome = controller
        .run_session("ping", 4, SelectionPolicy::Auto, &NullSink)
        .await
        .unwrap();

    // C picked, then an unparsable answer falls back to the one after C, then B
    assert_eq!(senders(&outcome), vec!["A", "C", "A", "B"]);
    assert_eq!(manager.prompt_lens().len(), 3);
}

#[tokio::test]
async fn test_participant_error_carries_name() {
    let clients = ScriptedClients::default()
        .with("A", ScriptedClient::new("a"))
        .with("B", ScriptedClient::failing("rate limited"));
    let controller = SessionController::new(vec![llm("A"), llm("B")], Arc::new(clients));
    let sink = CollectingSink::new();

    let err = controller
        .run_session("ping", 4, SelectionPolicy::RoundRobin, &sink)
        .await
        .unwrap_err();

    match &err {
        SessionError::Participant { name, .. } => assert_eq!(name, "B"),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.to_string().contains("rate limited"));
    assert!(!err.is_config_error());
    // The opening message was already delivered
    assert_eq!(sink.messages().len(), 1);
}

#[tokio::test]
async fn test_sessions_start_from_fresh_memory() {
    let b = ScriptedClient::new("b");
    let clients = ScriptedClients::default()
        .with("A", ScriptedClient::new("a"))
        .with("B", b.clone());
    let controller = SessionController::new(vec![llm("A"), llm("B")], Arc::new(clients));

    for _ in 0..2 {
        controller
            .run_session("ping", 2, SelectionPolicy::RoundRobin, &NullSink)
            .await
            .unwrap();
    }

    // system prompt + the opening message, both times
    assert_eq!(b.prompt_lens(), vec![2, 2]);
}

#[tokio::test]
async fn test_retrieval_participant_opens_with_context() {
    let docs = TempDir::new().unwrap();
    std::fs::write(
        docs.path().join("smartrdi.txt"),
        "Leakage test: rdi.dc().iRange(100 mA) measures leakage current.",
    )
    .unwrap();
    std::fs::write(docs.path().join("other.txt"), "Functional pattern bursts.").unwrap();

    let assistant = ParticipantSpec::auto_reply("Boss_Assistant", "retrieves", "ok")
        .with_max_auto_replies(3)
        .with_retrieval(RetrieveConfig {
            docs_path: vec![docs.path().display().to_string()],
            n_results: 1,
            ..RetrieveConfig::default()
        });
    let clients = ScriptedClients::default().with("Coder", ScriptedClient::new("code TERMINATE"));
    let store = Arc::new(CollectionStore::new());
    let controller = SessionController::new(vec![assistant, llm("Coder")], Arc::new(clients))
        .with_collections(store.clone());

    let outcome = controller
        .run_session("leakage test with iRange", 20, SelectionPolicy::RoundRobin, &NullSink)
        .await
        .unwrap();

    let opening = &outcome.messages[0].content;
    assert!(opening.starts_with("leakage test with iRange\n\nContext is:"));
    assert!(opening.contains("rdi.dc().iRange(100 mA)"));
    assert!(!opening.contains("Functional pattern"));
    assert!(store.contains("groupchat"));
    assert_eq!(outcome.reason, TerminationReason::TerminationMessage);
}

fn retrieval_assistant(docs: &TempDir, get_or_create: bool) -> ParticipantSpec {
    ParticipantSpec::auto_reply("Boss_Assistant", "retrieves", "ok")
        .with_max_auto_replies(3)
        .with_retrieval(RetrieveConfig {
            docs_path: vec![docs.path().display().to_string()],
            n_results: 1,
            get_or_create,
            ..RetrieveConfig::default()
        })
}

#[tokio::test]
async fn test_retrieval_searches_on_problem_not_instruction() {
    let docs = TempDir::new().unwrap();
    std::fs::write(
        docs.path().join("intro.txt"),
        "Retrieve relevant information and documents to support your work.",
    )
    .unwrap();
    std::fs::write(
        docs.path().join("leakage.txt"),
        "Leakage test: set iRange before measuring.",
    )
    .unwrap();

    let clients = ScriptedClients::default().with("Coder", ScriptedClient::new("code TERMINATE"));
    let controller = SessionController::new(
        vec![retrieval_assistant(&docs, true), llm("Coder")],
        Arc::new(clients.clone()),
    );

    let task = SessionTask::from_problem("leakage test with iRange");
    let outcome = controller
        .run_session_with(&clients, &task, 20, SelectionPolicy::RoundRobin, &NullSink)
        .await
        .unwrap();

    let opening = &outcome.messages[0].content;
    assert!(opening.starts_with(
        "Retrieve relevant information and documents to support the following task: leakage test with iRange"
    ));
    assert!(opening.contains("set iRange before measuring"));
    assert!(!opening.contains("support your work"));
}

#[tokio::test]
async fn test_exclusive_collection_survives_repeat_sessions() {
    let docs = TempDir::new().unwrap();
    std::fs::write(docs.path().join("leakage.txt"), "Leakage test with iRange.").unwrap();

    let clients = ScriptedClients::default().with("Coder", ScriptedClient::new("code TERMINATE"));
    let store = Arc::new(CollectionStore::new());
    let controller = SessionController::new(
        vec![retrieval_assistant(&docs, false), llm("Coder")],
        Arc::new(clients.clone()),
    )
    .with_collections(store.clone());

    for _ in 0..2 {
        let outcome = controller
            .run_session("leakage test", 20, SelectionPolicy::RoundRobin, &NullSink)
            .await
            .unwrap();
        assert!(outcome.messages[0].content.contains("Leakage test with iRange."));
    }

    // Another controller claiming the same name is still refused
    let other = SessionController::new(
        vec![retrieval_assistant(&docs, false), llm("Coder")],
        Arc::new(clients),
    )
    .with_collections(store);
    let err = other
        .run_session("leakage test", 20, SelectionPolicy::RoundRobin, &NullSink)
        .await
        .unwrap_err();
    assert!(matches!(&err, SessionError::Participant { name, .. } if name == "Boss_Assistant"));
    assert!(err.to_string().contains("already exists"));
}

#[tokio::test]
async fn test_reset_all_is_idempotent() {
    let clients = ScriptedClients::default()
        .with("A", ScriptedClient::new("a"))
        .with("B", ScriptedClient::new("b"));
    let mut agents = build_agents(&[llm("A"), llm("B")], &clients, &Retrievers::new()).unwrap();

    let msg = rdichat_types::Message::new(0, "A", "hello");
    for agent in agents.iter_mut() {
        agent.receive(&msg);
    }

    reset_all(&mut agents);
    let once: Vec<usize> = agents.iter().map(|a| a.memory().len()).collect();
    reset_all(&mut agents);
    let twice: Vec<usize> = agents.iter().map(|a| a.memory().len()).collect();

    assert_eq!(once, vec![0, 0]);
    assert_eq!(once, twice);
}
