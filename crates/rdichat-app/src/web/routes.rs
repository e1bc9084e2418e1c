use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use rdichat_agents::{NullSink, SessionError, SessionOutcome, TranscriptSink, DEFAULT_PROBLEM};
use rdichat_logging::safe_truncate;
use rdichat_models::ModelChoice;
use rdichat_types::Message;

use crate::app::{generate, AppConfig, GenerateError, GenerateRequest};
use crate::web::protocol::{ClientMessage, ServerMessage};

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<AppConfig>,
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/models", get(list_models))
        .route("/api/roles", get(list_roles))
        .route("/api/defaults", get(get_defaults))
        .route("/api/generate", post(generate_batch))
        .route("/ws", get(websocket_handler))
        .route("/", get(serve_index))
        .with_state(state)
}

/// GET /api/models - Models offered in the picker
async fn list_models() -> Json<serde_json::Value> {
    let models: Vec<_> = ModelChoice::ALL
        .iter()
        .map(|m| serde_json::json!({ "id": m.as_str(), "name": m.display_name() }))
        .collect();
    Json(serde_json::json!({
        "models": models,
        "default": ModelChoice::default().as_str(),
    }))
}

/// GET /api/roles - Known roles and the group speaking order
async fn list_roles(State(state): State<AppState>) -> Json<serde_json::Value> {
    let roles: Vec<_> = state
        .app
        .roles
        .iter()
        .map(|spec| {
            serde_json::json!({
                "name": spec.name,
                "description": spec.description,
                "reply_mode": spec.reply_mode,
                "retrieval": spec.retrieve.is_some(),
            })
        })
        .collect();
    Json(serde_json::json!({
        "group": state.app.group_names(),
        "roles": roles,
    }))
}

/// GET /api/defaults - Values the page starts from
async fn get_defaults(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "problem": DEFAULT_PROBLEM,
        "max_rounds": state.app.max_rounds,
        "policy": state.app.policy,
        "server_key": state.app.default_clients.is_some(),
        "busy": state.app.controller.is_busy(),
    }))
}

/// POST /api/generate - Run a conversation and return the whole transcript
async fn generate_batch(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<SessionOutcome>, AppError> {
    let outcome = generate(&state.app, request, &NullSink).await?;
    Ok(Json(outcome))
}

/// GET /ws - WebSocket endpoint
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Forwards transcript messages to one WebSocket client
pub struct WebSink {
    tx: mpsc::UnboundedSender<ServerMessage>,
    participants: Vec<String>,
    max_rounds: usize,
    started: AtomicBool,
}

impl WebSink {
    pub fn new(tx: mpsc::UnboundedSender<ServerMessage>, participants: Vec<String>, max_rounds: usize) -> Self {
        Self {
            tx,
            participants,
            max_rounds,
            started: AtomicBool::new(false),
        }
    }
}

impl TranscriptSink for WebSink {
    fn append(&self, message: &Message) {
        if !self.started.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(ServerMessage::SessionStarted {
                participants: self.participants.clone(),
                max_rounds: self.max_rounds,
            });
        }
        // A closed channel means the client went away; the session still finishes
        let _ = self.tx.send(ServerMessage::Message {
            message: message.clone(),
        });
    }
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Spawn task to send messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sink.send(WsMessage::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(Ok(msg)) = ws_stream.next().await {
        let WsMessage::Text(text) = msg else {
            continue;
        };
        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Generate(request)) => {
                // Never await the session here, the reader must keep draining frames
                let app = Arc::clone(&state.app);
                let tx = tx.clone();
                tokio::spawn(async move { run_generation(app, request, tx).await });
            }
            Err(e) => {
                let _ = tx.send(invalid_frame(&text, &e));
            }
        }
    }

    drop(tx);
    // Let queued frames of a finished session flush; running sessions end on their own
    if let Err(e) = send_task.await {
        tracing::debug!("WebSocket send task ended: {}", e);
    }
}

/// Longest excerpt of a rejected frame echoed back or logged
const FRAME_EXCERPT_CHARS: usize = 80;

fn invalid_frame(text: &str, err: &serde_json::Error) -> ServerMessage {
    let excerpt = safe_truncate(text, FRAME_EXCERPT_CHARS);
    tracing::debug!("unparsable WebSocket frame {:?}: {}", excerpt, err);
    ServerMessage::Error {
        message: format!("Invalid message {:?}: {}", excerpt, err),
        recoverable: true,
    }
}

async fn run_generation(
    app: Arc<AppConfig>,
    request: GenerateRequest,
    tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let participants = app.group_names().iter().map(|s| s.to_string()).collect();
    let max_rounds = request.max_rounds.unwrap_or(app.max_rounds);
    let sink = WebSink::new(tx.clone(), participants, max_rounds);

    let reply = match generate(&app, request, &sink).await {
        Ok(outcome) => ServerMessage::SessionCompleted {
            reason: outcome.reason,
            message_count: outcome.messages.len(),
        },
        Err(e) if e.is_config_error() || matches!(e, GenerateError::Session(SessionError::Busy)) => {
            ServerMessage::Warning { message: e.to_string() }
        }
        Err(e) => {
            tracing::warn!("generation failed: {}", e);
            ServerMessage::Error {
                message: e.to_string(),
                recoverable: true,
            }
        }
    };
    let _ = tx.send(reply);
}

/// GET / - Serve the chat page
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../../web/index.html"))
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    Generate(GenerateError),
}

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        AppError::Generate(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Generate(err) = self;
        let (status, kind) = match &err {
            GenerateError::Session(SessionError::Busy) => (StatusCode::CONFLICT, "busy"),
            e if e.is_config_error() => (StatusCode::BAD_REQUEST, "configuration"),
            _ => (StatusCode::BAD_GATEWAY, "runtime"),
        };

        let body = Json(serde_json::json!({
            "error": err.to_string(),
            "kind": kind,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_web_sink_announces_session_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = WebSink::new(tx, vec!["A".into(), "B".into()], 4);

        sink.append(&Message::new(0, "A", "ping"));
        sink.append(&Message::new(1, "B", "pong"));

        let frames: Vec<ServerMessage> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(frames.len(), 3);
        assert!(matches!(
            &frames[0],
            ServerMessage::SessionStarted { participants, max_rounds: 4 } if participants == &["A", "B"]
        ));
        assert!(matches!(&frames[2], ServerMessage::Message { message } if message.content == "pong"));
    }

    #[test]
    fn test_invalid_frame_quotes_a_bounded_excerpt() {
        let text = format!("{{\"type\": \"Generate\", \"data\": \"{}\"", "x".repeat(5000));
        let err = serde_json::from_str::<ClientMessage>(&text).unwrap_err();

        let ServerMessage::Error { message, recoverable } = invalid_frame(&text, &err) else {
            panic!("expected an error frame");
        };
        assert!(recoverable);
        assert!(message.contains("xxx..."));
        assert!(message.len() < 300);
    }

    #[test]
    fn test_web_sink_survives_closed_client() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = WebSink::new(tx, vec![], 1);
        sink.append(&Message::new(0, "A", "ping"));
    }
}
