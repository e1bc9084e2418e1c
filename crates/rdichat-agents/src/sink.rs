use std::sync::Mutex;

use rdichat_types::Message;

/// Receives each transcript message as it is emitted
pub trait TranscriptSink: Send + Sync {
    fn append(&self, message: &Message);
}

/// Keeps every message, for batch responses and tests
#[derive(Debug, Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<Message>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl TranscriptSink for CollectingSink {
    fn append(&self, message: &Message) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
    }
}

/// Discards messages
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TranscriptSink for NullSink {
    fn append(&self, _message: &Message) {}
}
