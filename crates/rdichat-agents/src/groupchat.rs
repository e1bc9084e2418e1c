use rdichat_types::{Message, SelectionPolicy};

use crate::agent::Agent;

/// A bounded group conversation over a set of runtime agents
#[derive(Debug)]
pub struct GroupChat {
    pub agents: Vec<Agent>,
    pub messages: Vec<Message>,
    pub max_round: usize,
    pub policy: SelectionPolicy,
}

impl GroupChat {
    pub fn new(agents: Vec<Agent>, max_round: usize, policy: SelectionPolicy) -> Self {
        Self {
            agents,
            messages: Vec::new(),
            max_round,
            policy,
        }
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    /// Append a message from `speaker` to the transcript and deliver it to
    /// every agent's memory
    pub fn emit(&mut self, speaker: usize, content: String) -> &Message {
        let message = Message::new(self.messages.len(), self.agents[speaker].name(), content);
        for agent in &mut self.agents {
            agent.receive(&message);
        }
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() >= self.max_round
    }
}
