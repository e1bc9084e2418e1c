use regex::Regex;
use rdichat_llm_api::{ChatMessage, LlmClient};
use rdichat_types::Message;

use crate::agent::Agent;

/// Index of the participant after `last`, wrapping around
pub fn round_robin_next(last: usize, participants: usize) -> usize {
    (last + 1) % participants
}

/// System prompt asking the manager model for the next role
pub fn selection_prompt(agents: &[Agent]) -> String {
    let roles = agents
        .iter()
        .map(|a| format!("{}: {}", a.name(), a.spec().description))
        .collect::<Vec<_>>()
        .join("\n");
    let names = agents.iter().map(|a| a.name()).collect::<Vec<_>>().join(", ");
    format!(
        "You are in a role play game. The following roles are available:\n{}.\n\n\
         Read the following conversation.\n\
         Then select the next role from [{}] to play. Only return the role.",
        roles, names
    )
}

/// Find the single participant named in `answer`.
///
/// Names match on word boundaries, either verbatim or with underscores
/// written as spaces. An answer naming no one, or several people, is
/// unparsable.
pub fn parse_speaker(answer: &str, names: &[&str]) -> Option<usize> {
    let trimmed = answer.trim();
    if let Some(idx) = names.iter().position(|n| *n == trimmed) {
        return Some(idx);
    }

    let mut found = None;
    for (idx, name) in names.iter().enumerate() {
        let spaced = name.replace('_', " ");
        let pattern = format!(
            r"(?:^|[^A-Za-z0-9_])(?:{}|{})(?:[^A-Za-z0-9_]|$)",
            regex::escape(name),
            regex::escape(&spaced)
        );
        let matched = Regex::new(&pattern)
            .map(|re| re.is_match(answer))
            .unwrap_or(false);
        if matched {
            if found.is_some() {
                return None;
            }
            found = Some(idx);
        }
    }
    found
}

/// Ask `manager` who speaks next; `None` when the answer cannot be mapped to
/// exactly one participant
pub async fn select_auto(
    manager: &dyn LlmClient,
    agents: &[Agent],
    transcript: &[Message],
) -> anyhow::Result<Option<usize>> {
    let mut prompt = vec![ChatMessage::system(selection_prompt(agents))];
    for msg in transcript {
        prompt.push(ChatMessage::user(msg.content.clone()).with_name(&msg.sender));
    }
    let names: Vec<&str> = agents.iter().map(|a| a.name()).collect();
    prompt.push(ChatMessage::system(format!(
        "Read the above conversation. Then select the next role from [{}] to play. Only return the role.",
        names.join(", ")
    )));

    let answer = manager.chat_completion(&prompt).await?;
    let choice = parse_speaker(&answer, &names);
    if choice.is_none() {
        tracing::warn!("could not map speaker answer {:?} to a participant", answer);
    }
    Ok(choice)
}
