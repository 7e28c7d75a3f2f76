//! Conversation history for agent runs
//!
//! A run keeps one history across handoffs. The active agent's
//! instructions are not stored here; the runner prepends them on every turn
//! so a handoff swaps the system prompt without rewriting history.

use crate::providers::Message;

const SUMMARY_PREFIX: &str = "Summary of earlier conversation:";

/// Conversation history with token estimation and pruning
///
/// Token counts use a characters / 4 heuristic.
///
/// # Pruning Strategy
///
/// When the estimate exceeds `prune_threshold * max_tokens`:
/// 1. Keep system messages
/// 2. Keep the last `min_retain_turns` user turns and everything after them
/// 3. Replace older messages with a summary system message
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    token_count: usize,
    max_tokens: usize,
    min_retain_turns: usize,
    prune_threshold: f64,
}

impl Conversation {
    /// Creates a new conversation with specified limits
    ///
    /// # Examples
    ///
    /// ```
    /// use qiita_editor::agent::Conversation;
    ///
    /// let conversation = Conversation::new(8000, 10, 0.8);
    /// assert_eq!(conversation.token_count(), 0);
    /// ```
    pub fn new(max_tokens: usize, min_retain_turns: usize, prune_threshold: f64) -> Self {
        Self {
            messages: Vec::new(),
            token_count: 0,
            max_tokens,
            min_retain_turns: min_retain_turns.max(1),
            prune_threshold: prune_threshold.clamp(0.0, 1.0),
        }
    }

    /// Build a conversation from the agent configuration
    pub fn from_config(config: &crate::config::ConversationConfig) -> Self {
        Self::new(
            config.max_tokens,
            config.min_retain_turns,
            config.prune_threshold.into(),
        )
    }

    /// Appends any message
    pub fn push(&mut self, message: Message) {
        self.token_count += estimate_message_tokens(&message);
        self.messages.push(message);
        self.prune_if_needed();
    }

    /// Adds a user message to the conversation
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Adds a tool result message to the conversation
    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.push(Message::tool_result(tool_call_id, content));
    }

    fn prune_if_needed(&mut self) {
        let threshold = (self.max_tokens as f64 * self.prune_threshold) as usize;
        if self.token_count <= threshold {
            return;
        }

        let keep_from_index = self
            .messages
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, m)| m.role == "user")
            .nth(self.min_retain_turns - 1)
            .map(|(idx, _)| idx);

        // Not enough turns yet; nothing can be dropped safely
        let keep_from_index = match keep_from_index {
            Some(idx) if idx > 0 => idx,
            _ => return,
        };

        let mut system_messages = Vec::new();
        let mut to_prune = Vec::new();
        let mut to_keep = Vec::new();

        for (idx, message) in self.messages.drain(..).enumerate() {
            let is_summary = message.role == "system"
                && message
                    .content
                    .as_deref()
                    .is_some_and(|c| c.starts_with(SUMMARY_PREFIX));
            if message.role == "system" && !is_summary {
                system_messages.push(message);
            } else if idx < keep_from_index || is_summary {
                to_prune.push(message);
            } else {
                to_keep.push(message);
            }
        }

        if !to_prune.is_empty() {
            tracing::debug!("Pruned {} messages from conversation", to_prune.len());
            system_messages.push(Message::system(summarize(&to_prune)));
        }

        self.messages = system_messages;
        self.messages.extend(to_keep);
        self.token_count = self.messages.iter().map(estimate_message_tokens).sum();
    }

    /// Returns all messages in the conversation
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the estimated token count
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Returns the maximum token limit
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Returns the number of messages in the conversation
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn summarize(messages: &[Message]) -> String {
    let mut user_messages = 0;
    let mut assistant_messages = 0;
    let mut tool_calls = 0;

    for message in messages {
        match message.role.as_str() {
            "user" => user_messages += 1,
            "assistant" => {
                assistant_messages += 1;
                tool_calls += message.tool_calls.as_ref().map_or(0, Vec::len);
            }
            _ => {}
        }
    }

    let mut summary = format!("{}\n\n", SUMMARY_PREFIX);
    summary.push_str(&format!("- {} user messages\n", user_messages));
    summary.push_str(&format!("- {} assistant responses\n", assistant_messages));
    if tool_calls > 0 {
        summary.push_str(&format!("- {} tool calls executed\n", tool_calls));
    }

    if let Some(content) = messages.first().and_then(|m| m.content.as_deref()) {
        summary.push_str(&format!("\nFirst message: {}\n", truncate_chars(content, 100)));
    }
    if messages.len() > 1 {
        if let Some(content) = messages.last().and_then(|m| m.content.as_deref()) {
            summary.push_str(&format!("Last message: {}\n", truncate_chars(content, 100)));
        }
    }

    summary
}

fn estimate_message_tokens(message: &Message) -> usize {
    let content = message.content.as_deref().map_or(0, estimate_tokens);
    let calls = message.tool_calls.as_ref().map_or(0, |calls| {
        calls
            .iter()
            .map(|c| estimate_tokens(&c.function.name) + estimate_tokens(&c.function.arguments))
            .sum()
    });
    content + calls
}

/// Estimates token count as characters / 4, rounded up
fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() + 3) / 4
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        truncated.push_str("...");
        truncated
    }
}
