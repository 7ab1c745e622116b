//! Session history assembly.
//!
//! Rebuilds what a persona "remembers" of a session from the consultation
//! log. The window is bounded to the most recent `max_exchanges` entries
//! and is always emitted oldest-first, whatever order the log returned.
//!
//! Two renderings of the same window:
//!
//! - **Turns**: alternating user/assistant messages. Each past response is
//!   cut to roughly `response_max_tokens` tokens (characters divided by
//!   `chars_per_token`), keeping its beginning.
//! - **Narrative**: a single prose block under a fixed header, each past
//!   response clipped to `narrative_clip_chars` characters.
//!
//! Truncation only shortens text. It never fails.

use serde::{Deserialize, Serialize};
use stakeholder_config::HistoryConfig;
use stakeholder_core::consultation::{HistoryStyle, LoggedExchange};
use stakeholder_core::message::Message;

/// Appended to a response cut down to the per-turn budget.
pub const TRUNCATION_MARKER: &str = "\n[... truncated]";

pub const NARRATIVE_HEADER: &str = "## Previous Conversation in This Session";

const NARRATIVE_DIVIDER: &str = "\n\n---\n\n";
const CLIP_MARKER: &str = "...";

/// Window and truncation knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPolicy {
    pub style: HistoryStyle,
    pub max_exchanges: usize,
    pub response_max_tokens: usize,
    pub chars_per_token: usize,
    pub narrative_clip_chars: usize,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            style: HistoryStyle::Turns,
            max_exchanges: 15,
            response_max_tokens: 1024,
            chars_per_token: 4,
            narrative_clip_chars: 500,
        }
    }
}

impl From<&HistoryConfig> for HistoryPolicy {
    fn from(config: &HistoryConfig) -> Self {
        Self {
            style: config.style,
            max_exchanges: config.max_exchanges,
            response_max_tokens: config.response_max_tokens,
            chars_per_token: config.chars_per_token,
            narrative_clip_chars: config.narrative_clip_chars,
        }
    }
}

impl HistoryPolicy {
    /// Character budget for one replayed response in turn style.
    pub fn response_max_chars(&self) -> usize {
        self.response_max_tokens.saturating_mul(self.chars_per_token)
    }
}

/// History ready to fold into a completion request.
#[derive(Debug, Clone, PartialEq)]
pub enum AssembledHistory {
    /// Goes between the system prompt and the new user prompt
    Turns(Vec<Message>),
    /// Goes at the end of the system prompt
    Narrative(String),
}

#[derive(Debug, Clone, Default)]
pub struct HistoryAssembler {
    policy: HistoryPolicy,
}

impl HistoryAssembler {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &HistoryPolicy {
        &self.policy
    }

    /// How many exchanges to ask the log for.
    pub fn window(&self) -> usize {
        self.policy.max_exchanges
    }

    /// Build the bounded history for one persona.
    ///
    /// `exchanges` may arrive in any order. Returns `None` when there is
    /// nothing to replay, so callers never emit an empty section.
    pub fn assemble(&self, persona_name: &str, mut exchanges: Vec<LoggedExchange>) -> Option<AssembledHistory> {
        if exchanges.is_empty() || self.policy.max_exchanges == 0 {
            return None;
        }

        exchanges.sort_by_key(|e| e.id);
        let skip = exchanges.len().saturating_sub(self.policy.max_exchanges);
        let window = &exchanges[skip..];

        let history = match self.policy.style {
            HistoryStyle::Turns => AssembledHistory::Turns(self.turns(window)),
            HistoryStyle::Narrative => AssembledHistory::Narrative(self.narrative(persona_name, window)),
        };
        Some(history)
    }

    fn turns(&self, window: &[LoggedExchange]) -> Vec<Message> {
        let budget = self.policy.response_max_chars();
        window
            .iter()
            .flat_map(|exchange| {
                [
                    Message::user(exchange.prompt.clone()),
                    Message::assistant(truncate_chars(&exchange.response, budget, TRUNCATION_MARKER)),
                ]
            })
            .collect()
    }

    fn narrative(&self, persona_name: &str, window: &[LoggedExchange]) -> String {
        let clip = self.policy.narrative_clip_chars;
        let body = window
            .iter()
            .map(|exchange| {
                format!(
                    "User: {}\n{persona_name}: {}",
                    exchange.prompt,
                    truncate_chars(&exchange.response, clip, CLIP_MARKER)
                )
            })
            .collect::<Vec<_>>()
            .join(NARRATIVE_DIVIDER);

        format!("{NARRATIVE_HEADER}\n\n{body}")
    }
}

/// Keep the first `max_chars` characters, then append `marker`.
///
/// Counts characters rather than bytes so multi-byte text is never split.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{marker}", &text[..cut]),
        None => text.to_string(),
    }
}
