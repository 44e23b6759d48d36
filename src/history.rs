//! Bounded conversation history.
//!
//! Turns are retained oldest-first up to a fixed retention bound; older turns
//! are evicted on append. Reads that feed the model go through
//! [`ConversationHistory::context_window`], which caps each turn's text so a
//! single huge command output cannot crowd out the rest of the context.

use crate::textutil::prefix_by_chars;
use crate::types::{Message, Role};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default number of retained turns.
pub const DEFAULT_RETENTION: usize = 50;
/// Default per-turn character cap applied on context reads.
pub const DEFAULT_TURN_CHAR_CAP: usize = 1000;

/// One retained turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Monotonic append counter; never reused within a history, even across
    /// [`ConversationHistory::clear`].
    pub seq: u64,
    pub timestamp_ms: u64,
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.text.clone(),
        }
    }
}

/// Serializable point-in-time copy of a history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub next_seq: u64,
    pub turns: Vec<ConversationTurn>,
}

/// Ordered, retention-bounded list of turns.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    retention: usize,
    turn_char_cap: usize,
    next_seq: u64,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION, DEFAULT_TURN_CHAR_CAP)
    }
}

impl ConversationHistory {
    /// Create an empty history. A retention of zero is treated as one.
    pub fn new(retention: usize, turn_char_cap: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            retention: retention.max(1),
            turn_char_cap,
            next_seq: 0,
        }
    }

    /// Append one turn, evicting from the front past the retention bound.
    /// Returns the turn's sequence number.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.turns.push_back(ConversationTurn {
            seq,
            timestamp_ms: now_unix_millis(),
            role,
            text: text.into(),
        });
        while self.turns.len() > self.retention {
            self.turns.pop_front();
        }
        seq
    }

    pub fn append_user(&mut self, text: impl Into<String>) -> u64 {
        self.append(Role::User, text)
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) -> u64 {
        self.append(Role::Assistant, text)
    }

    /// The last `n` retained turns, oldest first, untruncated.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ConversationTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip)
    }

    /// The last `n` turns as model context, each capped to the per-turn limit.
    pub fn context_window(&self, n: usize) -> Vec<Message> {
        self.recent(n)
            .map(|turn| Message {
                role: turn.role,
                content: prefix_by_chars(&turn.text, self.turn_char_cap).to_string(),
            })
            .collect()
    }

    /// Every retained turn in full, for transcript restore.
    pub fn transcript(&self) -> Vec<Message> {
        self.turns.iter().map(ConversationTurn::to_message).collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            next_seq: self.next_seq,
            turns: self.turns.iter().cloned().collect(),
        }
    }

    /// Replace contents with a persisted snapshot, re-applying retention.
    pub fn restore(&mut self, snapshot: HistorySnapshot) {
        let highest_seq = snapshot.turns.iter().map(|turn| turn.seq + 1).max();
        self.turns = snapshot.turns.into();
        while self.turns.len() > self.retention {
            self.turns.pop_front();
        }
        self.next_seq = snapshot.next_seq.max(highest_seq.unwrap_or(0));
    }
}

fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
