use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::order::OrderId;

/// Unique message identifier, assigned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// A chat message between the buyer and seller of one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub order_id: OrderId,
    pub sender: UserId,
    pub receiver: UserId,
    pub body: String,
    #[serde(default)]
    pub photo: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Append-only message history of one order.
///
/// Writing is gated by [`crate::chat::compose`]; the log itself never checks
/// the chat window, so history stays readable after it closes. Appends are
/// idempotent on [`MessageId`] so polling readers can re-deliver freely.
/// Stored logs are loaded through [`ChatLog::merge`], so the same rules hold
/// for deserialized data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredChatLog")]
pub struct ChatLog {
    pub order_id: OrderId,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct StoredChatLog {
    order_id: OrderId,
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

impl From<StoredChatLog> for ChatLog {
    fn from(stored: StoredChatLog) -> Self {
        let mut log = ChatLog::new(stored.order_id);
        let total = stored.messages.len();
        let kept = log.merge(stored.messages);
        if kept < total {
            tracing::warn!(
                order_id = %log.order_id,
                dropped = total - kept,
                "stored chat log had duplicate or foreign messages"
            );
        }
        log
    }
}

impl ChatLog {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            messages: Vec::new(),
        }
    }

    /// Messages in timestamp order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Add a message. Returns false if it was already present or belongs to
    /// another order.
    pub fn append(&mut self, message: ChatMessage) -> bool {
        if message.order_id != self.order_id {
            tracing::warn!(
                log = %self.order_id,
                message_order = %message.order_id,
                "message for another order ignored"
            );
            return false;
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        tracing::debug!(
            order_id = %self.order_id,
            sender = %message.sender,
            "chat message appended"
        );
        self.messages.push(message);
        self.sort();
        true
    }

    /// Union with messages fetched elsewhere (dedup by id). Returns how many
    /// were new.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = ChatMessage>) -> usize {
        let mut seen: HashSet<MessageId> = self.messages.iter().map(|m| m.id.clone()).collect();
        let before = self.messages.len();
        for message in incoming {
            if message.order_id == self.order_id && seen.insert(message.id.clone()) {
                self.messages.push(message);
            }
        }
        self.sort();
        self.messages.len() - before
    }

    pub fn unread_for<'a>(&'a self, reader: &'a UserId) -> impl Iterator<Item = &'a ChatMessage> {
        self.messages
            .iter()
            .filter(move |m| !m.read && m.receiver == *reader)
    }

    /// Mark everything addressed to `reader` as read. Returns how many flipped.
    pub fn mark_read_by(&mut self, reader: &UserId) -> usize {
        let mut flipped = 0;
        for message in self.messages.iter_mut() {
            if !message.read && message.receiver == *reader {
                message.read = true;
                flipped += 1;
            }
        }
        flipped
    }

    fn sort(&mut self) {
        self.messages
            .sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    }
}
