//! Insertion-ordered chat log with upsert by message id.

use std::collections::HashMap;

use tableside_types::chat::ChatMessage;

/// Ordered map of message id -> message.
///
/// New ids append. A known id keeps its position, author and role; only its
/// content is replaced.
#[derive(Debug, Default, Clone)]
pub struct ChatLog {
    entries: Vec<ChatMessage>,
    index: HashMap<String, usize>,
}

impl ChatLog {
    /// Build from stored rows already in insertion order.
    ///
    /// A repeated id keeps the first position and the last content.
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        let mut log = Self::default();
        for message in messages {
            log.upsert(message);
        }
        log
    }

    /// Insert, or replace the content of a known id. Returns `true` if the id was new.
    pub fn upsert(&mut self, message: ChatMessage) -> bool {
        match self.index.get(&message.id) {
            Some(&pos) => {
                self.entries[pos].content = message.content;
                false
            }
            None => {
                self.index.insert(message.id.clone(), self.entries.len());
                self.entries.push(message);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
