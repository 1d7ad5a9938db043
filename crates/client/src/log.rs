use std::collections::HashMap;

use makerlink_shared::events::{ChatMessage, ReactionEntry};

/// Id-keyed merge state for one chat. Live relay events and REST-fetched
/// pages both land here: the same row may arrive twice (duplicate emits,
/// refetch after a live event) and in any order, so everything merges by
/// message id and iteration order comes from (created_at, id), never from
/// arrival order.
#[derive(Default)]
pub struct MessageLog {
    messages: HashMap<String, ChatMessage>,
    reactions: HashMap<String, Vec<ReactionEntry>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one message; returns true if it was new. Read state is
    /// monotonic: a stale unread copy never downgrades a read one.
    pub fn merge(&mut self, msg: ChatMessage) -> bool {
        match self.messages.get_mut(&msg.id) {
            Some(existing) => {
                if msg.is_read && !existing.is_read {
                    existing.is_read = true;
                    existing.read_at = msg.read_at;
                    existing.read_by = msg.read_by;
                }
                false
            }
            None => {
                self.messages.insert(msg.id.clone(), msg);
                true
            }
        }
    }

    /// Merge a REST page; returns how many messages were new.
    pub fn merge_page(&mut self, page: Vec<ChatMessage>) -> usize {
        page.into_iter().filter(|m| self.merge(m.clone())).count()
    }

    pub fn apply_read(&mut self, message_id: &str, read_by: &str, read_at: &str) {
        if let Some(msg) = self.messages.get_mut(message_id) {
            if !msg.is_read {
                msg.is_read = true;
                msg.read_by = Some(read_by.to_string());
                msg.read_at = Some(read_at.to_string());
            }
        }
    }

    /// Reaction events carry the full current list, so the local copy is
    /// replaced wholesale rather than patched.
    pub fn set_reactions(&mut self, message_id: &str, reactions: Vec<ReactionEntry>) {
        if reactions.is_empty() {
            self.reactions.remove(message_id);
        } else {
            self.reactions.insert(message_id.to_string(), reactions);
        }
    }

    pub fn reactions(&self, message_id: &str) -> &[ReactionEntry] {
        self.reactions
            .get(message_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Messages in chronological (created_at, id) order.
    pub fn ordered(&self) -> Vec<&ChatMessage> {
        let mut msgs: Vec<&ChatMessage> = self.messages.values().collect();
        msgs.sort_by(|a, b| {
            (a.created_at.as_str(), a.id.as_str()).cmp(&(b.created_at.as_str(), b.id.as_str()))
        });
        msgs
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
