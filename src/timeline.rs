// timeline.rs

use crate::message::{Message, Role};

/// Ordered, append-only log of the chat.
///
/// Insertion order is the only ordering the timeline guarantees; message
/// timestamps are for display. There is no way to remove or edit an entry.
#[derive(Debug, Clone, Default)]
pub struct MessageTimeline {
    messages: Vec<Message>,
}

impl MessageTimeline {
    /// Creates a new, empty timeline.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Appends a message at the end of the timeline.
    ///
    /// # Arguments
    /// * `message` - The message to be stored.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Read-only view of every message, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Copies the current messages out for a renderer.
    ///
    /// # Returns
    /// * A vector of `Message` unaffected by later appends.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Counts the messages written by one role.
    pub fn count_by(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}
