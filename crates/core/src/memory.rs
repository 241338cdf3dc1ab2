use crate::chat::Message;

/// Conversation history with no size limit. Lives for one process run.
#[derive(Debug, Default, Clone)]
pub struct UnconstrainedMemory {
    messages: Vec<Message>,
}

impl UnconstrainedMemory {
    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops every message after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }
}
