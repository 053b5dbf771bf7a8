use shared::domain::AccessGrant;
use shared::protocol::Message;

/// Who may broadcast a room-wide history clear. Local clears are always
/// allowed; this only governs the `clear_history` emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearPolicy {
    #[default]
    OwnerOnly,
    AnyParticipant,
}

/// Append-only log of accepted messages, in arrival order. No deduplication,
/// no reordering, no capacity bound; history grows until cleared.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the message iff its sender is permitted by the grant.
    /// Returns whether the message was accepted.
    pub fn accept(&mut self, message: Message, grant: &AccessGrant) -> bool {
        if !grant.permits_sender(&message.sender) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn clear(&mut self) {
        self.messages.clear();
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
}

#[cfg(test)]
#[path = "tests/message_store_tests.rs"]
mod tests;
