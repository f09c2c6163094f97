//! Purpose: Hold one processing cycle's transient flash messages.
//! Exports: `RuntimeQueue`.
//! Role: Cycle-scoped queue; never persisted, discarded with the cycle.
//! Invariants: Append-only; slot ids are insertion ordinals and never shift.
use crate::core::message::{Kind, Message, MessageSlot};

#[derive(Debug, Default)]
pub struct RuntimeQueue {
    slots: Vec<MessageSlot>,
}

impl RuntimeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>, kind: Kind) -> &MessageSlot {
        let slot = MessageSlot {
            id: self.slots.len() as u64,
            message: Message::new(text, kind),
        };
        self.slots.push(slot);
        self.slots.last().expect("just pushed")
    }

    pub fn notice(&mut self, text: impl Into<String>) -> &MessageSlot {
        self.push(text, Kind::Notice)
    }

    pub fn error(&mut self, text: impl Into<String>) -> &MessageSlot {
        self.push(text, Kind::Error)
    }

    pub fn slots(&self) -> &[MessageSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
