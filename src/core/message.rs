//! Purpose: Define the message envelope shared by every notification collection.
//! Exports: `Kind`, `Message`, `MessageSlot`, `sticky_slot_id`.
//! Role: Stable value types; serde shapes here are the persisted wire format.
//! Invariants: `Message` is immutable once created; text passes through unmodified.
//! Invariants: Sticky slot ids are derived from text and never renumbered.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Notice,
    Error,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Notice => "notice",
            Kind::Error => "error",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub kind: Kind,
}

impl Message {
    pub fn new(text: impl Into<String>, kind: Kind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// A message plus the identity used for suppression lookups.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MessageSlot {
    pub id: u64,
    pub message: Message,
}

/// Stable identifier for a sticky message, derived from its text.
///
/// Removal of other slots never shifts this id, and re-adding the same text
/// yields the same id, so suppression records stay valid across both.
pub fn sticky_slot_id(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
