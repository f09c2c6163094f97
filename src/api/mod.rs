//! Purpose: Define the stable public Rust API boundary for Noticeboard.
//! Exports: Message lifecycle types and the store abstraction used by hosts.
//! Role: Public, additive-only surface; the only path to core internals.
//! Invariants: Hosts construct services here and drive them explicitly;
//! nothing registers implicit callbacks.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::blob::{BlobStore, FsBlobStore, MemBlobStore, STICKY_KEY, SUPPRESSED_KEY};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::message::{Kind, Message, MessageSlot, sticky_slot_id};
pub use crate::core::queue::RuntimeQueue;
pub use crate::core::service::{NotificationService, RenderedMessage, SUPPRESS_ACK};
pub use crate::core::sticky::{STICKY_TTL, StickyRegistry};
pub use crate::core::suppress::{Collection, SuppressionLedger};
