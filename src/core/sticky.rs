//! Purpose: Persisted sticky-message collection shared by every operator.
//! Exports: `StickyRegistry`, `STICKY_TTL`.
//! Role: Deduplicated append-only store; every mutation writes through.
//! Invariants: No two slots share a text; slot ids are content-derived and stable.
//! Invariants: Load failures degrade to empty; save failures leave memory ahead of disk.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::blob::{BlobStore, STICKY_KEY};
use crate::core::error::Error;
use crate::core::message::{Kind, Message, MessageSlot, sticky_slot_id};

/// One year, matching the original transient lifetime. Refreshed on each save.
pub const STICKY_TTL: Duration = Duration::from_secs(31_536_000);

#[derive(Debug, Default, Serialize, Deserialize)]
struct StickyState {
    slots: Vec<MessageSlot>,
}

#[derive(Debug, Default)]
pub struct StickyRegistry {
    state: StickyState,
}

impl StickyRegistry {
    /// Load the shared collection. Absent, expired, corrupt, or unreadable
    /// state all degrade to an empty collection.
    pub fn load(store: &dyn BlobStore) -> Self {
        let state = match store.get_shared(STICKY_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(state) => state,
                Err(err) => {
                    tracing::warn!(key = STICKY_KEY, error = %err, "sticky state corrupt, starting empty");
                    StickyState::default()
                }
            },
            Ok(None) => StickyState::default(),
            Err(err) => {
                tracing::warn!(key = STICKY_KEY, error = %err, "sticky state unreadable, starting empty");
                StickyState::default()
            }
        };
        Self { state }
    }

    pub fn slots(&self) -> &[MessageSlot] {
        &self.state.slots
    }

    pub fn len(&self) -> usize {
        self.state.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.slots.is_empty()
    }

    pub fn slot_by_id(&self, id: u64) -> Option<&MessageSlot> {
        self.state.slots.iter().find(|slot| slot.id == id)
    }

    /// Append-if-absent by exact text. Returns the slot plus whether a new
    /// entry was created; duplicates are a no-op success with no write.
    pub fn add(
        &mut self,
        store: &dyn BlobStore,
        text: impl Into<String>,
        kind: Kind,
    ) -> Result<(MessageSlot, bool), Error> {
        let text = text.into();
        if let Some(existing) = self.state.slots.iter().find(|slot| slot.message.text == text) {
            return Ok((existing.clone(), false));
        }

        let slot = MessageSlot {
            id: sticky_slot_id(&text),
            message: Message::new(text, kind),
        };
        self.state.slots.push(slot.clone());
        self.save(store)?;
        Ok((slot, true))
    }

    pub fn notice(
        &mut self,
        store: &dyn BlobStore,
        text: impl Into<String>,
    ) -> Result<(MessageSlot, bool), Error> {
        self.add(store, text, Kind::Notice)
    }

    pub fn error(
        &mut self,
        store: &dyn BlobStore,
        text: impl Into<String>,
    ) -> Result<(MessageSlot, bool), Error> {
        self.add(store, text, Kind::Error)
    }

    /// Remove the first slot with an exactly matching text. Surviving slots
    /// keep their ids.
    pub fn remove_by_text(&mut self, store: &dyn BlobStore, text: &str) -> Result<bool, Error> {
        let Some(pos) = self
            .state
            .slots
            .iter()
            .position(|slot| slot.message.text == text)
        else {
            return Ok(false);
        };
        self.state.slots.remove(pos);
        self.save(store)?;
        Ok(true)
    }

    /// Empty the collection and delete the persisted record outright.
    pub fn clear_all(&mut self, store: &dyn BlobStore) -> Result<(), Error> {
        self.state.slots.clear();
        store.delete_shared(STICKY_KEY)
    }

    fn save(&self, store: &dyn BlobStore) -> Result<(), Error> {
        let bytes = serde_json::to_vec(&self.state).map_err(|err| {
            Error::new(crate::core::error::ErrorKind::Internal)
                .with_message("failed to encode sticky state")
                .with_source(err)
        })?;
        store
            .set_shared(STICKY_KEY, &bytes, Some(STICKY_TTL))
            .map_err(|err| err.with_key(STICKY_KEY))
    }
}
