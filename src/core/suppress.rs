//! Purpose: Per-user record of suppressed message slots.
//! Exports: `Collection`, `SuppressionLedger`.
//! Role: Keyed by user identity; never shared or aggregated across users.
//! Invariants: Entries are weak references by slot id; orphans are tolerated, never dereferenced.
//! Invariants: Absence collapses to an empty persisted record on first touch.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::blob::{BlobStore, SUPPRESSED_KEY};
use crate::core::error::{Error, ErrorKind};
use crate::core::message::{Message, MessageSlot};

/// Which collection a suppression entry targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Collection {
    Sticky,
    Runtime,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SuppressionRecord {
    sticky: BTreeMap<u64, Message>,
    runtime: BTreeMap<u64, Message>,
}

#[derive(Debug)]
pub struct SuppressionLedger {
    user: String,
    record: SuppressionRecord,
}

impl SuppressionLedger {
    /// Fetch the record for `user`, creating and persisting an empty one when
    /// absent or unreadable. A failed initial persist is logged, not fatal.
    pub fn load(store: &dyn BlobStore, user: impl Into<String>) -> Self {
        let user = user.into();
        let record = match store.get_user(&user, SUPPRESSED_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(user = %user, error = %err, "suppression record corrupt, resetting");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(user = %user, error = %err, "suppression record unreadable, resetting");
                None
            }
        };

        match record {
            Some(record) => Self { user, record },
            None => {
                let ledger = Self {
                    user,
                    record: SuppressionRecord::default(),
                };
                if let Err(err) = ledger.save(store) {
                    tracing::warn!(user = %ledger.user, error = %err, "failed to persist fresh suppression record");
                }
                ledger
            }
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn is_suppressed(&self, collection: Collection, id: u64) -> bool {
        match collection {
            Collection::Sticky => self.record.sticky.contains_key(&id),
            Collection::Runtime => self.record.runtime.contains_key(&id),
        }
    }

    /// Record the slot as suppressed for this user and persist.
    pub fn suppress(
        &mut self,
        store: &dyn BlobStore,
        collection: Collection,
        slot: &MessageSlot,
    ) -> Result<(), Error> {
        let map = match collection {
            Collection::Sticky => &mut self.record.sticky,
            Collection::Runtime => &mut self.record.runtime,
        };
        map.insert(slot.id, slot.message.clone());
        self.save(store)
    }

    /// Reset both mappings; the user starts seeing everything again.
    pub fn clear_all(&mut self, store: &dyn BlobStore) -> Result<(), Error> {
        self.record.sticky.clear();
        self.record.runtime.clear();
        self.save(store)
    }

    fn save(&self, store: &dyn BlobStore) -> Result<(), Error> {
        let bytes = serde_json::to_vec(&self.record).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode suppression record")
                .with_source(err)
        })?;
        store
            .set_user(&self.user, SUPPRESSED_KEY, &bytes)
            .map_err(|err| err.with_user(&self.user).with_key(SUPPRESSED_KEY))
    }
}
