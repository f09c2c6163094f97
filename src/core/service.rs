//! Purpose: Orchestrate the flash/sticky lifecycle for one processing cycle.
//! Exports: `NotificationService`, `RenderedMessage`, `SUPPRESS_ACK`.
//! Role: One instance per request cycle; the store is an injected capability.
//! Invariants: Construction loads sticky and suppression state exactly once.
//! Invariants: `render` is idempotent and mutates nothing.
//! Invariants: Sticky slots always render before runtime slots.
use serde::Serialize;

use crate::core::blob::BlobStore;
use crate::core::error::{Error, ErrorKind};
use crate::core::message::{Kind, MessageSlot};
use crate::core::queue::RuntimeQueue;
use crate::core::sticky::StickyRegistry;
use crate::core::suppress::{Collection, SuppressionLedger};

/// Confirmation notice queued into the current cycle after a suppression.
pub const SUPPRESS_ACK: &str = "Gone forever!";

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RenderedMessage {
    pub id: u64,
    pub text: String,
    pub kind: Kind,
    pub sticky: bool,
}

#[derive(Debug)]
pub struct NotificationService<S: BlobStore> {
    store: S,
    queue: RuntimeQueue,
    sticky: StickyRegistry,
    ledger: SuppressionLedger,
}

impl<S: BlobStore> NotificationService<S> {
    /// Load phase: fetch the shared sticky collection and the acting user's
    /// suppression record. Never fails; degraded loads start empty.
    pub fn new(store: S, user: impl Into<String>) -> Self {
        let sticky = StickyRegistry::load(&store);
        let ledger = SuppressionLedger::load(&store, user);
        Self {
            store,
            queue: RuntimeQueue::new(),
            sticky,
            ledger,
        }
    }

    /// Construct with an initial flash message already queued.
    pub fn with_flash(
        store: S,
        user: impl Into<String>,
        text: impl Into<String>,
        kind: Kind,
    ) -> Self {
        let mut service = Self::new(store, user);
        service.flash(text, kind);
        service
    }

    pub fn user(&self) -> &str {
        self.ledger.user()
    }

    pub fn sticky_slots(&self) -> &[MessageSlot] {
        self.sticky.slots()
    }

    pub fn runtime_slots(&self) -> &[MessageSlot] {
        self.queue.slots()
    }

    /// Queue a one-shot message for the current cycle.
    pub fn flash(&mut self, text: impl Into<String>, kind: Kind) -> MessageSlot {
        self.queue.push(text, kind).clone()
    }

    pub fn notice(&mut self, text: impl Into<String>) -> MessageSlot {
        self.flash(text, Kind::Notice)
    }

    pub fn error(&mut self, text: impl Into<String>) -> MessageSlot {
        self.flash(text, Kind::Error)
    }

    /// Add a persistent message shared by all users. Duplicate text is a
    /// no-op success returning the existing slot and `false`.
    pub fn sticky(
        &mut self,
        text: impl Into<String>,
        kind: Kind,
    ) -> Result<(MessageSlot, bool), Error> {
        self.sticky.add(&self.store, text, kind)
    }

    pub fn sticky_notice(&mut self, text: impl Into<String>) -> Result<(MessageSlot, bool), Error> {
        self.sticky(text, Kind::Notice)
    }

    pub fn sticky_error(&mut self, text: impl Into<String>) -> Result<(MessageSlot, bool), Error> {
        self.sticky(text, Kind::Error)
    }

    /// Remove one sticky message by exact text.
    pub fn clear_sticky_message(&mut self, text: &str) -> Result<bool, Error> {
        self.sticky.remove_by_text(&self.store, text)
    }

    /// Drop every sticky message and delete the persisted record.
    pub fn clear_sticky_messages(&mut self) -> Result<(), Error> {
        self.sticky.clear_all(&self.store)
    }

    /// Hide a slot for the acting user. Returns `Ok(false)` when the id names
    /// no live slot; nothing is recorded and no ack is queued.
    pub fn suppress(&mut self, collection: Collection, id: u64) -> Result<bool, Error> {
        let slot = match collection {
            Collection::Sticky => self.sticky.slot_by_id(id).cloned(),
            Collection::Runtime => self.queue.slots().iter().find(|s| s.id == id).cloned(),
        };
        let Some(slot) = slot else {
            return Ok(false);
        };
        self.ledger.suppress(&self.store, collection, &slot)?;
        self.queue.notice(SUPPRESS_ACK);
        Ok(true)
    }

    /// Reset the acting user's suppression record.
    pub fn clear_suppressed(&mut self) -> Result<(), Error> {
        self.ledger.clear_all(&self.store)
    }

    /// Trigger boundary: apply a suppression request parameter naming a
    /// sticky slot id, before `render` is computed for this cycle.
    pub fn handle_suppress_request(&mut self, param: Option<&str>) -> Result<bool, Error> {
        let Some(raw) = param else {
            return Ok(false);
        };
        let id: u64 = raw.trim().parse().map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid sticky slot id: {raw:?}"))
                .with_source(err)
        })?;
        self.suppress(Collection::Sticky, id)
    }

    /// Final filtered output: unsuppressed sticky slots first, then
    /// unsuppressed runtime slots, each in insertion order.
    pub fn render(&self) -> Vec<RenderedMessage> {
        let mut out = Vec::new();
        for slot in self.sticky.slots() {
            if !self.ledger.is_suppressed(Collection::Sticky, slot.id) {
                out.push(rendered(slot, true));
            }
        }
        for slot in self.queue.slots() {
            if !self.ledger.is_suppressed(Collection::Runtime, slot.id) {
                out.push(rendered(slot, false));
            }
        }
        out
    }
}

fn rendered(slot: &MessageSlot, sticky: bool) -> RenderedMessage {
    RenderedMessage {
        id: slot.id,
        text: slot.message.text.clone(),
        kind: slot.message.kind,
        sticky,
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationService, SUPPRESS_ACK};
    use crate::core::blob::MemBlobStore;
    use crate::core::error::ErrorKind;
    use crate::core::message::Kind;
    use crate::core::suppress::Collection;

    fn service(store: &MemBlobStore, user: &str) -> NotificationService<MemBlobStore> {
        NotificationService::new(store.clone(), user)
    }

    #[test]
    fn render_is_empty_for_fresh_state() {
        let store = MemBlobStore::new();
        let svc = service(&store, "ops");
        assert!(svc.render().is_empty());
    }

    #[test]
    fn runtime_messages_render_in_insertion_order() {
        let store = MemBlobStore::new();
        let mut svc = service(&store, "ops");
        svc.notice("Saved");
        svc.error("Validation failed");

        let rendered = svc.render();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].text, "Saved");
        assert_eq!(rendered[0].kind, Kind::Notice);
        assert!(!rendered[0].sticky);
        assert_eq!(rendered[1].text, "Validation failed");
        assert_eq!(rendered[1].kind, Kind::Error);
    }

    #[test]
    fn sticky_renders_before_runtime() {
        let store = MemBlobStore::new();
        let mut svc = service(&store, "ops");
        svc.notice("runtime first in code");
        svc.sticky("sticky still leads", Kind::Notice).expect("sticky");

        let rendered = svc.render();
        assert!(rendered[0].sticky);
        assert_eq!(rendered[0].text, "sticky still leads");
        assert!(!rendered[1].sticky);
    }

    #[test]
    fn render_does_not_mutate() {
        let store = MemBlobStore::new();
        let mut svc = service(&store, "ops");
        svc.notice("once");
        assert_eq!(svc.render(), svc.render());
    }

    #[test]
    fn suppression_hides_for_one_user_only() {
        let store = MemBlobStore::new();
        let mut svc = service(&store, "alice");
        let (slot, _) = svc.sticky("Low stock", Kind::Notice).expect("sticky");

        assert!(svc.suppress(Collection::Sticky, slot.id).expect("suppress"));
        let rendered = svc.render();
        assert!(rendered.iter().all(|m| !m.sticky));
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].text, SUPPRESS_ACK);

        let other = service(&store, "bob");
        let rendered = other.render();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].text, "Low stock");
        assert!(rendered[0].sticky);
    }

    #[test]
    fn duplicate_sticky_then_suppress_scenario() {
        let store = MemBlobStore::new();
        let mut svc = service(&store, "ops");
        svc.sticky("Low stock", Kind::Notice).expect("sticky");
        let (slot, created) = svc.sticky("Low stock", Kind::Notice).expect("sticky again");
        assert!(!created);
        assert_eq!(svc.sticky_slots().len(), 1);

        assert!(svc.suppress(Collection::Sticky, slot.id).expect("suppress"));
        let rendered = svc.render();
        assert_eq!(rendered.len(), 1);
        assert!(!rendered[0].sticky);
        assert_eq!(rendered[0].text, SUPPRESS_ACK);
        assert_eq!(rendered[0].kind, Kind::Notice);
    }

    #[test]
    fn suppressing_a_dead_id_is_a_quiet_no_op() {
        let store = MemBlobStore::new();
        let mut svc = service(&store, "ops");
        assert!(!svc.suppress(Collection::Sticky, 999).expect("suppress"));
        assert!(svc.render().is_empty());
    }

    #[test]
    fn suppression_survives_remove_and_readd() {
        let store = MemBlobStore::new();
        let mut svc = service(&store, "ops");
        let (slot, _) = svc.sticky("Low stock", Kind::Notice).expect("sticky");
        svc.suppress(Collection::Sticky, slot.id).expect("suppress");
        svc.clear_sticky_message("Low stock").expect("remove");
        svc.sticky("Low stock", Kind::Notice).expect("re-add");

        let rendered = svc.render();
        assert!(rendered.iter().all(|m| !m.sticky));
    }

    #[test]
    fn runtime_suppression_applies_by_ordinal() {
        let store = MemBlobStore::new();
        let mut svc = service(&store, "ops");
        svc.notice("first");
        svc.notice("second");
        assert!(svc.suppress(Collection::Runtime, 0).expect("suppress"));

        let texts: Vec<_> = svc.render().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["second".to_string(), SUPPRESS_ACK.to_string()]);
    }

    #[test]
    fn suppress_request_parsing() {
        let store = MemBlobStore::new();
        let mut svc = service(&store, "ops");
        let (slot, _) = svc.sticky("Disk almost full", Kind::Error).expect("sticky");

        assert!(!svc.handle_suppress_request(None).expect("absent param"));
        let err = svc
            .handle_suppress_request(Some("borked"))
            .expect_err("junk param");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(
            svc.handle_suppress_request(Some(&slot.id.to_string()))
                .expect("valid param")
        );
        assert!(svc.render().iter().all(|m| !m.sticky));
    }

    #[test]
    fn with_flash_queues_initial_message() {
        let store = MemBlobStore::new();
        let svc =
            NotificationService::with_flash(store, "ops", "Imported 12 records", Kind::Notice);
        let rendered = svc.render();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].text, "Imported 12 records");
    }

    #[test]
    fn clear_suppressed_restores_visibility() {
        let store = MemBlobStore::new();
        let mut svc = service(&store, "ops");
        let (slot, _) = svc.sticky("Come back", Kind::Notice).expect("sticky");
        svc.suppress(Collection::Sticky, slot.id).expect("suppress");
        svc.clear_suppressed().expect("clear");

        let rendered = svc.render();
        assert!(rendered.iter().any(|m| m.sticky && m.text == "Come back"));
    }
}
