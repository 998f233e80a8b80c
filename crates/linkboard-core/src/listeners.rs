//! Scoped listener subscriptions.
//!
//! Pointer and resize listeners are represented by [`Subscription`] guards.
//! A guard stays registered in its [`ListenerSet`] until it is dropped, so a
//! controller that is disarmed or torn down cannot leave listeners behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// What a listener is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Pointer-down on widget drag handles.
    HandlePointerDown,
    /// Document-wide pointer-move while a drag is active.
    PointerMove,
    /// Document-wide pointer-up while a drag is active.
    PointerUp,
    /// Size observation of widget containers.
    ResizeObserver,
}

#[derive(Debug, Default)]
struct ListenerTable {
    next_id: u64,
    active: HashMap<u64, ListenerKind>,
}

/// Shared registry of live listeners for one board view.
#[derive(Debug, Clone, Default)]
pub struct ListenerSet {
    table: Arc<Mutex<ListenerTable>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ListenerTable> {
        // Listener bookkeeping stays consistent even if a holder panicked.
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a listener. It is released when the returned guard drops.
    pub fn subscribe(&self, kind: ListenerKind) -> Subscription {
        let mut table = self.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.active.insert(id, kind);
        log::trace!("Listener {id} attached ({kind:?})");
        Subscription {
            id,
            kind,
            set: self.clone(),
        }
    }

    /// Number of live listeners.
    pub fn active(&self) -> usize {
        self.lock().active.len()
    }

    /// Number of live listeners of one kind.
    pub fn count(&self, kind: ListenerKind) -> usize {
        self.lock().active.values().filter(|k| **k == kind).count()
    }

    fn release(&self, id: u64) {
        if let Some(kind) = self.lock().active.remove(&id) {
            log::trace!("Listener {id} detached ({kind:?})");
        }
    }
}

/// A live listener registration.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    kind: ListenerKind,
    set: ListenerSet,
}

impl Subscription {
    pub fn kind(&self) -> ListenerKind {
        self.kind
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.set.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_released_on_drop() {
        let set = ListenerSet::new();
        let move_sub = set.subscribe(ListenerKind::PointerMove);
        let up_sub = set.subscribe(ListenerKind::PointerUp);
        assert_eq!(set.active(), 2);
        assert_eq!(move_sub.kind(), ListenerKind::PointerMove);

        drop(move_sub);
        assert_eq!(set.active(), 1);
        assert_eq!(set.count(ListenerKind::PointerUp), 1);

        drop(up_sub);
        assert_eq!(set.active(), 0);
    }

    #[test]
    fn test_clones_share_table() {
        let set = ListenerSet::new();
        let other = set.clone();
        let _sub = other.subscribe(ListenerKind::ResizeObserver);
        assert_eq!(set.count(ListenerKind::ResizeObserver), 1);
    }
}
