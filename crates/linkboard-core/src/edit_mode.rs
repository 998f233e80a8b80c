//! Global edit mode gate.
//!
//! Edit mode is off by default. Entering it arms dragging and resize
//! observation. Leaving it disarms both, settles any buffered resize and
//! issues the batch flush of every pending change.

use crate::drag::{DragController, DragEnd};
use crate::link::LinkPatch;
use crate::persistence::{PersistenceSync, WriteRequest};
use crate::registry::LinkRegistry;
use crate::resize::ResizeWatcher;

/// What leaving edit mode produced.
#[derive(Debug, Default)]
pub struct EditModeExit {
    /// Drag that was still active and ended at its last position.
    pub aborted_drag: Option<DragEnd>,
    /// One combined write per link with a pending change.
    pub writes: Vec<WriteRequest>,
}

/// Holds the edit mode flag and drives the components it gates.
#[derive(Debug, Default)]
pub struct EditModeController {
    active: bool,
}

impl EditModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enter edit mode. Returns `false` if it was already active.
    pub fn enter(&mut self, drag: &mut DragController, resize: &mut ResizeWatcher) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        drag.arm();
        resize.connect();
        log::info!("Edit mode on");
        true
    }

    /// Turn edit mode off without flushing, for board teardown.
    pub fn abandon(&mut self) {
        self.active = false;
    }

    /// Leave edit mode and batch-flush everything pending.
    ///
    /// Returns `None` if edit mode was not active.
    pub fn exit(
        &mut self,
        drag: &mut DragController,
        resize: &mut ResizeWatcher,
        sync: &mut PersistenceSync,
        registry: &mut LinkRegistry,
    ) -> Option<EditModeExit> {
        if !self.active {
            return None;
        }
        self.active = false;
        let aborted_drag = drag.disarm();
        for change in resize.settle_all() {
            let patch = LinkPatch::dimensions(change.width, change.height);
            if registry.apply_patch(&change.link_id, &patch).is_some() {
                sync.record_change(&change.link_id, patch);
            }
        }
        resize.disconnect();
        let writes = sync.flush_all(registry);
        log::info!("Edit mode off; flushing {} links", writes.len());
        Some(EditModeExit {
            aborted_drag,
            writes,
        })
    }
}
