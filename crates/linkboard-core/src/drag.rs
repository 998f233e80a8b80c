//! Pointer-drag state machine for moving widgets.
//!
//! `Idle -> Dragging` on pointer-down over a widget's drag handle while the
//! controller is armed. Each pointer-move computes the new position from the
//! pointer delta, writes it to the registry and records it as a pending
//! change. Pointer-up, anywhere, ends the session at the last computed
//! position.

use crate::link::{LinkId, LinkPatch};
use crate::listeners::{ListenerKind, ListenerSet, Subscription};
use crate::persistence::PersistenceSync;
use crate::registry::LinkRegistry;
use kurbo::Point;

/// Where on a widget the pointer went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The widget's designated drag handle.
    Handle,
    /// Anywhere else on the widget (embedded content, resize grip, ...).
    Body,
}

/// Drag controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging,
}

/// A drag that ended, with the position it settled at.
#[derive(Debug, Clone, PartialEq)]
pub struct DragEnd {
    pub link_id: LinkId,
    pub position: Point,
}

/// State of one drag, from pointer-down to pointer-up.
#[derive(Debug)]
struct DragSession {
    link_id: LinkId,
    origin_pointer: Point,
    origin_position: Point,
    /// Last position written to the registry.
    position: Point,
    /// Document-wide move/up listeners, held for the session's lifetime.
    _listeners: [Subscription; 2],
}

impl DragSession {
    fn position_for(&self, pointer: Point) -> Point {
        let delta = pointer - self.origin_pointer;
        Point::new(
            (self.origin_position.x + delta.x).max(0.0),
            (self.origin_position.y + delta.y).max(0.0),
        )
    }

    fn end(self) -> DragEnd {
        DragEnd {
            link_id: self.link_id,
            position: self.position,
        }
    }
}

/// Turns pointer input on drag handles into committed widget positions.
#[derive(Debug)]
pub struct DragController {
    listeners: ListenerSet,
    /// Handle listener, present while armed.
    handles: Option<Subscription>,
    session: Option<DragSession>,
}

impl DragController {
    pub fn new(listeners: ListenerSet) -> Self {
        Self {
            listeners,
            handles: None,
            session: None,
        }
    }

    /// Start listening for pointer-down on drag handles.
    pub fn arm(&mut self) {
        if self.handles.is_none() {
            self.handles = Some(self.listeners.subscribe(ListenerKind::HandlePointerDown));
        }
    }

    /// Stop listening. An active drag ends where it is, without rollback.
    pub fn disarm(&mut self) -> Option<DragEnd> {
        self.handles = None;
        let ended = self.session.take().map(DragSession::end);
        if let Some(end) = &ended {
            log::debug!("Drag of {} aborted at ({}, {})", end.link_id, end.position.x, end.position.y);
        }
        ended
    }

    pub fn is_armed(&self) -> bool {
        self.handles.is_some()
    }

    pub fn state(&self) -> DragState {
        if self.session.is_some() {
            DragState::Dragging
        } else {
            DragState::Idle
        }
    }

    /// Link being dragged, if any.
    pub fn dragging(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.link_id.as_str())
    }

    /// Pointer went down on a widget. Returns `true` if a drag started.
    pub fn pointer_down(
        &mut self,
        link_id: &str,
        target: PointerTarget,
        pointer: Point,
        registry: &LinkRegistry,
    ) -> bool {
        if !self.is_armed() || target != PointerTarget::Handle || self.session.is_some() {
            return false;
        }
        let Some(link) = registry.get(link_id) else {
            return false;
        };

        let origin_position = link.position();
        self.session = Some(DragSession {
            link_id: link_id.to_string(),
            origin_pointer: pointer,
            origin_position,
            position: origin_position,
            _listeners: [
                self.listeners.subscribe(ListenerKind::PointerMove),
                self.listeners.subscribe(ListenerKind::PointerUp),
            ],
        });
        log::debug!("Drag of {link_id} started");
        true
    }

    /// Pointer moved. Returns the widget's new position while dragging.
    pub fn pointer_move(
        &mut self,
        pointer: Point,
        registry: &mut LinkRegistry,
        sync: &mut PersistenceSync,
    ) -> Option<Point> {
        let session = self.session.as_mut()?;
        let position = session.position_for(pointer);
        let patch = LinkPatch::position(position.x, position.y);

        // The link may have been removed mid-drag.
        if registry.apply_patch(&session.link_id, &patch).is_none() {
            self.session = None;
            return None;
        }
        sync.record_change(&session.link_id, patch);
        session.position = position;
        Some(position)
    }

    /// Pointer released anywhere. Ends the drag at its last position.
    pub fn pointer_up(&mut self) -> Option<DragEnd> {
        let ended = self.session.take().map(DragSession::end);
        if let Some(end) = &ended {
            log::debug!("Drag of {} ended at ({}, {})", end.link_id, end.position.x, end.position.y);
        }
        ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Link;

    struct Fixture {
        listeners: ListenerSet,
        drag: DragController,
        registry: LinkRegistry,
        sync: PersistenceSync,
    }

    fn fixture(x: f64, y: f64) -> Fixture {
        let listeners = ListenerSet::new();
        let mut drag = DragController::new(listeners.clone());
        drag.arm();
        let mut registry = LinkRegistry::new();
        registry.insert(Link::new("a", "board", "https://example.com").with_geometry(x, y, 300.0, 200.0));
        registry.insert(Link::new("b", "board", "https://example.org"));
        Fixture {
            listeners,
            drag,
            registry,
            sync: PersistenceSync::new(),
        }
    }

    #[test]
    fn test_drag_moves_by_pointer_delta() {
        let mut f = fixture(100.0, 100.0);
        assert!(f.drag.pointer_down("a", PointerTarget::Handle, Point::new(500.0, 500.0), &f.registry));
        assert_eq!(f.drag.state(), DragState::Dragging);

        let pos = f.drag.pointer_move(Point::new(550.0, 530.0), &mut f.registry, &mut f.sync);
        assert_eq!(pos, Some(Point::new(150.0, 130.0)));
        assert_eq!(f.registry.get("a").unwrap().position(), Point::new(150.0, 130.0));
        assert_eq!(f.sync.pending("a").unwrap().fields, LinkPatch::position(150.0, 130.0));
    }

    #[test]
    fn test_drag_clamps_at_origin() {
        let mut f = fixture(0.0, 0.0);
        f.drag.pointer_down("a", PointerTarget::Handle, Point::new(60.0, 60.0), &f.registry);
        let pos = f.drag.pointer_move(Point::new(10.0, 10.0), &mut f.registry, &mut f.sync);
        assert_eq!(pos, Some(Point::ZERO));
    }

    #[test]
    fn test_pointer_up_finalizes_last_position() {
        let mut f = fixture(10.0, 10.0);
        f.drag.pointer_down("a", PointerTarget::Handle, Point::ZERO, &f.registry);
        f.drag.pointer_move(Point::new(5.0, 5.0), &mut f.registry, &mut f.sync);
        f.drag.pointer_move(Point::new(20.0, 30.0), &mut f.registry, &mut f.sync);

        let end = f.drag.pointer_up().unwrap();
        assert_eq!(end, DragEnd {
            link_id: "a".to_string(),
            position: Point::new(30.0, 40.0),
        });
        assert_eq!(f.drag.state(), DragState::Idle);

        // Moves after pointer-up are ignored.
        assert!(f.drag.pointer_move(Point::new(500.0, 500.0), &mut f.registry, &mut f.sync).is_none());
        assert_eq!(f.registry.get("a").unwrap().position(), Point::new(30.0, 40.0));
    }

    #[test]
    fn test_only_handle_starts_drag() {
        let mut f = fixture(0.0, 0.0);
        assert!(!f.drag.pointer_down("a", PointerTarget::Body, Point::ZERO, &f.registry));
        assert!(!f.drag.pointer_down("missing", PointerTarget::Handle, Point::ZERO, &f.registry));
        assert_eq!(f.drag.state(), DragState::Idle);
    }

    #[test]
    fn test_unarmed_controller_ignores_pointer_down() {
        let mut f = fixture(0.0, 0.0);
        f.drag.disarm();
        assert!(!f.drag.pointer_down("a", PointerTarget::Handle, Point::ZERO, &f.registry));
    }

    #[test]
    fn test_second_pointer_down_ignored_while_dragging() {
        let mut f = fixture(0.0, 0.0);
        assert!(f.drag.pointer_down("a", PointerTarget::Handle, Point::ZERO, &f.registry));
        assert!(!f.drag.pointer_down("b", PointerTarget::Handle, Point::ZERO, &f.registry));
        assert_eq!(f.drag.dragging(), Some("a"));
    }

    #[test]
    fn test_disarm_ends_drag_without_rollback() {
        let mut f = fixture(0.0, 0.0);
        f.drag.pointer_down("a", PointerTarget::Handle, Point::ZERO, &f.registry);
        f.drag.pointer_move(Point::new(40.0, 40.0), &mut f.registry, &mut f.sync);

        let end = f.drag.disarm().unwrap();
        assert_eq!(end.position, Point::new(40.0, 40.0));
        assert_eq!(f.registry.get("a").unwrap().position(), Point::new(40.0, 40.0));
        assert_eq!(f.listeners.active(), 0);
    }

    #[test]
    fn test_session_listeners_released_on_pointer_up() {
        let mut f = fixture(0.0, 0.0);
        assert_eq!(f.listeners.active(), 1);

        f.drag.pointer_down("a", PointerTarget::Handle, Point::ZERO, &f.registry);
        assert_eq!(f.listeners.count(ListenerKind::PointerMove), 1);
        assert_eq!(f.listeners.count(ListenerKind::PointerUp), 1);

        f.drag.pointer_up();
        assert_eq!(f.listeners.active(), 1);
        assert_eq!(f.listeners.count(ListenerKind::HandlePointerDown), 1);
    }

    #[test]
    fn test_link_removed_mid_drag_ends_session() {
        let mut f = fixture(0.0, 0.0);
        f.drag.pointer_down("a", PointerTarget::Handle, Point::ZERO, &f.registry);
        f.registry.remove("a");

        assert!(f.drag.pointer_move(Point::new(5.0, 5.0), &mut f.registry, &mut f.sync).is_none());
        assert_eq!(f.drag.state(), DragState::Idle);
        assert!(!f.sync.has_pending());
    }
}
