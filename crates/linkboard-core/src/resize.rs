//! Debounced widget size observation.
//!
//! Size changes are buffered per widget. Once a widget has been quiet for the
//! debounce window, one [`DimensionsChanged`] carrying its latest size is
//! emitted. Widgets are debounced independently of each other.

use crate::link::LinkId;
use crate::listeners::{ListenerKind, ListenerSet, Subscription};
use kurbo::Size;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Settled size of a widget, rounded to whole units.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionsChanged {
    pub link_id: LinkId,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy)]
struct BufferedResize {
    size: Size,
    last_event: Instant,
}

/// Watches widget containers and reports settled sizes.
#[derive(Debug)]
pub struct ResizeWatcher {
    listeners: ListenerSet,
    observer: Option<Subscription>,
    window: Duration,
    buffered: HashMap<LinkId, BufferedResize>,
}

impl ResizeWatcher {
    pub fn new(listeners: ListenerSet, window: Duration) -> Self {
        Self {
            listeners,
            observer: None,
            window,
            buffered: HashMap::new(),
        }
    }

    /// Start observing widget containers.
    pub fn connect(&mut self) {
        if self.observer.is_none() {
            self.observer = Some(self.listeners.subscribe(ListenerKind::ResizeObserver));
        }
    }

    /// Stop observing and drop every buffered change.
    pub fn disconnect(&mut self) {
        self.observer = None;
        if !self.buffered.is_empty() {
            log::debug!("Dropping {} buffered resize events", self.buffered.len());
            self.buffered.clear();
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observer.is_some()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a rendered size for a widget.
    ///
    /// Returns `false` when the event was dropped: the watcher is disconnected
    /// or a dimension is not positive.
    pub fn observe(&mut self, link_id: &str, size: Size, now: Instant) -> bool {
        if !self.is_observing() {
            return false;
        }
        if !is_positive(size.width) || !is_positive(size.height) {
            log::debug!("Discarding resize of {link_id} to {}x{}", size.width, size.height);
            return false;
        }
        self.buffered.insert(
            link_id.to_string(),
            BufferedResize {
                size,
                last_event: now,
            },
        );
        true
    }

    /// Emit every widget whose quiet period has elapsed at `now`.
    ///
    /// Results are ordered by the time of each widget's last event.
    pub fn poll(&mut self, now: Instant) -> Vec<DimensionsChanged> {
        let window = self.window;
        self.take(|buffered| now.saturating_duration_since(buffered.last_event) >= window)
    }

    /// Emit every buffered widget immediately, quiet period or not.
    pub fn settle_all(&mut self) -> Vec<DimensionsChanged> {
        self.take(|_| true)
    }

    fn take(&mut self, due: impl Fn(&BufferedResize) -> bool) -> Vec<DimensionsChanged> {
        let mut ready: Vec<(LinkId, BufferedResize)> = Vec::new();
        self.buffered.retain(|id, buffered| {
            if due(buffered) {
                ready.push((id.clone(), *buffered));
                false
            } else {
                true
            }
        });
        ready.sort_by(|a, b| a.1.last_event.cmp(&b.1.last_event).then_with(|| a.0.cmp(&b.0)));

        ready
            .into_iter()
            .filter_map(|(link_id, buffered)| {
                let width = buffered.size.width.round();
                let height = buffered.size.height.round();
                if width <= 0.0 || height <= 0.0 {
                    log::debug!("Discarding settled size of {link_id}: rounds to {width}x{height}");
                    return None;
                }
                Some(DimensionsChanged {
                    link_id,
                    width,
                    height,
                })
            })
            .collect()
    }

    /// When the next buffered widget becomes due, if any.
    ///
    /// A widget whose deadline is not representable as an [`Instant`] is
    /// never due and is left out.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.buffered
            .values()
            .filter_map(|b| b.last_event.checked_add(self.window))
            .min()
    }

    /// Number of widgets with a buffered change.
    pub fn pending(&self) -> usize {
        self.buffered.len()
    }

    /// Forget any buffered change for a widget.
    pub fn forget(&mut self, link_id: &str) {
        self.buffered.remove(link_id);
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
