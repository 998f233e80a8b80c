//! Coalescing of local geometry edits into serialized remote writes.
//!
//! Local edits are recorded as [`PendingChange`]s, merged per link until they
//! are flushed. At most one write per link is ever in flight: flushing a link
//! that is already being written only updates its pending entry, and the
//! merged state is picked up by the follow-up write returned when the
//! in-flight one completes.
//!
//! This type never performs I/O. `flush*` hand out [`WriteRequest`]s and the
//! caller reports each outcome back through [`PersistenceSync::complete`].

pub use crate::api::GeometryWrite;
use crate::error::{ApiResult, BoardError};
use crate::link::{LinkId, LinkPatch, LinkRecord};
use crate::registry::LinkRegistry;
use std::collections::HashMap;
use std::time::Instant;

/// A local mutation not yet confirmed by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub link_id: LinkId,
    pub fields: LinkPatch,
    pub created_at: Instant,
}

/// Which endpoint family a flush should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Position-only or dimensions-only endpoint when only one kind of field is pending.
    Narrow,
    /// Always the combined position-and-dimensions endpoint.
    Combined,
}

/// A write handed to the caller for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub link_id: LinkId,
    pub write: GeometryWrite,
    /// Pending fields captured when the write was issued.
    pub fields: LinkPatch,
}

/// Outcome of flushing one or more links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Links whose writes were acknowledged.
    pub written: Vec<LinkId>,
    /// Links whose writes failed. Their pending changes are kept.
    pub failed: Vec<(LinkId, BoardError)>,
}

impl FlushReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: FlushReport) {
        self.written.extend(other.written);
        self.failed.extend(other.failed);
    }
}

/// Per-link pending changes plus in-flight bookkeeping.
#[derive(Debug, Default)]
pub struct PersistenceSync {
    pending: HashMap<LinkId, PendingChange>,
    /// Snapshot of the pending fields sent by each in-flight write.
    in_flight: HashMap<LinkId, LinkPatch>,
}

impl PersistenceSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a local edit into the link's pending change.
    ///
    /// Positions are clamped and non-positive sizes dropped first. Returns
    /// `false` if nothing was left to record.
    pub fn record_change(&mut self, link_id: &str, fields: LinkPatch) -> bool {
        let fields = fields.sanitized();
        if fields.is_empty() {
            log::debug!("Ignoring empty change for {link_id}");
            return false;
        }
        self.pending
            .entry(link_id.to_string())
            .and_modify(|change| change.fields.merge(&fields))
            .or_insert_with(|| PendingChange {
                link_id: link_id.to_string(),
                fields,
                created_at: Instant::now(),
            });
        true
    }

    pub fn pending(&self, link_id: &str) -> Option<&PendingChange> {
        self.pending.get(link_id)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Links with a pending change, sorted for deterministic flushing.
    pub fn pending_ids(&self) -> Vec<LinkId> {
        let mut ids: Vec<_> = self.pending.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_in_flight(&self, link_id: &str) -> bool {
        self.in_flight.contains_key(link_id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Take back a write that will not be sent. Its pending change is kept.
    pub fn cancel(&mut self, request: &WriteRequest) {
        self.in_flight.remove(&request.link_id);
    }

    /// Drop everything known about a link (e.g. after it was deleted).
    pub fn discard(&mut self, link_id: &str) {
        self.pending.remove(link_id);
        self.in_flight.remove(link_id);
    }

    /// Issue a write for one link.
    ///
    /// Returns `None` when there is nothing pending, a write for the link is
    /// already in flight, the link has no server id yet, or it is not in the
    /// registry.
    pub fn flush(
        &mut self,
        link_id: &str,
        registry: &LinkRegistry,
        mode: FlushMode,
    ) -> Option<WriteRequest> {
        if self.in_flight.contains_key(link_id) {
            log::debug!("Write for {link_id} already in flight; deferring");
            return None;
        }
        if link_id.is_empty() {
            return None;
        }
        let fields = self.pending.get(link_id)?.fields;
        let Some(link) = registry.get(link_id) else {
            log::debug!("Dropping pending change for unknown link {link_id}");
            self.pending.remove(link_id);
            return None;
        };

        let x = fields.x.unwrap_or(link.x).round() as i64;
        let y = fields.y.unwrap_or(link.y).round() as i64;
        let width = fields.width.unwrap_or(link.width).round() as i64;
        let height = fields.height.unwrap_or(link.height).round() as i64;

        let write = match mode {
            FlushMode::Narrow if !fields.has_dimensions() => GeometryWrite::Position { x, y },
            FlushMode::Narrow if !fields.has_position() => GeometryWrite::Dimensions { width, height },
            _ => GeometryWrite::PositionDimensions { x, y, width, height },
        };

        self.in_flight.insert(link_id.to_string(), fields);
        Some(WriteRequest {
            link_id: link_id.to_string(),
            write,
            fields,
        })
    }

    /// Issue one combined write per link with a pending change that is not
    /// already in flight.
    pub fn flush_all(&mut self, registry: &LinkRegistry) -> Vec<WriteRequest> {
        self.pending_ids()
            .into_iter()
            .filter_map(|id| self.flush(&id, registry, FlushMode::Combined))
            .collect()
    }

    /// Apply the outcome of a write issued by `flush`.
    ///
    /// On success the acknowledged fields are cleared (unless they changed
    /// again while the write was in flight), the registry takes the server's
    /// values for every field that is no longer pending, and a follow-up
    /// write is returned if anything is still pending.
    ///
    /// On failure the pending change is kept as is and the registry keeps the
    /// optimistic values. No follow-up is issued.
    pub fn complete(
        &mut self,
        request: &WriteRequest,
        result: ApiResult<LinkRecord>,
        registry: &mut LinkRegistry,
    ) -> Result<Option<WriteRequest>, BoardError> {
        let link_id = request.link_id.as_str();
        let Some(sent) = self.in_flight.remove(link_id) else {
            log::debug!("Ignoring completion for {link_id}: no write in flight");
            return Ok(None);
        };

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Write for {link_id} failed: {e}; keeping pending change");
                return Err(BoardError::from(e));
            }
        };

        let still_pending = match self.pending.get_mut(link_id) {
            Some(change) => {
                change.fields.clear_acknowledged(&sent);
                change.fields
            }
            None => LinkPatch::default(),
        };
        if still_pending.is_empty() {
            self.pending.remove(link_id);
        }

        let confirmed = record.geometry().without(&still_pending);
        registry.apply_patch(link_id, &confirmed);

        if still_pending.is_empty() {
            return Ok(None);
        }
        log::debug!("{link_id} changed while in flight; issuing follow-up write");
        Ok(self.flush(link_id, registry, FlushMode::Narrow))
    }
}
