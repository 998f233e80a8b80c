//! One open board: the link registry plus everything that edits and persists it.
//!
//! [`BoardSession`] wires the interaction controllers to the sync engine.
//! Input handling is synchronous: methods that end an edit hand back
//! [`OutgoingWrite`]s instead of awaiting the network, so the session stays
//! free to take pointer and resize input while writes are in flight. Each
//! sent write comes back as a [`WriteOutcome`] for [`BoardSession::complete`].
//!
//! [`drive_writes`] does that loop for a session shared through a `RefCell`,
//! borrowing it only while a completion is applied.

use crate::api::BoardApi;
use crate::config::BoardConfig;
use crate::drag::{DragController, DragEnd, DragState, PointerTarget};
use crate::edit_mode::EditModeController;
use crate::error::{ApiResult, BoardError, BoardResult};
use crate::identity::Identity;
use crate::link::{LinkId, LinkPatch, LinkRecord};
use crate::listeners::ListenerSet;
use crate::persistence::{FlushMode, FlushReport, PersistenceSync, WriteRequest};
use crate::registry::LinkRegistry;
use crate::resize::ResizeWatcher;
use futures_util::stream::{FuturesUnordered, StreamExt};
use kurbo::{Point, Size};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// A geometry write issued by a session and not yet sent.
pub struct OutgoingWrite {
    api: Arc<dyn BoardApi>,
    request: WriteRequest,
}

impl OutgoingWrite {
    pub fn request(&self) -> &WriteRequest {
        &self.request
    }

    pub fn link_id(&self) -> &str {
        &self.request.link_id
    }

    /// Send the write. The session is not involved until the outcome is
    /// handed back.
    pub async fn send(self) -> WriteOutcome {
        let result = self
            .api
            .write_geometry(&self.request.link_id, self.request.write)
            .await;
        WriteOutcome {
            request: self.request,
            result,
        }
    }
}

impl fmt::Debug for OutgoingWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingWrite")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// What the remote store answered to a sent write.
#[derive(Debug)]
pub struct WriteOutcome {
    pub request: WriteRequest,
    pub result: ApiResult<LinkRecord>,
}

/// A finished drag and the write persisting its final position.
///
/// `write` is `None` when a write for the link is already in flight; the
/// position then goes out with that write's follow-up.
#[derive(Debug)]
pub struct DragRelease {
    pub end: DragEnd,
    pub write: Option<OutgoingWrite>,
}

/// Client-side state of one board and its link widgets.
pub struct BoardSession {
    board_id: String,
    api: Arc<dyn BoardApi>,
    identity: Arc<dyn Identity>,
    listeners: ListenerSet,
    registry: LinkRegistry,
    sync: PersistenceSync,
    drag: DragController,
    resize: ResizeWatcher,
    edit_mode: EditModeController,
    /// Links whose last write failed.
    failed: HashSet<LinkId>,
    last_error: Option<String>,
}

impl BoardSession {
    pub fn new(
        board_id: impl Into<String>,
        api: Arc<dyn BoardApi>,
        identity: Arc<dyn Identity>,
        config: &BoardConfig,
    ) -> Self {
        let listeners = ListenerSet::new();
        Self {
            board_id: board_id.into(),
            api,
            identity,
            drag: DragController::new(listeners.clone()),
            resize: ResizeWatcher::new(listeners.clone(), config.debounce()),
            listeners,
            registry: LinkRegistry::new(),
            sync: PersistenceSync::new(),
            edit_mode: EditModeController::new(),
            failed: HashSet::new(),
            last_error: None,
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn registry(&self) -> &LinkRegistry {
        &self.registry
    }

    pub fn sync(&self) -> &PersistenceSync {
        &self.sync
    }

    /// Listeners currently attached on behalf of this board.
    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode.is_active()
    }

    pub fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    /// Message of the most recent failed save.
    ///
    /// Cleared once every link whose write failed has been saved.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Earliest instant at which [`BoardSession::tick`] has a resize to settle.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.resize.next_deadline()
    }

    fn require_user(&self) -> BoardResult<String> {
        self.identity
            .current_user_id()
            .ok_or(BoardError::NotAuthenticated)
    }

    fn outgoing(&self, request: WriteRequest) -> OutgoingWrite {
        OutgoingWrite {
            api: Arc::clone(&self.api),
            request,
        }
    }

    /// Fetch the board's links, replacing the registry contents.
    ///
    /// Local changes that are still pending stay applied on top of the
    /// fetched values.
    pub async fn load(&mut self) -> BoardResult<()> {
        self.require_user()?;
        let records = self.api.list_links(&self.board_id).await?;
        log::info!("Loaded {} links for board {}", records.len(), self.board_id);
        self.registry.load(records);
        for id in self.sync.pending_ids() {
            if let Some(change) = self.sync.pending(&id) {
                let fields = change.fields;
                self.registry.apply_patch(&id, &fields);
            }
        }
        Ok(())
    }

    /// Create a link on this board.
    ///
    /// Returns the new link's id, or `None` when the server did not report one
    /// and the board had to be re-fetched instead.
    pub async fn add_link(&mut self, url: &str) -> BoardResult<Option<LinkId>> {
        let url = validate_url(url)?;
        self.require_user()?;

        let record = self.api.create_link(&self.board_id, &url).await?;
        if record.id.is_empty() {
            log::debug!("Created link has no id; reloading board {}", self.board_id);
            self.load().await?;
            return Ok(None);
        }
        let id = record.id.clone();
        self.registry.add(record);
        Ok(Some(id))
    }

    /// Delete a link remotely, then forget it locally.
    pub async fn remove_link(&mut self, link_id: &str) -> BoardResult<()> {
        self.require_user()?;
        self.api.delete_link(link_id).await?;
        self.registry.remove(link_id);
        self.sync.discard(link_id);
        self.resize.forget(link_id);
        self.failed.remove(link_id);
        Ok(())
    }

    /// Turn edit mode on. Returns `false` if it already was.
    pub fn enter_edit_mode(&mut self) -> bool {
        self.edit_mode.enter(&mut self.drag, &mut self.resize)
    }

    /// Turn edit mode off and issue the batch flush of every pending change.
    ///
    /// Edit mode is left even when the flush cannot run. Without a signed-in
    /// user nothing is issued and every pending change is kept.
    pub fn exit_edit_mode(&mut self) -> BoardResult<Vec<OutgoingWrite>> {
        let Some(exit) = self.edit_mode.exit(
            &mut self.drag,
            &mut self.resize,
            &mut self.sync,
            &mut self.registry,
        ) else {
            return Ok(Vec::new());
        };
        if let Err(e) = self.require_user() {
            for request in &exit.writes {
                self.sync.cancel(request);
            }
            return Err(e);
        }
        Ok(exit.writes.into_iter().map(|r| self.outgoing(r)).collect())
    }

    pub fn pointer_down(&mut self, link_id: &str, target: PointerTarget, pointer: Point) -> bool {
        self.drag.pointer_down(link_id, target, pointer, &self.registry)
    }

    pub fn pointer_move(&mut self, pointer: Point) -> Option<Point> {
        self.drag
            .pointer_move(pointer, &mut self.registry, &mut self.sync)
    }

    /// End the current drag and issue the write persisting its position.
    pub fn pointer_up(&mut self) -> BoardResult<Option<DragRelease>> {
        let Some(end) = self.drag.pointer_up() else {
            return Ok(None);
        };
        let write = self.flush(&end.link_id)?;
        Ok(Some(DragRelease { end, write }))
    }

    /// Report a widget's rendered size.
    pub fn observe_size(&mut self, link_id: &str, size: Size, now: Instant) -> bool {
        self.resize.observe(link_id, size, now)
    }

    /// Settle every resize whose quiet period has elapsed and issue writes
    /// for them.
    pub fn tick(&mut self, now: Instant) -> BoardResult<Vec<OutgoingWrite>> {
        let mut changed = Vec::new();
        for change in self.resize.poll(now) {
            let patch = LinkPatch::dimensions(change.width, change.height);
            if self.registry.apply_patch(&change.link_id, &patch).is_some()
                && self.sync.record_change(&change.link_id, patch)
            {
                changed.push(change.link_id);
            }
        }
        if changed.is_empty() {
            return Ok(Vec::new());
        }

        self.require_user()?;
        let requests: Vec<WriteRequest> = changed
            .iter()
            .filter_map(|id| self.sync.flush(id, &self.registry, FlushMode::Narrow))
            .collect();
        Ok(requests.into_iter().map(|r| self.outgoing(r)).collect())
    }

    /// Issue a write for one link's pending change.
    ///
    /// `None` if the link has nothing pending or a write for it is already
    /// in flight.
    pub fn flush(&mut self, link_id: &str) -> BoardResult<Option<OutgoingWrite>> {
        self.require_user()?;
        Ok(self
            .sync
            .flush(link_id, &self.registry, FlushMode::Narrow)
            .map(|r| self.outgoing(r)))
    }

    /// Issue one combined write per link with a pending change.
    pub fn flush_all(&mut self) -> BoardResult<Vec<OutgoingWrite>> {
        self.require_user()?;
        let requests = self.sync.flush_all(&self.registry);
        Ok(requests.into_iter().map(|r| self.outgoing(r)).collect())
    }

    /// Apply the outcome of a sent write.
    ///
    /// Returns the follow-up write when the link changed again while the
    /// write was in flight. A failure keeps the change pending and records
    /// a message for [`BoardSession::last_error`].
    pub fn complete(&mut self, outcome: WriteOutcome) -> BoardResult<Option<OutgoingWrite>> {
        let link_id = outcome.request.link_id.clone();
        match self
            .sync
            .complete(&outcome.request, outcome.result, &mut self.registry)
        {
            Ok(follow_up) => {
                if self.failed.remove(&link_id) && self.failed.is_empty() {
                    self.last_error = None;
                }
                Ok(follow_up.map(|r| self.outgoing(r)))
            }
            Err(e) => {
                self.last_error = Some(format!("Failed to save link {}: {}", link_id, e));
                self.failed.insert(link_id);
                Err(e)
            }
        }
    }

    /// Leave the board: detach every listener and stop observing.
    ///
    /// Pending changes are kept but nothing more is issued.
    pub fn teardown(&mut self) {
        self.edit_mode.abandon();
        self.drag.disarm();
        self.resize.disconnect();
        log::debug!("Board {} torn down", self.board_id);
    }
}

impl Drop for BoardSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Send writes concurrently and apply each outcome as it arrives.
///
/// Follow-up writes are sent as soon as they are issued. The session is
/// borrowed only while an outcome is applied, so input can be fed to it
/// between completions.
pub async fn drive_writes(
    session: &RefCell<BoardSession>,
    writes: impl IntoIterator<Item = OutgoingWrite>,
) -> FlushReport {
    let mut in_flight: FuturesUnordered<_> = writes.into_iter().map(OutgoingWrite::send).collect();
    let mut report = FlushReport::default();

    while let Some(outcome) = in_flight.next().await {
        let link_id = outcome.request.link_id.clone();
        let completed = session.borrow_mut().complete(outcome);
        match completed {
            Ok(follow_up) => {
                if !report.written.contains(&link_id) {
                    report.written.push(link_id);
                }
                if let Some(write) = follow_up {
                    in_flight.push(write.send());
                }
            }
            Err(e) => report.failed.push((link_id, e)),
        }
    }
    report
}

fn validate_url(url: &str) -> BoardResult<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(BoardError::Validation("URL is required".to_string()));
    }
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(url.to_string()),
        Ok(parsed) => Err(BoardError::Validation(format!(
            "Unsupported URL scheme: {}",
            parsed.scheme()
        ))),
        Err(e) => Err(BoardError::Validation(format!("Invalid URL: {}", e))),
    }
}
