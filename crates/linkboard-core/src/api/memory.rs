//! In-memory links API.

use super::{BoardApi, BoxFuture, GeometryWrite};
use crate::error::{ApiError, ApiResult};
use crate::link::{LinkId, LinkPatch, LinkRecord};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct MemoryState {
    /// Links in creation order.
    links: Vec<LinkRecord>,
    next_id: u64,
    /// Every geometry write received, in arrival order.
    writes: Vec<(LinkId, GeometryWrite)>,
    /// When set, every call fails with a transport error.
    offline: bool,
    /// When set, `create_link` answers like a server whose 201 body was unreadable.
    hide_created_ids: bool,
}

/// In-memory links API for tests and offline demos.
///
/// Applies the same canonicalization as the remote store: positions are
/// clamped to `>= 0` and non-positive sizes are rejected.
#[derive(Debug, Default)]
pub struct MemoryBoardApi {
    state: RwLock<MemoryState>,
}

impl MemoryBoardApi {
    /// Create an empty in-memory API.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ApiResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| ApiError::Transport(format!("Lock error: {}", e)))
    }

    fn write(&self) -> ApiResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| ApiError::Transport(format!("Lock error: {}", e)))
    }

    fn online(&self) -> ApiResult<RwLockWriteGuard<'_, MemoryState>> {
        let state = self.write()?;
        if state.offline {
            return Err(ApiError::Transport("Remote store unreachable".to_string()));
        }
        Ok(state)
    }

    /// Insert links directly, bypassing the API.
    pub fn seed(&self, records: impl IntoIterator<Item = LinkRecord>) {
        if let Ok(mut state) = self.write() {
            state.links.extend(records);
        }
    }

    /// Simulate losing (or regaining) the connection to the remote store.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.write() {
            state.offline = offline;
        }
    }

    /// Make `create_link` return records with an empty id.
    pub fn set_hide_created_ids(&self, hide: bool) {
        if let Ok(mut state) = self.write() {
            state.hide_created_ids = hide;
        }
    }

    /// All geometry writes received so far.
    pub fn writes(&self) -> Vec<(LinkId, GeometryWrite)> {
        self.read().map(|s| s.writes.clone()).unwrap_or_default()
    }

    /// Geometry writes received for one link.
    pub fn writes_for(&self, link_id: &str) -> Vec<GeometryWrite> {
        self.writes()
            .into_iter()
            .filter(|(id, _)| id == link_id)
            .map(|(_, write)| write)
            .collect()
    }

    /// Current stored record for a link.
    pub fn get(&self, link_id: &str) -> Option<LinkRecord> {
        self.read()
            .ok()?
            .links
            .iter()
            .find(|l| l.id == link_id)
            .cloned()
    }
}

fn apply_canonical(record: &mut LinkRecord, patch: &LinkPatch) -> ApiResult<()> {
    let invalid = |v: Option<f64>| v.is_some_and(|v| !(v.is_finite() && v > 0.0));
    if invalid(patch.width) || invalid(patch.height) {
        return Err(ApiError::Status {
            status: 400,
            message: "width and height must be positive".to_string(),
        });
    }
    let canonical = patch.sanitized();
    if let Some(x) = canonical.x {
        record.x = Some(x.round());
    }
    if let Some(y) = canonical.y {
        record.y = Some(y.round());
    }
    if let Some(width) = canonical.width {
        record.width = Some(width.round());
    }
    if let Some(height) = canonical.height {
        record.height = Some(height.round());
    }
    Ok(())
}

impl MemoryState {
    fn find_mut(&mut self, link_id: &str) -> ApiResult<&mut LinkRecord> {
        self.links
            .iter_mut()
            .find(|l| l.id == link_id)
            .ok_or_else(|| ApiError::NotFound(format!("link {link_id}")))
    }
}

impl BoardApi for MemoryBoardApi {
    fn list_links(&self, board_id: &str) -> BoxFuture<'_, ApiResult<Vec<LinkRecord>>> {
        let board_id = board_id.to_string();
        Box::pin(async move {
            let state = self.online()?;
            Ok(state
                .links
                .iter()
                .filter(|l| l.board_id == board_id)
                .cloned()
                .collect())
        })
    }

    fn create_link(&self, board_id: &str, url: &str) -> BoxFuture<'_, ApiResult<LinkRecord>> {
        let board_id = board_id.to_string();
        let url = url.to_string();
        Box::pin(async move {
            let mut state = self.online()?;
            state.next_id += 1;
            let mut record = LinkRecord::unconfirmed(&board_id, &url);
            record.id = format!("link-{}", state.next_id);
            state.links.push(record.clone());
            if state.hide_created_ids {
                return Ok(LinkRecord::unconfirmed(&board_id, &url));
            }
            Ok(record)
        })
    }

    fn delete_link(&self, link_id: &str) -> BoxFuture<'_, ApiResult<()>> {
        let link_id = link_id.to_string();
        Box::pin(async move {
            let mut state = self.online()?;
            state.links.retain(|l| l.id != link_id);
            Ok(())
        })
    }

    fn write_geometry(
        &self,
        link_id: &str,
        write: GeometryWrite,
    ) -> BoxFuture<'_, ApiResult<LinkRecord>> {
        let link_id = link_id.to_string();
        Box::pin(async move {
            let mut state = self.online()?;
            state.writes.push((link_id.clone(), write));
            let record = state.find_mut(&link_id)?;
            apply_canonical(record, &write.patch())?;
            Ok(record.clone())
        })
    }

    fn update_link(&self, link_id: &str, patch: &LinkPatch) -> BoxFuture<'_, ApiResult<LinkRecord>> {
        let link_id = link_id.to_string();
        let patch = *patch;
        Box::pin(async move {
            let mut state = self.online()?;
            let record = state.find_mut(&link_id)?;
            apply_canonical(record, &patch)?;
            Ok(record.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::block_on;

    #[test]
    fn test_create_and_list() {
        let api = MemoryBoardApi::new();
        let created = block_on(api.create_link("b1", "https://example.com")).unwrap();
        block_on(api.create_link("b2", "https://example.org")).unwrap();

        assert!(!created.id.is_empty());
        let links = block_on(api.list_links("b1")).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com");
    }

    #[test]
    fn test_hidden_created_id() {
        let api = MemoryBoardApi::new();
        api.set_hide_created_ids(true);
        let created = block_on(api.create_link("b1", "https://example.com")).unwrap();
        assert!(created.id.is_empty());
        assert_eq!(block_on(api.list_links("b1")).unwrap().len(), 1);
    }

    #[test]
    fn test_geometry_write_is_recorded_and_canonical() {
        let api = MemoryBoardApi::new();
        let created = block_on(api.create_link("b1", "https://example.com")).unwrap();

        let updated = block_on(api.write_geometry(
            &created.id,
            GeometryWrite::Position { x: -4, y: 12 },
        ))
        .unwrap();
        assert_eq!(updated.x, Some(0.0));
        assert_eq!(updated.y, Some(12.0));
        assert_eq!(api.writes_for(&created.id).len(), 1);
    }

    #[test]
    fn test_rejects_non_positive_size() {
        let api = MemoryBoardApi::new();
        let created = block_on(api.create_link("b1", "https://example.com")).unwrap();
        let result = block_on(api.write_geometry(
            &created.id,
            GeometryWrite::Dimensions { width: 0, height: 10 },
        ));
        assert!(matches!(result, Err(ApiError::Status { status: 400, .. })));
    }

    #[test]
    fn test_offline_fails() {
        let api = MemoryBoardApi::new();
        api.set_offline(true);
        let result = block_on(api.list_links("b1"));
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[test]
    fn test_update_unknown_link() {
        let api = MemoryBoardApi::new();
        let result = block_on(api.update_link("nope", &LinkPatch::position(1.0, 1.0)));
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let api = MemoryBoardApi::new();
        let created = block_on(api.create_link("b1", "https://example.com")).unwrap();
        block_on(api.delete_link(&created.id)).unwrap();
        assert!(api.get(&created.id).is_none());
    }
}
