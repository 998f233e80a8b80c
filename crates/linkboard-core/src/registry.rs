//! Local authoritative view of a board's links.

use crate::link::{Link, LinkId, LinkPatch, LinkRecord};
use std::collections::HashMap;

/// In-memory store of the links on the current board.
///
/// Iteration follows insertion order so widgets render in a stable stack.
/// The registry never touches the network.
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    /// All links, keyed by ID.
    links: HashMap<LinkId, Link>,
    /// Insertion order of link IDs.
    order: Vec<LinkId>,
}

impl LinkRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set with links loaded from the remote store.
    pub fn load(&mut self, records: impl IntoIterator<Item = LinkRecord>) {
        self.links.clear();
        self.order.clear();
        for record in records {
            self.add(record);
        }
        log::debug!("Registry loaded with {} links", self.links.len());
    }

    /// Append a link, deriving its embed descriptor.
    ///
    /// Adding an ID that is already present replaces that link in place.
    pub fn add(&mut self, record: LinkRecord) {
        self.insert(Link::from_record(record));
    }

    /// Insert an already-built link.
    pub fn insert(&mut self, link: Link) {
        if !self.links.contains_key(&link.id) {
            self.order.push(link.id.clone());
        }
        self.links.insert(link.id.clone(), link);
    }

    /// Remove a link.
    pub fn remove(&mut self, id: &str) -> Option<Link> {
        self.order.retain(|link_id| link_id != id);
        self.links.remove(id)
    }

    /// Merge geometry fields into a link.
    /// Returns the updated link, or `None` if the ID is unknown.
    pub fn apply_patch(&mut self, id: &str, patch: &LinkPatch) -> Option<&Link> {
        let link = self.links.get_mut(id)?;
        link.apply(patch);
        Some(link)
    }

    /// Change a link's URL, keeping its embed descriptor in step.
    pub fn set_url(&mut self, id: &str, url: &str) -> Option<&Link> {
        let link = self.links.get_mut(id)?;
        link.set_url(url);
        Some(link)
    }

    /// Get a link by ID.
    pub fn get(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.links.contains_key(id)
    }

    /// Links in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.order.iter().filter_map(|id| self.links.get(id))
    }

    /// Link IDs in insertion order.
    pub fn ids(&self) -> &[LinkId] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::Platform;

    fn record(id: &str, url: &str) -> LinkRecord {
        LinkRecord {
            id: id.to_string(),
            board_id: "board".to_string(),
            url: url.to_string(),
            x: Some(10.0),
            y: Some(20.0),
            width: Some(300.0),
            height: Some(200.0),
        }
    }

    #[test]
    fn test_load_replaces_and_derives_embed() {
        let mut registry = LinkRegistry::new();
        registry.add(record("old", "https://example.com"));

        registry.load(vec![
            record("a", "https://youtu.be/dQw4w9WgXcQ"),
            record("b", "https://www.instagram.com/p/Abc123/"),
        ]);

        assert_eq!(registry.len(), 2);
        assert!(!registry.contains("old"));
        assert_eq!(registry.get("a").unwrap().embed().platform, Platform::Youtube);
        assert_eq!(registry.get("b").unwrap().embed().platform, Platform::Instagram);
    }

    #[test]
    fn test_insertion_order_is_stable() {
        let mut registry = LinkRegistry::new();
        registry.add(record("c", "https://example.com/c"));
        registry.add(record("a", "https://example.com/a"));
        registry.add(record("b", "https://example.com/b"));

        // Re-adding keeps the original slot.
        registry.add(record("a", "https://example.com/a2"));

        let ids: Vec<_> = registry.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(registry.get("a").unwrap().url(), "https://example.com/a2");
    }

    #[test]
    fn test_remove() {
        let mut registry = LinkRegistry::new();
        registry.add(record("a", "https://example.com"));
        registry.add(record("b", "https://example.com"));

        let removed = registry.remove("a");
        assert!(removed.is_some());
        assert_eq!(registry.ids(), ["b".to_string()]);
        assert!(registry.remove("missing").is_none());
    }

    #[test]
    fn test_apply_patch_merges_fields() {
        let mut registry = LinkRegistry::new();
        registry.add(record("a", "https://example.com"));

        let link = registry
            .apply_patch("a", &LinkPatch { x: Some(-5.0), width: Some(640.0), ..LinkPatch::default() })
            .unwrap();
        assert_eq!(link.x, 0.0);
        assert_eq!(link.y, 20.0);
        assert_eq!(link.width, 640.0);
        assert_eq!(link.height, 200.0);

        assert!(registry.apply_patch("missing", &LinkPatch::position(1.0, 1.0)).is_none());
    }

    #[test]
    fn test_set_url_keeps_embed_consistent() {
        let mut registry = LinkRegistry::new();
        registry.add(record("a", "https://example.com"));
        registry.set_url("a", "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(
            registry.get("a").unwrap().embed().embed_url,
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        );
    }
}
