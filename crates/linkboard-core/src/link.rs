//! Link widgets and their wire representation.

use crate::embed::{self, EmbedDescriptor};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Server-assigned link identifier. May be empty right after creation.
pub type LinkId = String;

/// Width used when the remote store has no usable width for a link.
pub const DEFAULT_WIDTH: f64 = 400.0;
/// Height used when the remote store has no usable height for a link.
pub const DEFAULT_HEIGHT: f64 = 300.0;

/// A board owns a set of links. Only its id is read by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

/// A link as exchanged with the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    #[serde(default)]
    pub id: LinkId,
    #[serde(default)]
    pub board_id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl LinkRecord {
    /// Record for a link that was created but whose id is not yet known.
    pub fn unconfirmed(board_id: &str, url: &str) -> Self {
        Self {
            id: LinkId::new(),
            board_id: board_id.to_string(),
            url: url.to_string(),
            x: None,
            y: None,
            width: None,
            height: None,
        }
    }

    /// Geometry fields carried by this record.
    pub fn geometry(&self) -> LinkPatch {
        LinkPatch {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// A positioned, resizable widget embedding a resolved URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub board_id: String,
    url: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    embed: EmbedDescriptor,
}

impl Link {
    /// Create a link at the origin with default size.
    pub fn new(id: impl Into<LinkId>, board_id: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let embed = embed::resolve(&url);
        Self {
            id: id.into(),
            board_id: board_id.into(),
            url,
            x: 0.0,
            y: 0.0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            embed,
        }
    }

    /// Builder: set geometry, applying the same rules as [`Link::apply`].
    pub fn with_geometry(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.apply(&LinkPatch::full(x, y, width, height));
        self
    }

    /// Build a link from its wire form, deriving the embed descriptor.
    pub fn from_record(record: LinkRecord) -> Self {
        let geometry = record.geometry();
        let mut link = Self::new(record.id, record.board_id, record.url);
        link.apply(&geometry);
        link
    }

    /// Wire form of this link.
    pub fn to_record(&self) -> LinkRecord {
        LinkRecord {
            id: self.id.clone(),
            board_id: self.board_id.clone(),
            url: self.url.clone(),
            x: Some(self.x),
            y: Some(self.y),
            width: Some(self.width),
            height: Some(self.height),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace the URL and recompute the embed descriptor.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
        self.embed = embed::resolve(&self.url);
    }

    pub fn embed(&self) -> &EmbedDescriptor {
        &self.embed
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position(), self.size())
    }

    /// Merge the set fields of a patch into this link.
    ///
    /// Positions are clamped to be non-negative. Non-positive or non-finite
    /// sizes are ignored.
    pub fn apply(&mut self, patch: &LinkPatch) {
        let patch = patch.sanitized();
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
    }
}

/// A partial update to a link's geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl LinkPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn dimensions(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn full(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.width.is_none() && self.height.is_none()
    }

    pub fn has_position(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    pub fn has_dimensions(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    /// Overwrite fields set in `newer`; fields it leaves unset are kept.
    pub fn merge(&mut self, newer: &LinkPatch) {
        if newer.x.is_some() {
            self.x = newer.x;
        }
        if newer.y.is_some() {
            self.y = newer.y;
        }
        if newer.width.is_some() {
            self.width = newer.width;
        }
        if newer.height.is_some() {
            self.height = newer.height;
        }
    }

    /// Copy of this patch with positions clamped to `>= 0` and invalid sizes dropped.
    pub fn sanitized(&self) -> LinkPatch {
        let clamp = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        let positive = |v: f64| (v.is_finite() && v > 0.0).then_some(v);
        LinkPatch {
            x: self.x.map(clamp),
            y: self.y.map(clamp),
            width: self.width.and_then(positive),
            height: self.height.and_then(positive),
        }
    }

    /// Clear every field whose value equals the one in `acked`.
    ///
    /// Fields overwritten since `acked` was taken are kept.
    pub fn clear_acknowledged(&mut self, acked: &LinkPatch) {
        if self.x.is_some() && self.x == acked.x {
            self.x = None;
        }
        if self.y.is_some() && self.y == acked.y {
            self.y = None;
        }
        if self.width.is_some() && self.width == acked.width {
            self.width = None;
        }
        if self.height.is_some() && self.height == acked.height {
            self.height = None;
        }
    }

    /// Remove the fields that are set in `mask`.
    pub fn without(&self, mask: &LinkPatch) -> LinkPatch {
        LinkPatch {
            x: self.x.filter(|_| mask.x.is_none()),
            y: self.y.filter(|_| mask.y.is_none()),
            width: self.width.filter(|_| mask.width.is_none()),
            height: self.height.filter(|_| mask.height.is_none()),
        }
    }
}
