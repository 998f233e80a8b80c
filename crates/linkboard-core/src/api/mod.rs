//! Remote links API.
//!
//! The remote store is the source of truth for link geometry. It is reached
//! through the [`BoardApi`] trait so the sync engine can run against the HTTP
//! backend or an in-memory one.

mod http;
mod memory;

pub use http::HttpBoardApi;
pub use memory::MemoryBoardApi;

use crate::error::ApiResult;
use crate::link::{LinkPatch, LinkRecord};
use std::future::Future;
use std::pin::Pin;

/// Boxed future for async API calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// A geometry update in the integer units the remote store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryWrite {
    /// `PATCH /links/{id}/position?x=&y=`
    Position { x: i64, y: i64 },
    /// `PATCH /links/{id}/dimensions?width=&height=`
    Dimensions { width: i64, height: i64 },
    /// `PATCH /links/{id}/position-dimensions?x=&y=&width=&height=`
    PositionDimensions {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
}

impl GeometryWrite {
    /// Path suffix appended to `/links/{id}`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Position { .. } => "position",
            Self::Dimensions { .. } => "dimensions",
            Self::PositionDimensions { .. } => "position-dimensions",
        }
    }

    /// Query parameters, in the order the endpoint documents them.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match *self {
            Self::Position { x, y } => vec![("x", x.to_string()), ("y", y.to_string())],
            Self::Dimensions { width, height } => {
                vec![("width", width.to_string()), ("height", height.to_string())]
            }
            Self::PositionDimensions { x, y, width, height } => vec![
                ("x", x.to_string()),
                ("y", y.to_string()),
                ("width", width.to_string()),
                ("height", height.to_string()),
            ],
        }
    }

    /// The fields this write sets, as a patch.
    pub fn patch(&self) -> LinkPatch {
        match *self {
            Self::Position { x, y } => LinkPatch::position(x as f64, y as f64),
            Self::Dimensions { width, height } => LinkPatch::dimensions(width as f64, height as f64),
            Self::PositionDimensions { x, y, width, height } => {
                LinkPatch::full(x as f64, y as f64, width as f64, height as f64)
            }
        }
    }
}

/// Client for the remote links API.
///
/// Every call is authenticated by the implementation; callers only check that
/// an identity is present before issuing requests.
pub trait BoardApi: Send + Sync {
    /// `GET /boards/{board_id}/links`
    fn list_links(&self, board_id: &str) -> BoxFuture<'_, ApiResult<Vec<LinkRecord>>>;

    /// `POST /boards/{board_id}/links`
    ///
    /// The returned record may have an empty id when the server created the
    /// link but its response body could not be read.
    fn create_link(&self, board_id: &str, url: &str) -> BoxFuture<'_, ApiResult<LinkRecord>>;

    /// `DELETE /links/{link_id}`
    fn delete_link(&self, link_id: &str) -> BoxFuture<'_, ApiResult<()>>;

    /// One of the `PATCH /links/{link_id}/...` geometry endpoints.
    fn write_geometry(
        &self,
        link_id: &str,
        write: GeometryWrite,
    ) -> BoxFuture<'_, ApiResult<LinkRecord>>;

    /// `PATCH /links/{link_id}` with a JSON body of the set fields.
    ///
    /// General partial update for callers editing a link outside a board
    /// session. [`crate::BoardSession`] never calls it: its writes go through
    /// [`BoardApi::write_geometry`] so every change uses the integer query
    /// endpoints and is serialized per link.
    fn update_link(&self, link_id: &str, patch: &LinkPatch) -> BoxFuture<'_, ApiResult<LinkRecord>>;
}
