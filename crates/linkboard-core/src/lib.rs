//! Linkboard Core Library
//!
//! Platform-agnostic layout and sync engine for boards of embedded social
//! media links: widget geometry, drag and resize interaction, and coalesced
//! persistence to the remote links API.

pub mod api;
pub mod config;
pub mod drag;
pub mod edit_mode;
pub mod embed;
pub mod error;
pub mod identity;
pub mod link;
pub mod listeners;
pub mod persistence;
pub mod registry;
pub mod resize;
pub mod session;

#[cfg(test)]
pub(crate) mod test_util;

pub use api::{BoardApi, GeometryWrite, HttpBoardApi, MemoryBoardApi};
pub use config::BoardConfig;
pub use drag::{DragController, DragEnd, DragState, PointerTarget};
pub use edit_mode::{EditModeController, EditModeExit};
pub use embed::{EmbedDescriptor, Platform};
pub use error::{ApiError, ApiResult, BoardError, BoardResult};
pub use identity::{FileCredentialStore, Identity, StaticIdentity, TokenIdentity};
pub use link::{Board, DEFAULT_HEIGHT, DEFAULT_WIDTH, Link, LinkId, LinkPatch, LinkRecord};
pub use listeners::{ListenerKind, ListenerSet, Subscription};
pub use persistence::{FlushMode, FlushReport, PendingChange, PersistenceSync, WriteRequest};
pub use registry::LinkRegistry;
pub use resize::{DimensionsChanged, ResizeWatcher};
pub use session::{BoardSession, DragRelease, OutgoingWrite, WriteOutcome, drive_writes};
