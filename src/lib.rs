//! # Taskboard Core
//!
//! Engine for hierarchical task boards (boards, lists, cards, checklists and
//! checklist items).
//!
//! This crate owns the board tree and every mutation of it, turns drag
//! gestures into list and card reorders, stages card edits in a scratch copy,
//! and keeps the tree synchronized with durable storage through a debounced
//! save plus snapshot export/import. Rendering and dialogs live outside.

pub mod config;
pub mod domain;
pub mod error;
pub mod storage;
pub mod workspace;

// Re-export commonly used types
pub use config::{GatewayConfig, Settings, FORMAT_VERSION};
pub use domain::{
    board::{Board, BoardSummary, DeletionImpact, List},
    card::{Card, CardId, Checklist, ChecklistItem, Progress},
    reorder::{DropTarget, HoverSide, MoveOutcome},
    session::{CardEditSession, CommitMode, SessionCursor, SessionState},
    store::{CardAddress, EntityStore},
};
pub use error::{Result, TaskboardError};
pub use storage::{
    gateway::{LoadOutcome, PersistenceGateway, SaveStatus},
    snapshot::{export_snapshot, import_snapshot, ImportedSnapshot, StorageUsage},
    KeyValueStore,
};
pub use workspace::{SharedWorkspace, Workspace};
