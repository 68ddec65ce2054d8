pub mod board;
pub mod card;
pub mod reorder;
pub mod session;
pub mod store;

pub use board::{Board, BoardSummary, DeletionImpact, List};
pub use card::{Card, CardId, Checklist, ChecklistItem, Progress};
pub use reorder::{move_element, transfer_element, DropTarget, HoverSide, MoveOutcome};
pub use session::{CardEditSession, CommitMode, SessionCursor, SessionState};
pub use store::{CardAddress, EntityStore};
