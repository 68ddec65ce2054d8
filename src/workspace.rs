use crate::{
    config::Settings,
    domain::{
        board::DeletionImpact,
        session::SessionCursor,
        store::EntityStore,
    },
    error::Result,
};
use std::sync::{Arc, RwLock};

/// Workspace state shared with the debounced save task, which reads it when
/// the timer fires
pub type SharedWorkspace = Arc<RwLock<Workspace>>;

/// The board tree together with the transient cursor into it
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub store: EntityStore,
    pub cursor: SessionCursor,
}

impl Workspace {
    pub fn new(store: EntityStore, settings: &Settings) -> Self {
        let cursor = SessionCursor::from_settings(settings, &store);
        Self { store, cursor }
    }

    pub fn shared(self) -> SharedWorkspace {
        Arc::new(RwLock::new(self))
    }

    pub fn settings(&self) -> Settings {
        self.cursor.settings()
    }

    /// Deletes a board and keeps the cursor pointing at a live board
    pub fn delete_board(&mut self, board: usize) -> Result<DeletionImpact> {
        let impact = self.store.delete_board(board)?;
        self.cursor.board_deleted(&self.store, board);
        Ok(impact)
    }

    /// Replaces the whole tree (after an import) and resets the cursor
    pub fn replace(&mut self, store: EntityStore, settings: &Settings) {
        self.cursor.discard();
        self.cursor = SessionCursor::from_settings(settings, &store);
        self.store = store;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_board_moves_cursor() {
        let mut store = EntityStore::default();
        store.create_board("Second").unwrap();
        let mut workspace = Workspace::new(store, &Settings { last_open_board: 1 });

        workspace.delete_board(1).unwrap();
        assert_eq!(workspace.settings().last_open_board, 0);
        assert!(workspace.delete_board(0).is_err());
    }

    #[test]
    fn test_replace_resets_cursor() {
        let mut workspace = Workspace::default();
        let mut store = EntityStore::default();
        store.create_board("Imported").unwrap();

        workspace.replace(store, &Settings { last_open_board: 1 });
        assert_eq!(workspace.cursor.current_board(), 1);
        assert_eq!(workspace.store.board_count(), 2);
    }
}
