use crate::{
    config::Settings,
    domain::{
        card::{Card, CardId, Checklist, ChecklistItem},
        store::{CardAddress, EntityStore},
    },
    error::{Result, TaskboardError},
};
use tracing::{debug, warn};

/// When edits made in a session reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// Only on an explicit `commit`
    #[default]
    Explicit,
    /// After every edit, keeping the session open
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
}

/// A card staged for editing.
///
/// Holds an independent deep copy of the card; nothing done to the scratch
/// copy is visible in the store until it is written back.
#[derive(Debug, Clone)]
pub struct CardEditSession {
    card_id: CardId,
    origin: CardAddress,
    scratch: Card,
    mode: CommitMode,
}

impl CardEditSession {
    pub fn open(store: &EntityStore, address: CardAddress, mode: CommitMode) -> Result<Self> {
        let card = store.card(address)?;
        Ok(Self {
            card_id: card.id,
            origin: address,
            scratch: card.clone(),
            mode,
        })
    }

    pub fn card(&self) -> &Card {
        &self.scratch
    }

    /// Where the card was when it was last read or written
    pub fn origin(&self) -> CardAddress {
        self.origin
    }

    pub fn mode(&self) -> CommitMode {
        self.mode
    }

    // Every edit goes through `Card`'s validating methods and either applies
    // fully to the scratch copy or leaves it untouched.

    pub fn rename(&mut self, title: &str) -> Result<()> {
        self.scratch.rename(title)
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.scratch.set_description(description);
    }

    pub fn set_labels<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scratch.set_labels(labels);
    }

    pub fn set_background_color(&mut self, color: Option<String>) {
        self.scratch.set_background_color(color);
    }

    pub fn toggle_completed(&mut self) -> bool {
        self.scratch.toggle_completed()
    }

    pub fn add_checklist(&mut self, name: &str) -> usize {
        self.scratch.add_checklist(name)
    }

    pub fn rename_checklist(&mut self, checklist: usize, name: &str) -> Result<()> {
        self.scratch.rename_checklist(checklist, name)
    }

    pub fn delete_checklist(&mut self, checklist: usize) -> Result<Checklist> {
        self.scratch.delete_checklist(checklist)
    }

    pub fn add_checklist_item(&mut self, checklist: usize, text: &str) -> Result<usize> {
        self.scratch.add_checklist_item(checklist, text)
    }

    pub fn rename_checklist_item(&mut self, checklist: usize, item: usize, text: &str) -> Result<()> {
        self.scratch.rename_checklist_item(checklist, item, text)
    }

    pub fn delete_checklist_item(&mut self, checklist: usize, item: usize) -> Result<ChecklistItem> {
        self.scratch.delete_checklist_item(checklist, item)
    }

    pub fn toggle_checklist_item(&mut self, checklist: usize, item: usize) -> Result<bool> {
        self.scratch.toggle_checklist_item(checklist, item)
    }

    /// Writes the scratch copy back and ends the session
    pub fn commit(mut self, store: &mut EntityStore) -> Result<CardAddress> {
        self.write_back(store)
    }

    /// Ends the session without writing anything
    pub fn discard(self) {
        debug!(card = %self.card_id, "discarded card edit");
    }

    fn write_back(&mut self, store: &mut EntityStore) -> Result<CardAddress> {
        let address = store
            .locate(self.card_id)
            .ok_or(TaskboardError::StaleReference)?;
        store.write_card(address, self.scratch.clone())?;
        self.origin = address;
        debug!(
            board = address.board,
            list = address.list,
            card = address.card,
            "committed card edit"
        );
        Ok(address)
    }
}

/// Transient UI pointer: the open board and the card being edited.
///
/// Not part of the board tree; only `current_board` is persisted, through
/// [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct SessionCursor {
    current_board: usize,
    editing: Option<CardEditSession>,
}

impl SessionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the cursor from persisted settings, clamped to the store
    pub fn from_settings(settings: &Settings, store: &EntityStore) -> Self {
        let mut cursor = Self {
            current_board: settings.last_open_board,
            editing: None,
        };
        cursor.clamp(store);
        cursor
    }

    pub fn settings(&self) -> Settings {
        Settings {
            last_open_board: self.current_board,
        }
    }

    pub fn current_board(&self) -> usize {
        self.current_board
    }

    pub fn switch_board(&mut self, store: &EntityStore, board: usize) -> Result<()> {
        store.board(board)?;
        self.current_board = board;
        debug!(board, "switched board");
        Ok(())
    }

    /// Keeps the cursor on the same board after the board at `deleted` was removed
    pub fn board_deleted(&mut self, store: &EntityStore, deleted: usize) {
        if deleted < self.current_board {
            self.current_board -= 1;
        }
        self.clamp(store);
    }

    /// Pulls the cursor back inside the store after the board set shrank
    pub fn clamp(&mut self, store: &EntityStore) {
        let last = store.board_count().saturating_sub(1);
        if self.current_board > last {
            self.current_board = last;
        }
    }

    pub fn state(&self) -> SessionState {
        if self.editing.is_some() {
            SessionState::Open
        } else {
            SessionState::Closed
        }
    }

    pub fn session(&self) -> Option<&CardEditSession> {
        self.editing.as_ref()
    }

    /// Opens a card of the current board for editing, replacing any open session
    pub fn open_card(
        &mut self,
        store: &EntityStore,
        list: usize,
        card: usize,
        mode: CommitMode,
    ) -> Result<&CardEditSession> {
        let address = CardAddress::new(self.current_board, list, card);
        let session = CardEditSession::open(store, address, mode)?;
        if let Some(previous) = self.editing.take() {
            previous.discard();
        }
        Ok(self.editing.insert(session))
    }

    /// Runs `edit` against the open session as one step.
    ///
    /// When `edit` fails, the scratch copy is restored to what it was before
    /// the call. In live mode a successful step is committed straight away
    /// and the session stays open.
    pub fn edit_card<R>(
        &mut self,
        store: &mut EntityStore,
        edit: impl FnOnce(&mut CardEditSession) -> Result<R>,
    ) -> Result<R> {
        let session = self.editing.as_mut().ok_or(TaskboardError::SessionClosed)?;
        let before = session.scratch.clone();
        let value = match edit(&mut *session) {
            Ok(value) => value,
            Err(e) => {
                session.scratch = before;
                return Err(e);
            }
        };
        if session.mode() == CommitMode::Live {
            if let Err(e) = session.write_back(store) {
                warn!(error = %e, "live commit failed, closing card edit");
                self.editing = None;
                return Err(e);
            }
        }
        Ok(value)
    }

    /// Writes the open session back and closes it.
    ///
    /// A stale session is closed too; the card is never recreated.
    pub fn commit(&mut self, store: &mut EntityStore) -> Result<CardAddress> {
        let session = self.editing.take().ok_or(TaskboardError::SessionClosed)?;
        let result = session.commit(store);
        if let Err(e) = &result {
            warn!(error = %e, "card edit could not be committed");
        }
        result
    }

    /// Closes the open session without writing; returns whether one was open
    pub fn discard(&mut self) -> bool {
        match self.editing.take() {
            Some(session) => {
                session.discard();
                true
            }
            None => false,
        }
    }

    /// Deletes the card under edit from the store and closes the session
    pub fn delete_edited_card(&mut self, store: &mut EntityStore) -> Result<Card> {
        let session = self.editing.take().ok_or(TaskboardError::SessionClosed)?;
        let address = store
            .locate(session.card_id)
            .ok_or(TaskboardError::StaleReference)?;
        store.delete_card(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reorder::DropTarget;

    fn store_with_cards() -> EntityStore {
        let mut store = EntityStore::default();
        store.create_list(0, "Todo").unwrap();
        store.create_card(0, 0, "A").unwrap();
        store.create_card(0, 0, "B").unwrap();
        store
    }

    #[test]
    fn test_edits_stay_in_scratch_until_commit() {
        let mut store = store_with_cards();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 1, CommitMode::Explicit).unwrap();
        assert_eq!(cursor.state(), SessionState::Open);

        cursor
            .edit_card(&mut store, |card| card.rename("B2"))
            .unwrap();
        cursor
            .edit_card(&mut store, |card| Ok(card.add_checklist("Steps")))
            .unwrap();
        assert_eq!(store.card(CardAddress::new(0, 0, 1)).unwrap().title, "B");

        let address = cursor.commit(&mut store).unwrap();
        assert_eq!(address, CardAddress::new(0, 0, 1));
        assert_eq!(cursor.state(), SessionState::Closed);

        let card = store.card(address).unwrap();
        assert_eq!(card.title, "B2");
        assert_eq!(card.checklists.len(), 1);
    }

    #[test]
    fn test_discard_leaves_store_untouched() {
        let mut store = store_with_cards();
        let before = store.clone();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 0, CommitMode::Explicit).unwrap();
        cursor
            .edit_card(&mut store, |card| Ok(card.toggle_completed()))
            .unwrap();

        assert!(cursor.discard());
        assert!(!cursor.discard());
        assert_eq!(store, before);
    }

    #[test]
    fn test_live_mode_commits_every_edit() {
        let mut store = store_with_cards();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 0, CommitMode::Live).unwrap();

        let checklist = cursor
            .edit_card(&mut store, |card| Ok(card.add_checklist("QA")))
            .unwrap();
        cursor
            .edit_card(&mut store, |card| card.add_checklist_item(checklist, "review"))
            .unwrap();

        let card = store.card(CardAddress::new(0, 0, 0)).unwrap();
        assert_eq!(card.checklists[0].items.len(), 1);
        assert_eq!(cursor.state(), SessionState::Open);
    }

    #[test]
    fn test_commit_after_delete_is_stale() {
        let mut store = store_with_cards();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 0, CommitMode::Explicit).unwrap();
        cursor
            .edit_card(&mut store, |card| card.rename("Resurrected?"))
            .unwrap();

        store.delete_card(CardAddress::new(0, 0, 0)).unwrap();

        assert!(matches!(
            cursor.commit(&mut store),
            Err(TaskboardError::StaleReference)
        ));
        assert_eq!(cursor.state(), SessionState::Closed);
        let titles: Vec<_> = store.boards()[0].lists[0].cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["B"]);
    }

    #[test]
    fn test_live_commit_after_delete_closes_session() {
        let mut store = store_with_cards();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 1, CommitMode::Live).unwrap();
        store.delete_list(0, 0).unwrap();

        let result = cursor.edit_card(&mut store, |card| card.rename("X"));
        assert!(matches!(result, Err(TaskboardError::StaleReference)));
        assert_eq!(cursor.state(), SessionState::Closed);
    }

    #[test]
    fn test_commit_follows_moved_card() {
        let mut store = store_with_cards();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 0, CommitMode::Explicit).unwrap();
        store.move_card(0, 0, 0, 0, DropTarget::zone(2)).unwrap();

        cursor
            .edit_card(&mut store, |card| {
                card.set_description("moved while open");
                Ok(())
            })
            .unwrap();
        let address = cursor.commit(&mut store).unwrap();
        assert_eq!(address, CardAddress::new(0, 0, 1));
        assert_eq!(store.card(address).unwrap().description, "moved while open");
        assert_eq!(store.card(CardAddress::new(0, 0, 0)).unwrap().title, "B");
    }

    #[test]
    fn test_failed_edit_step_rolls_back_scratch() {
        let mut store = store_with_cards();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 0, CommitMode::Explicit).unwrap();

        let result = cursor.edit_card(&mut store, |card| {
            card.rename("Draft")?;
            card.add_checklist_item(7, "x")
        });
        assert!(matches!(
            result,
            Err(TaskboardError::IndexOutOfRange { entity: "checklist", .. })
        ));
        assert_eq!(cursor.session().unwrap().card().title, "A");

        cursor.commit(&mut store).unwrap();
        assert_eq!(store.card(CardAddress::new(0, 0, 0)).unwrap().title, "A");
    }

    #[test]
    fn test_blank_title_never_reaches_store() {
        let mut store = store_with_cards();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 1, CommitMode::Live).unwrap();

        assert!(matches!(
            cursor.edit_card(&mut store, |card| card.rename("   ")),
            Err(TaskboardError::Validation(_))
        ));
        assert_eq!(cursor.state(), SessionState::Open);
        cursor.commit(&mut store).unwrap();
        assert_eq!(store.card(CardAddress::new(0, 0, 1)).unwrap().title, "B");
    }

    #[test]
    fn test_failed_live_step_writes_nothing() {
        let mut store = store_with_cards();
        let before = store.clone();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 0, CommitMode::Live).unwrap();

        let result = cursor.edit_card(&mut store, |card| {
            card.set_labels(["red"]);
            card.delete_checklist(0).map(|_| ())
        });
        assert!(result.is_err());
        assert_eq!(store, before);
        assert!(cursor.session().unwrap().card().labels.is_empty());
    }

    #[test]
    fn test_session_value_type_edits() {
        let store = store_with_cards();
        let mut session = CardEditSession::open(&store, CardAddress::new(0, 0, 0), CommitMode::Explicit).unwrap();
        session.set_background_color(Some("purple".to_string()));
        let checklist = session.add_checklist("");
        session.add_checklist_item(checklist, "one").unwrap();
        session.rename_checklist_item(checklist, 0, "first").unwrap();
        assert!(session.toggle_checklist_item(checklist, 0).unwrap());

        let card = session.card();
        assert_eq!(card.background_color.as_deref(), Some("purple"));
        assert_eq!(card.checklists[0].name, "Checklist");
        assert_eq!(card.checklists[0].items[0].text, "first");
        assert_eq!(store.card(CardAddress::new(0, 0, 0)).unwrap().background_color, None);
    }

    #[test]
    fn test_edit_without_session() {
        let mut store = store_with_cards();
        let mut cursor = SessionCursor::new();
        assert!(matches!(
            cursor.edit_card(&mut store, |card| card.rename("X")),
            Err(TaskboardError::SessionClosed)
        ));
        assert!(matches!(cursor.commit(&mut store), Err(TaskboardError::SessionClosed)));
    }

    #[test]
    fn test_open_out_of_range_keeps_previous_session() {
        let store = store_with_cards();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 0, CommitMode::Explicit).unwrap();
        assert!(cursor.open_card(&store, 0, 9, CommitMode::Explicit).is_err());
        assert_eq!(cursor.session().unwrap().card().title, "A");
    }

    #[test]
    fn test_delete_edited_card() {
        let mut store = store_with_cards();
        let mut cursor = SessionCursor::new();
        cursor.open_card(&store, 0, 1, CommitMode::Explicit).unwrap();
        let removed = cursor.delete_edited_card(&mut store).unwrap();
        assert_eq!(removed.title, "B");
        assert_eq!(store.list(0, 0).unwrap().cards.len(), 1);
        assert_eq!(cursor.state(), SessionState::Closed);
    }

    #[test]
    fn test_board_cursor_follows_deletions() {
        let mut store = EntityStore::default();
        store.create_board("Second").unwrap();
        store.create_board("Third").unwrap();

        let mut cursor = SessionCursor::new();
        cursor.switch_board(&store, 2).unwrap();
        assert!(cursor.switch_board(&store, 3).is_err());

        store.delete_board(0).unwrap();
        cursor.board_deleted(&store, 0);
        assert_eq!(cursor.current_board(), 1);
        assert_eq!(store.boards()[cursor.current_board()].name, "Third");

        store.delete_board(1).unwrap();
        cursor.board_deleted(&store, 1);
        assert_eq!(cursor.current_board(), 0);
    }

    #[test]
    fn test_from_settings_clamps() {
        let store = EntityStore::default();
        let cursor = SessionCursor::from_settings(&Settings { last_open_board: 7 }, &store);
        assert_eq!(cursor.current_board(), 0);
        assert_eq!(cursor.settings().last_open_board, 0);
    }
}
