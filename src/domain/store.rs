use crate::{
    domain::{
        board::{Board, BoardSummary, DeletionImpact, List},
        card::{non_blank, Card, CardId},
        reorder::{self, DropTarget, MoveOutcome},
    },
    error::{Result, TaskboardError},
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Name of the board a fresh workspace starts with
pub const DEFAULT_BOARD_NAME: &str = "My Board";

/// Position of a card in the tree.
///
/// Valid only until the next structural change (insert, remove or move) of
/// the boards, lists or cards it passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardAddress {
    pub board: usize,
    pub list: usize,
    pub card: usize,
}

impl CardAddress {
    pub fn new(board: usize, list: usize, card: usize) -> Self {
        Self { board, list, card }
    }
}

/// Owner and sole mutator of the board tree
#[derive(Debug, Clone)]
pub struct EntityStore {
    boards: Vec<Board>,
    // Rebuilt after every structural change.
    card_index: HashMap<CardId, CardAddress>,
    revision: u64,
}

impl EntityStore {
    /// A store without any boards
    pub fn empty() -> Self {
        Self {
            boards: Vec::new(),
            card_index: HashMap::new(),
            revision: 0,
        }
    }

    /// Builds a store from a loaded or imported tree, dropping repeated labels
    pub fn from_boards(mut boards: Vec<Board>) -> Self {
        dedupe_labels(&mut boards);
        let mut store = Self {
            boards,
            card_index: HashMap::new(),
            revision: 0,
        };
        store.reindex();
        store
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn into_boards(self) -> Vec<Board> {
        self.boards
    }

    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    /// Bumped by every successful mutation.
    ///
    /// A renderer redraws when this differs from the value it last drew;
    /// failed operations and no-op moves leave it unchanged.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Swaps in a whole new tree, e.g. after an import
    pub fn replace_boards(&mut self, mut boards: Vec<Board>) {
        dedupe_labels(&mut boards);
        self.boards = boards;
        self.reindex();
        self.touch();
        info!(boards = self.boards.len(), "replaced board tree");
    }

    pub fn summaries(&self) -> Vec<BoardSummary> {
        self.boards.iter().map(Board::summary).collect()
    }

    /// Current address of a card, if it still exists
    pub fn locate(&self, id: CardId) -> Option<CardAddress> {
        self.card_index.get(&id).copied()
    }

    fn reindex(&mut self) {
        self.card_index.clear();
        for (b, board) in self.boards.iter().enumerate() {
            for (l, list) in board.lists.iter().enumerate() {
                for (c, card) in list.cards.iter().enumerate() {
                    self.card_index.insert(card.id, CardAddress::new(b, l, c));
                }
            }
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // ---- lookups ----

    pub fn board(&self, board: usize) -> Result<&Board> {
        self.boards
            .get(board)
            .ok_or_else(|| TaskboardError::out_of_range("board", board, self.boards.len()))
    }

    pub fn list(&self, board: usize, list: usize) -> Result<&List> {
        let lists = &self.board(board)?.lists;
        lists
            .get(list)
            .ok_or_else(|| TaskboardError::out_of_range("list", list, lists.len()))
    }

    pub fn card(&self, address: CardAddress) -> Result<&Card> {
        let cards = &self.list(address.board, address.list)?.cards;
        cards
            .get(address.card)
            .ok_or_else(|| TaskboardError::out_of_range("card", address.card, cards.len()))
    }

    fn board_mut(&mut self, board: usize) -> Result<&mut Board> {
        let len = self.boards.len();
        self.boards
            .get_mut(board)
            .ok_or_else(|| TaskboardError::out_of_range("board", board, len))
    }

    fn list_mut(&mut self, board: usize, list: usize) -> Result<&mut List> {
        let lists = &mut self.board_mut(board)?.lists;
        let len = lists.len();
        lists
            .get_mut(list)
            .ok_or_else(|| TaskboardError::out_of_range("list", list, len))
    }

    fn card_mut(&mut self, address: CardAddress) -> Result<&mut Card> {
        let cards = &mut self.list_mut(address.board, address.list)?.cards;
        let len = cards.len();
        cards
            .get_mut(address.card)
            .ok_or_else(|| TaskboardError::out_of_range("card", address.card, len))
    }

    /// Runs a content edit on one card, then bumps the revision and logs it
    fn edit_card<R>(
        &mut self,
        address: CardAddress,
        what: &'static str,
        edit: impl FnOnce(&mut Card) -> Result<R>,
    ) -> Result<R> {
        let value = edit(self.card_mut(address)?)?;
        self.touch();
        debug!(
            board = address.board,
            list = address.list,
            card = address.card,
            edit = what,
            "edited card"
        );
        Ok(value)
    }

    // ---- boards ----

    /// Appends a new empty board and returns its index
    pub fn create_board(&mut self, name: &str) -> Result<usize> {
        let name = non_blank("board name", name)?;
        info!(name = %name, "created board");
        self.boards.push(Board::new(name));
        self.touch();
        Ok(self.boards.len() - 1)
    }

    /// Removes a board, refusing to remove the only one left
    pub fn delete_board(&mut self, board: usize) -> Result<DeletionImpact> {
        self.board(board)?;
        if self.boards.len() == 1 {
            return Err(TaskboardError::LastBoard);
        }

        let removed = self.boards.remove(board);
        self.reindex();
        self.touch();
        info!(name = %removed.name, "deleted board");
        Ok(DeletionImpact {
            lists: removed.lists.len(),
            cards: removed.card_count(),
        })
    }

    /// Counts what deleting a board would remove, without deleting it
    pub fn board_impact(&self, board: usize) -> Result<DeletionImpact> {
        let board = self.board(board)?;
        Ok(DeletionImpact {
            lists: board.lists.len(),
            cards: board.card_count(),
        })
    }

    pub fn rename_board(&mut self, board: usize, name: &str) -> Result<()> {
        let name = non_blank("board name", name)?;
        self.board_mut(board)?.name = name;
        self.touch();
        debug!(board, "renamed board");
        Ok(())
    }

    /// Inserts an independent deep copy right after the source and returns its index
    pub fn duplicate_board(&mut self, board: usize, new_name: &str) -> Result<usize> {
        let name = non_blank("board name", new_name)?;
        let copy = self.board(board)?.duplicate(name);
        self.boards.insert(board + 1, copy);
        self.reindex();
        self.touch();
        info!(source = board, "duplicated board");
        Ok(board + 1)
    }

    /// Sets the encoded background image; an empty string clears it
    pub fn set_board_background(&mut self, board: usize, background: String) -> Result<()> {
        self.board_mut(board)?.background = background;
        self.touch();
        debug!(board, "updated board background");
        Ok(())
    }

    // ---- lists ----

    pub fn create_list(&mut self, board: usize, name: &str) -> Result<usize> {
        let name = non_blank("list name", name)?;
        let lists = &mut self.board_mut(board)?.lists;
        lists.push(List::new(name));
        let index = lists.len() - 1;
        self.touch();
        debug!(board, list = index, "created list");
        Ok(index)
    }

    pub fn rename_list(&mut self, board: usize, list: usize, name: &str) -> Result<()> {
        let name = non_blank("list name", name)?;
        self.list_mut(board, list)?.name = name;
        self.touch();
        debug!(board, list, "renamed list");
        Ok(())
    }

    pub fn delete_list(&mut self, board: usize, list: usize) -> Result<DeletionImpact> {
        self.list(board, list)?;
        let removed = self.boards[board].lists.remove(list);
        self.reindex();
        self.touch();
        debug!(board, list, cards = removed.cards.len(), "deleted list");
        Ok(DeletionImpact {
            lists: 0,
            cards: removed.cards.len(),
        })
    }

    pub fn list_impact(&self, board: usize, list: usize) -> Result<DeletionImpact> {
        Ok(DeletionImpact {
            lists: 0,
            cards: self.list(board, list)?.cards.len(),
        })
    }

    pub fn set_list_background_color(
        &mut self,
        board: usize,
        list: usize,
        color: Option<String>,
    ) -> Result<()> {
        self.list_mut(board, list)?.background_color = color;
        self.touch();
        debug!(board, list, "updated list color");
        Ok(())
    }

    /// Repositions a list within its board
    pub fn move_list(&mut self, board: usize, from: usize, target: DropTarget) -> Result<MoveOutcome> {
        let lists = &mut self.board_mut(board)?.lists;
        let nominal = target.nominal_position(lists.len())?;
        let outcome = reorder::move_element(lists, from, nominal)?;
        if let MoveOutcome::Moved { to } = outcome {
            self.reindex();
            self.touch();
            debug!(board, from, to, "moved list");
        }
        Ok(outcome)
    }

    // ---- cards ----

    pub fn create_card(&mut self, board: usize, list: usize, title: &str) -> Result<CardAddress> {
        let title = non_blank("card title", title)?;
        let card = Card::new(title);
        let id = card.id;
        let cards = &mut self.list_mut(board, list)?.cards;
        cards.push(card);
        let address = CardAddress::new(board, list, cards.len() - 1);
        self.card_index.insert(id, address);
        self.touch();
        debug!(board, list, card = address.card, "created card");
        Ok(address)
    }

    /// Removes a card and hands it back
    pub fn delete_card(&mut self, address: CardAddress) -> Result<Card> {
        self.card(address)?;
        let removed = self.boards[address.board].lists[address.list]
            .cards
            .remove(address.card);
        self.reindex();
        self.touch();
        debug!(board = address.board, list = address.list, card = address.card, "deleted card");
        Ok(removed)
    }

    pub fn rename_card(&mut self, address: CardAddress, title: &str) -> Result<()> {
        self.edit_card(address, "title", |card| card.rename(title))
    }

    pub fn set_card_description(&mut self, address: CardAddress, description: String) -> Result<()> {
        self.edit_card(address, "description", |card| {
            card.set_description(description);
            Ok(())
        })
    }

    /// Flips completion and returns the new state
    pub fn toggle_card_completion(&mut self, address: CardAddress) -> Result<bool> {
        self.edit_card(address, "completion", |card| Ok(card.toggle_completed()))
    }

    pub fn set_card_background_color(
        &mut self,
        address: CardAddress,
        color: Option<String>,
    ) -> Result<()> {
        self.edit_card(address, "background color", |card| {
            card.set_background_color(color);
            Ok(())
        })
    }

    pub fn set_card_labels<I, S>(&mut self, address: CardAddress, labels: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edit_card(address, "labels", |card| {
            card.set_labels(labels);
            Ok(())
        })
    }

    /// Overwrites the card at `address` with `card`, keeping the stored id
    pub(crate) fn write_card(&mut self, address: CardAddress, card: Card) -> Result<()> {
        self.edit_card(address, "session commit", |slot| {
            *slot = Card { id: slot.id, ..card };
            Ok(())
        })
    }

    /// Moves a card within its list or into another list of the same board.
    ///
    /// The drop target is interpreted against the destination list as it
    /// looked before the move.
    pub fn move_card(
        &mut self,
        board: usize,
        from_list: usize,
        from_card: usize,
        to_list: usize,
        target: DropTarget,
    ) -> Result<MoveOutcome> {
        let destination_len = self.list(board, to_list)?.cards.len();
        self.card(CardAddress::new(board, from_list, from_card))?;
        let nominal = target.nominal_position(destination_len)?;

        let lists = &mut self.boards[board].lists;
        let outcome = if from_list == to_list {
            reorder::move_element(&mut lists[from_list].cards, from_card, nominal)?
        } else {
            let (source, destination) = pair_mut(lists, from_list, to_list);
            reorder::transfer_element(&mut source.cards, from_card, &mut destination.cards, nominal)?
        };

        if let MoveOutcome::Moved { to } = outcome {
            self.reindex();
            self.touch();
            debug!(board, from_list, from_card, to_list, to, "moved card");
        }
        Ok(outcome)
    }

    // ---- checklists ----

    pub fn add_checklist(&mut self, address: CardAddress, name: &str) -> Result<usize> {
        self.edit_card(address, "add checklist", |card| Ok(card.add_checklist(name)))
    }

    pub fn rename_checklist(&mut self, address: CardAddress, checklist: usize, name: &str) -> Result<()> {
        self.edit_card(address, "rename checklist", |card| {
            card.rename_checklist(checklist, name)
        })
    }

    pub fn delete_checklist(&mut self, address: CardAddress, checklist: usize) -> Result<()> {
        self.edit_card(address, "delete checklist", |card| {
            card.delete_checklist(checklist).map(|_| ())
        })
    }

    pub fn add_checklist_item(&mut self, address: CardAddress, checklist: usize, text: &str) -> Result<usize> {
        self.edit_card(address, "add checklist item", |card| {
            card.add_checklist_item(checklist, text)
        })
    }

    pub fn rename_checklist_item(
        &mut self,
        address: CardAddress,
        checklist: usize,
        item: usize,
        text: &str,
    ) -> Result<()> {
        self.edit_card(address, "rename checklist item", |card| {
            card.rename_checklist_item(checklist, item, text)
        })
    }

    pub fn delete_checklist_item(&mut self, address: CardAddress, checklist: usize, item: usize) -> Result<()> {
        self.edit_card(address, "delete checklist item", |card| {
            card.delete_checklist_item(checklist, item).map(|_| ())
        })
    }

    pub fn toggle_checklist_item(&mut self, address: CardAddress, checklist: usize, item: usize) -> Result<bool> {
        self.edit_card(address, "toggle checklist item", |card| {
            card.toggle_checklist_item(checklist, item)
        })
    }
}

impl Default for EntityStore {
    /// One empty board, the state a fresh workspace starts in
    fn default() -> Self {
        Self::from_boards(vec![Board::new(DEFAULT_BOARD_NAME.to_string())])
    }
}

impl PartialEq for EntityStore {
    fn eq(&self, other: &Self) -> bool {
        self.boards == other.boards
    }
}

fn dedupe_labels(boards: &mut [Board]) {
    for card in boards
        .iter_mut()
        .flat_map(|board| board.lists.iter_mut())
        .flat_map(|list| list.cards.iter_mut())
    {
        card.dedupe_labels();
    }
}

/// Two distinct mutable elements of one slice
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
