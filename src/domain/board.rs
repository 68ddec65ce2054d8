use crate::domain::card::Card;
use serde::{Deserialize, Serialize};

/// An ordered column of cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub name: String,
    #[serde(default)]
    pub background_color: Option<String>,
    pub cards: Vec<Card>,
}

impl List {
    pub fn new(name: String) -> Self {
        Self {
            name,
            background_color: None,
            cards: Vec::new(),
        }
    }

    /// Deep copy with fresh card ids
    pub fn duplicate(&self) -> Self {
        Self {
            name: self.name.clone(),
            background_color: self.background_color.clone(),
            cards: self.cards.iter().map(Card::duplicate).collect(),
        }
    }
}

/// Top-level container of lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub name: String,
    /// Encoded image reference (typically a data URL); empty when unset
    #[serde(default)]
    pub background: String,
    pub lists: Vec<List>,
}

impl Board {
    pub fn new(name: String) -> Self {
        Self {
            name,
            background: String::new(),
            lists: Vec::new(),
        }
    }

    /// Independent deep copy under a new name
    pub fn duplicate(&self, name: String) -> Self {
        Self {
            name,
            background: self.background.clone(),
            lists: self.lists.iter().map(List::duplicate).collect(),
        }
    }

    pub fn card_count(&self) -> usize {
        self.lists.iter().map(|l| l.cards.len()).sum()
    }

    pub fn has_background(&self) -> bool {
        !self.background.is_empty()
    }

    pub fn summary(&self) -> BoardSummary {
        BoardSummary {
            name: self.name.clone(),
            has_background: self.has_background(),
            lists: self.lists.len(),
            cards: self.card_count(),
        }
    }
}

/// Overview entry for a board in the workspace grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSummary {
    pub name: String,
    pub has_background: bool,
    pub lists: usize,
    pub cards: usize,
}

/// Descendants removed by a delete, used for confirmation messaging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionImpact {
    pub lists: usize,
    pub cards: usize,
}

impl DeletionImpact {
    /// Builds the confirmation prompt shown before deleting `kind` named `name`
    pub fn confirmation_message(&self, kind: &str, name: &str) -> String {
        let mut message = format!("Are you sure you want to delete the {} \"{}\"?", kind, name);
        let mut parts = Vec::new();
        if self.lists > 0 {
            parts.push(plural(self.lists, "list"));
        }
        if self.cards > 0 {
            parts.push(plural(self.cards, "card"));
        }
        if !parts.is_empty() {
            message.push_str(&format!(
                "\n\nThis will permanently delete {}.",
                parts.join(" and ")
            ));
        }
        message
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
