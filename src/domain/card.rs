use crate::error::{Result, TaskboardError};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name given to a checklist created without one
pub const DEFAULT_CHECKLIST_NAME: &str = "Checklist";

/// Surrogate identity for a card.
///
/// Never serialized: every load or import assigns fresh ids, so two live cards
/// can never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardId(Uuid);

impl CardId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completed/total counter for checklist items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// Completion percentage, 0 when there is nothing to complete
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

impl std::ops::Add for Progress {
    type Output = Progress;

    fn add(self, rhs: Progress) -> Progress {
        Progress::new(self.completed + rhs.completed, self.total + rhs.total)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl ChecklistItem {
    pub fn new(text: String) -> Self {
        Self {
            text,
            completed: false,
        }
    }

    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub name: String,
    pub items: Vec<ChecklistItem>,
}

impl Checklist {
    /// Creates an empty checklist; a blank name falls back to the default
    pub fn new(name: &str) -> Self {
        let name = name.trim();
        Self {
            name: if name.is_empty() {
                DEFAULT_CHECKLIST_NAME.to_string()
            } else {
                name.to_string()
            },
            items: Vec::new(),
        }
    }

    pub fn progress(&self) -> Progress {
        let completed = self.items.iter().filter(|item| item.completed).count();
        Progress::new(completed, self.items.len())
    }
}

/// A task card
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(skip)]
    pub id: CardId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub checklists: Vec<Checklist>,
}

impl Card {
    pub fn new(title: String) -> Self {
        Self {
            id: CardId::new(),
            title,
            description: String::new(),
            labels: Vec::new(),
            background_color: None,
            completed: false,
            checklists: Vec::new(),
        }
    }

    /// Replaces the label set, dropping duplicate tokens while keeping first-seen order
    pub fn set_labels<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if !unique.contains(&label) {
                unique.push(label);
            }
        }
        self.labels = unique;
    }

    /// Aggregated progress over every checklist on the card
    pub fn progress(&self) -> Progress {
        self.checklists
            .iter()
            .map(Checklist::progress)
            .fold(Progress::default(), |acc, p| acc + p)
    }

    /// The "c/t" badge shown on the card face, only when it has checklist items
    pub fn progress_badge(&self) -> Option<Progress> {
        let progress = self.progress();
        (progress.total > 0).then_some(progress)
    }

    /// Deep copy carrying a fresh surrogate id
    pub fn duplicate(&self) -> Self {
        Self {
            id: CardId::new(),
            ..self.clone()
        }
    }

    pub fn rename(&mut self, title: &str) -> Result<()> {
        self.title = non_blank("card title", title)?;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_background_color(&mut self, color: Option<String>) {
        self.background_color = color;
    }

    /// Flips completion and returns the new state
    pub fn toggle_completed(&mut self) -> bool {
        self.completed = !self.completed;
        self.completed
    }

    /// Drops repeated label tokens, e.g. from a hand-edited backup
    pub(crate) fn dedupe_labels(&mut self) {
        let labels = std::mem::take(&mut self.labels);
        self.set_labels(labels);
    }

    /// Appends a checklist and returns its index
    pub fn add_checklist(&mut self, name: &str) -> usize {
        self.checklists.push(Checklist::new(name));
        self.checklists.len() - 1
    }

    pub fn rename_checklist(&mut self, checklist: usize, name: &str) -> Result<()> {
        let name = non_blank("checklist name", name)?;
        self.checklist_mut(checklist)?.name = name;
        Ok(())
    }

    pub fn delete_checklist(&mut self, checklist: usize) -> Result<Checklist> {
        self.checklist_mut(checklist)?;
        Ok(self.checklists.remove(checklist))
    }

    /// Appends an item to a checklist and returns the item index
    pub fn add_checklist_item(&mut self, checklist: usize, text: &str) -> Result<usize> {
        let text = non_blank("item text", text)?;
        let items = &mut self.checklist_mut(checklist)?.items;
        items.push(ChecklistItem::new(text));
        Ok(items.len() - 1)
    }

    pub fn rename_checklist_item(&mut self, checklist: usize, item: usize, text: &str) -> Result<()> {
        let text = non_blank("item text", text)?;
        self.item_mut(checklist, item)?.text = text;
        Ok(())
    }

    pub fn delete_checklist_item(&mut self, checklist: usize, item: usize) -> Result<ChecklistItem> {
        self.item_mut(checklist, item)?;
        Ok(self.checklists[checklist].items.remove(item))
    }

    /// Flips an item's completion and returns the new state
    pub fn toggle_checklist_item(&mut self, checklist: usize, item: usize) -> Result<bool> {
        let item = self.item_mut(checklist, item)?;
        item.toggle();
        Ok(item.completed)
    }

    fn checklist_mut(&mut self, checklist: usize) -> Result<&mut Checklist> {
        let len = self.checklists.len();
        self.checklists
            .get_mut(checklist)
            .ok_or_else(|| TaskboardError::out_of_range("checklist", checklist, len))
    }

    fn item_mut(&mut self, checklist: usize, item: usize) -> Result<&mut ChecklistItem> {
        let items = &mut self.checklist_mut(checklist)?.items;
        let len = items.len();
        items
            .get_mut(item)
            .ok_or_else(|| TaskboardError::out_of_range("checklist item", item, len))
    }

    pub fn checklist_count(&self) -> usize {
        self.checklists.len()
    }

    pub fn item_count(&self) -> usize {
        self.checklists.iter().map(|c| c.items.len()).sum()
    }
}

/// Trims `value`, rejecting it when nothing is left
pub(crate) fn non_blank(what: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(TaskboardError::Validation(format!("{} must not be blank", what)))
    } else {
        Ok(trimmed.to_string())
    }
}

// Content equality: the surrogate id is not part of a card's value.
impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.description == other.description
            && self.labels == other.labels
            && self.background_color == other.background_color
            && self.completed == other.completed
            && self.checklists == other.checklists
    }
}

impl Eq for Card {}
