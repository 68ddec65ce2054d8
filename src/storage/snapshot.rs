//! Snapshot export/import.
//!
//! An exported snapshot is a self-describing JSON document carrying the
//! whole board tree, the settings, a format version and the export time.
//! Import checks the document's shape before anything is deserialized, so a
//! bad backup is rejected with the path of the first offending value and the
//! live workspace is never touched.

use crate::{
    config::{Settings, FORMAT_VERSION},
    domain::{Board, EntityStore},
    error::{Result, TaskboardError},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    format_version: u32,
    exported_at: DateTime<Utc>,
    settings: &'a Settings,
    boards: &'a [Board],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDocument {
    #[serde(default)]
    exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    settings: Settings,
    boards: Vec<Board>,
}

/// A validated, fully owned import result
#[derive(Debug, Clone)]
pub struct ImportedSnapshot {
    pub format_version: u32,
    pub exported_at: Option<DateTime<Utc>>,
    pub settings: Settings,
    pub store: EntityStore,
}

/// Exports the store and settings stamped with the current time
pub fn export_snapshot(store: &EntityStore, settings: &Settings) -> Result<Vec<u8>> {
    export_snapshot_at(store, settings, Utc::now())
}

/// Exports the store and settings stamped with `exported_at`
pub fn export_snapshot_at(
    store: &EntityStore,
    settings: &Settings,
    exported_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let snapshot = SnapshotRef {
        format_version: FORMAT_VERSION,
        exported_at,
        settings,
        boards: store.boards(),
    };
    let bytes = serde_json::to_vec_pretty(&snapshot)?;
    info!(boards = store.board_count(), bytes = bytes.len(), "exported snapshot");
    Ok(bytes)
}

/// Parses and validates a snapshot payload
pub fn import_snapshot(payload: &[u8]) -> Result<ImportedSnapshot> {
    let root: Value = serde_json::from_slice(payload)
        .map_err(|e| TaskboardError::malformed("$", format!("not valid JSON ({})", e)))?;

    let format_version = check_version(&root)?;
    validate_document(&root)?;

    let document: SnapshotDocument = serde_json::from_value(root)
        .map_err(|e| TaskboardError::malformed("$", e))?;

    let store = EntityStore::from_boards(document.boards);
    if store.board_count() == 0 {
        return Err(TaskboardError::malformed("boards", "backup contains no boards"));
    }
    info!(boards = store.board_count(), format_version, "imported snapshot");

    Ok(ImportedSnapshot {
        format_version,
        exported_at: document.exported_at,
        settings: document.settings,
        store,
    })
}

fn check_version(root: &Value) -> Result<u32> {
    let object = expect_object(root, "$")?;
    let Some(version) = object.get("formatVersion") else {
        // Backups written before versioning carry no marker.
        return Ok(1);
    };

    let found = match (version.as_i64(), version.as_u64()) {
        (Some(v), _) => v,
        (None, Some(_)) => i64::MAX,
        (None, None) => {
            return Err(TaskboardError::malformed("formatVersion", "expected an integer"))
        }
    };

    if found < 1 || found > i64::from(FORMAT_VERSION) {
        return Err(TaskboardError::VersionMismatch {
            found,
            supported: FORMAT_VERSION,
        });
    }
    Ok(found as u32)
}

fn validate_document(root: &Value) -> Result<()> {
    let object = expect_object(root, "$")?;

    if let Some(exported_at) = object.get("exportedAt") {
        let valid = exported_at.is_null()
            || exported_at
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok());
        if !valid {
            return Err(TaskboardError::malformed("exportedAt", "expected an RFC 3339 timestamp"));
        }
    }

    if let Some(settings) = object.get("settings") {
        let settings = expect_object(settings, "settings")?;
        if let Some(last) = settings.get("lastOpenBoard") {
            if last.as_u64().is_none() {
                return Err(TaskboardError::malformed(
                    "settings.lastOpenBoard",
                    "expected a non-negative integer",
                ));
            }
        }
    }

    let boards = required_array(object, "boards", "")?;
    for (b, board) in boards.iter().enumerate() {
        let path = format!("boards[{}]", b);
        let board = expect_object(board, &path)?;
        required_string(board, "name", &path)?;
        optional_field(board, "background", &path, Kind::String)?;

        for (l, list) in required_array(board, "lists", &path)?.iter().enumerate() {
            let path = format!("{}.lists[{}]", path, l);
            let list = expect_object(list, &path)?;
            required_string(list, "name", &path)?;
            optional_field(list, "backgroundColor", &path, Kind::NullableString)?;

            for (c, card) in required_array(list, "cards", &path)?.iter().enumerate() {
                validate_card(card, &format!("{}.cards[{}]", path, c))?;
            }
        }
    }
    Ok(())
}

fn validate_card(card: &Value, path: &str) -> Result<()> {
    let card = expect_object(card, path)?;
    required_string(card, "title", path)?;
    optional_field(card, "description", path, Kind::String)?;
    optional_field(card, "backgroundColor", path, Kind::NullableString)?;
    optional_field(card, "completed", path, Kind::Bool)?;

    if let Some(labels) = card.get("labels") {
        let labels_path = format!("{}.labels", path);
        let labels = labels
            .as_array()
            .ok_or_else(|| TaskboardError::malformed(&labels_path, "expected an array"))?;
        for (i, label) in labels.iter().enumerate() {
            if !label.is_string() {
                return Err(TaskboardError::malformed(
                    &format!("{}[{}]", labels_path, i),
                    "expected a color token string",
                ));
            }
        }
    }

    let Some(checklists) = card.get("checklists") else {
        return Ok(());
    };
    let checklists_path = format!("{}.checklists", path);
    let checklists = checklists
        .as_array()
        .ok_or_else(|| TaskboardError::malformed(&checklists_path, "expected an array"))?;

    for (c, checklist) in checklists.iter().enumerate() {
        let path = format!("{}[{}]", checklists_path, c);
        let checklist = expect_object(checklist, &path)?;
        required_string(checklist, "name", &path)?;

        for (i, item) in required_array(checklist, "items", &path)?.iter().enumerate() {
            let path = format!("{}.items[{}]", path, i);
            let item = expect_object(item, &path)?;
            required_string(item, "text", &path)?;
            optional_field(item, "completed", &path, Kind::Bool)?;
        }
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Kind {
    String,
    NullableString,
    Bool,
}

impl Kind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::NullableString => value.is_string() || value.is_null(),
            Kind::Bool => value.is_boolean(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Kind::String => "expected a string",
            Kind::NullableString => "expected a string or null",
            Kind::Bool => "expected a boolean",
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| TaskboardError::malformed(path, "expected an object"))
}

fn required_array<'a>(object: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Vec<Value>> {
    let path = join(path, key);
    object
        .get(key)
        .ok_or_else(|| TaskboardError::malformed(&path, "missing required field"))?
        .as_array()
        .ok_or_else(|| TaskboardError::malformed(&path, "expected an array"))
}

fn required_string(object: &Map<String, Value>, key: &str, path: &str) -> Result<()> {
    let path = join(path, key);
    match object.get(key) {
        None => Err(TaskboardError::malformed(&path, "missing required field")),
        Some(value) if !value.is_string() => Err(TaskboardError::malformed(&path, "expected a string")),
        Some(_) => Ok(()),
    }
}

fn optional_field(object: &Map<String, Value>, key: &str, path: &str, kind: Kind) -> Result<()> {
    match object.get(key) {
        Some(value) if !kind.matches(value) => {
            Err(TaskboardError::malformed(&join(path, key), kind.describe()))
        }
        _ => Ok(()),
    }
}

/// Entity counts and serialized size of a board tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageUsage {
    pub boards: usize,
    pub lists: usize,
    pub cards: usize,
    pub checklists: usize,
    pub items: usize,
    /// Size of the persisted boards record
    pub bytes: u64,
}

impl StorageUsage {
    pub fn measure(store: &EntityStore) -> Result<Self> {
        let mut usage = StorageUsage {
            boards: store.board_count(),
            bytes: serde_json::to_vec(store.boards())?.len() as u64,
            ..Default::default()
        };
        for board in store.boards() {
            usage.lists += board.lists.len();
            for list in &board.lists {
                usage.cards += list.cards.len();
                for card in &list.cards {
                    usage.checklists += card.checklist_count();
                    usage.items += card.item_count();
                }
            }
        }
        Ok(usage)
    }

    /// Share of `quota` in use, 0.0..=1.0 and beyond when over quota
    pub fn quota_fraction(&self, quota: u64) -> f64 {
        if quota == 0 {
            return 0.0;
        }
        self.bytes as f64 / quota as f64
    }
}
