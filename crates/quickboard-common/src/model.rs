use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Identifiers ───────────────────────────────────────────────────────

/// Opaque column identifier. Fresh ids are UUID v4; seeded columns use `col-N`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(String);

/// Opaque item identifier, generated once at creation time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

macro_rules! opaque_id {
    ($name:ident) => {
        impl $name {
            /// Generate a fresh, globally unique id.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(ColumnId);
opaque_id!(ItemId);

// ── Tag / Status ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tag {
    Meeting,
    Urgent,
    Idea,
    #[default]
    General,
}

impl Tag {
    pub const ALL: [Tag; 4] = [Tag::Meeting, Tag::Urgent, Tag::Idea, Tag::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meeting => "Meeting",
            Self::Urgent => "Urgent",
            Self::Idea => "Idea",
            Self::General => "General",
        }
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid tag: {}", s))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    /// Two-state completion toggle laid over the three-state field:
    /// `completed` goes back to `pending`, anything else becomes `completed`.
    pub fn toggled(self) -> Self {
        match self {
            Self::Completed => Self::Pending,
            Self::Pending | Self::InProgress => Self::Completed,
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in-progress" | "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Documents ─────────────────────────────────────────────────────────

/// A single card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub content: String,
    pub tag: Tag,
    /// Records written before status existed come back as `pending`.
    #[serde(default)]
    pub status: Status,
    pub created_at: String,
}

impl Item {
    /// A fresh card: pending, tagged General, no content, dated today.
    pub fn new(title: &str) -> Self {
        Self {
            id: ItemId::generate(),
            title: title.to_string(),
            content: String::new(),
            tag: Tag::General,
            status: Status::Pending,
            created_at: today(),
        }
    }

    /// Case-insensitive match against title, content and tag.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&query)
            || self.content.to_lowercase().contains(&query)
            || self.tag.as_str().to_lowercase().contains(&query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    pub items: Vec<Item>,
}

impl Column {
    pub fn new(id: ColumnId, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            items: Vec::new(),
        }
    }
}

/// The whole board document, persisted and transmitted as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub columns: BTreeMap<ColumnId, Column>,
    pub column_order: Vec<ColumnId>,
}

/// Titles of the columns every new board starts with.
pub const SEED_COLUMNS: [&str; 3] = ["To Do", "Doing", "Done"];

impl Board {
    /// The canonical default board created once per user.
    pub fn seed() -> Self {
        let mut columns = BTreeMap::new();
        let mut column_order = Vec::with_capacity(SEED_COLUMNS.len());
        for (i, title) in SEED_COLUMNS.iter().enumerate() {
            let id = ColumnId::from(format!("col-{}", i + 1));
            columns.insert(id.clone(), Column::new(id.clone(), title));
            column_order.push(id);
        }
        Self {
            columns,
            column_order,
        }
    }

    pub fn item_count(&self) -> usize {
        self.columns.values().map(|c| c.items.len()).sum()
    }

    /// Columns in display order.
    pub fn ordered_columns(&self) -> impl Iterator<Item = &Column> {
        self.column_order.iter().filter_map(|id| self.columns.get(id))
    }

    /// Check the structural invariants: `columnOrder` is a duplicate-free
    /// permutation of the column keys, every column's `id` matches its key,
    /// and no item id appears twice.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        for id in &self.column_order {
            if !seen.insert(id) {
                return Err(ModelError::DuplicateColumnOrder(id.clone()));
            }
            if !self.columns.contains_key(id) {
                return Err(ModelError::UnknownColumnInOrder(id.clone()));
            }
        }
        for (key, column) in &self.columns {
            if !seen.contains(key) {
                return Err(ModelError::ColumnNotOrdered(key.clone()));
            }
            if &column.id != key {
                return Err(ModelError::ColumnKeyMismatch {
                    key: key.clone(),
                    id: column.id.clone(),
                });
            }
        }
        let mut items = HashSet::new();
        for column in self.columns.values() {
            for item in &column.items {
                if !items.insert(&item.id) {
                    return Err(ModelError::DuplicateItem(item.id.clone()));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Column {0} appears more than once in columnOrder")]
    DuplicateColumnOrder(ColumnId),

    #[error("columnOrder references unknown column {0}")]
    UnknownColumnInOrder(ColumnId),

    #[error("Column {0} is missing from columnOrder")]
    ColumnNotOrdered(ColumnId),

    #[error("Column stored under key {key} carries id {id}")]
    ColumnKeyMismatch { key: ColumnId, id: ColumnId },

    #[error("Item {0} appears in more than one place")]
    DuplicateItem(ItemId),
}

/// Current local date as `M/D/YYYY`.
pub fn today() -> String {
    chrono::Local::now().format("%-m/%-d/%Y").to_string()
}
