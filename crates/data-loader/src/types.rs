//! Core domain types for the movie catalog.
//!
//! The recommender consumes three column-oriented tables:
//! - items (movies): id, title and categorical attributes
//! - users: id and categorical attributes
//! - interactions: who watched what, when, and how much of it
//!
//! Each table keeps the list of columns it was built with so that
//! downstream stages can tell "column absent" apart from "cell empty".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for an item (movie)
pub type ItemId = u32;

// =============================================================================
// Well-known column names
// =============================================================================

pub const ITEM_ID_COLUMN: &str = "item_id";
pub const USER_ID_COLUMN: &str = "user_id";
pub const TITLE_COLUMN: &str = "title";
pub const WATCHED_PCT_COLUMN: &str = "watched_pct";

/// Name of the interaction timestamp column. Fixed across the whole system.
pub const DATETIME_COLUMN: &str = "last_watch_dt";

// =============================================================================
// Rows
// =============================================================================

/// A movie with its display title and categorical attributes
/// (directors, studios, genres, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    /// Non-empty attribute cells keyed by column name
    pub attributes: BTreeMap<String, String>,
}

impl Item {
    pub fn new(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter, mostly handy in tests
    pub fn with_attribute(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(column.into(), value.into());
        self
    }

    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes.get(column).map(|s| s.as_str())
    }
}

/// A user with optional categorical attributes (age bucket, income, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub attributes: BTreeMap<String, String>,
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(column.into(), value.into());
        self
    }

    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes.get(column).map(|s| s.as_str())
    }
}

/// One viewing event as it comes from the batch export.
///
/// The interaction weight is not stored here; it is derived from
/// `watched_pct` when the training dataset is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawInteraction {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub last_watch_dt: NaiveDate,
    /// Share of the movie watched, 0..=100
    pub watched_pct: f32,
}

// =============================================================================
// Tables
// =============================================================================

/// Items keyed by id, plus the header they were read with
#[derive(Debug, Clone, Default)]
pub struct ItemTable {
    columns: Vec<String>,
    items: Vec<Item>,
}

impl ItemTable {
    pub fn new(columns: Vec<String>, items: Vec<Item>) -> Self {
        Self { columns, items }
    }

    /// Build a table whose header is inferred from the rows:
    /// id, title, then every attribute name seen (sorted).
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut columns = vec![ITEM_ID_COLUMN.to_string(), TITLE_COLUMN.to_string()];
        columns.extend(attribute_columns(items.iter().map(|i| &i.attributes)));
        Self { columns, items }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Map from item id to title, borrowing from the table
    pub fn titles(&self) -> HashMap<ItemId, &str> {
        self.items
            .iter()
            .map(|item| (item.id, item.title.as_str()))
            .collect()
    }
}

/// Users keyed by id, plus the header they were read with
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    columns: Vec<String>,
    users: Vec<User>,
}

impl UserTable {
    pub fn new(columns: Vec<String>, users: Vec<User>) -> Self {
        Self { columns, users }
    }

    pub fn from_users(users: Vec<User>) -> Self {
        let mut columns = vec![USER_ID_COLUMN.to_string()];
        columns.extend(attribute_columns(users.iter().map(|u| &u.attributes)));
        Self { columns, users }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// The interaction log
#[derive(Debug, Clone, Default)]
pub struct InteractionTable {
    rows: Vec<RawInteraction>,
}

impl InteractionTable {
    pub fn new(rows: Vec<RawInteraction>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[RawInteraction] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn attribute_columns<'a>(
    rows: impl Iterator<Item = &'a BTreeMap<String, String>>,
) -> Vec<String> {
    let mut names: Vec<String> = rows.flat_map(|attrs| attrs.keys().cloned()).collect();
    names.sort();
    names.dedup();
    names
}

// =============================================================================
// Catalog - everything the recommender needs at construction time
// =============================================================================

/// The three input tables bundled together.
///
/// Loaded once at startup (see `Catalog::load_from_dir`) and then only read.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub items: ItemTable,
    pub users: UserTable,
    pub interactions: InteractionTable,
}

impl Catalog {
    pub fn new(items: ItemTable, users: UserTable, interactions: InteractionTable) -> Self {
        Self {
            items,
            users,
            interactions,
        }
    }

    /// Get counts for debugging/validation: (items, users, interactions)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.items.len(), self.users.len(), self.interactions.len())
    }

    /// Case-insensitive substring search over item titles, in table order
    pub fn search_titles(&self, query: &str) -> Vec<&Item> {
        let needle = query.to_lowercase();
        self.items
            .items()
            .iter()
            .filter(|item| item.title.to_lowercase().contains(&needle))
            .collect()
    }
}
