//! Catalog loading and validation.
//!
//! The three export files are parsed in parallel with Rayon, then checked
//! for integrity before anything downstream sees them.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

pub const ITEMS_FILE: &str = "items.csv";
pub const USERS_FILE: &str = "users.csv";
pub const INTERACTIONS_FILE: &str = "interactions.csv";

impl Catalog {
    /// Load the catalog from a directory holding `items.csv`, `users.csv`
    /// and `interactions.csv`.
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        info!("Loading catalog from {:?}", data_dir);

        let items_path = data_dir.join(ITEMS_FILE);
        let users_path = data_dir.join(USERS_FILE);
        let interactions_path = data_dir.join(INTERACTIONS_FILE);

        // Three-way parallel parse: (items, users) alongside interactions
        let ((items, users), interactions) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_items(&items_path),
                    || parser::parse_users(&users_path),
                )
            },
            || parser::parse_interactions(&interactions_path),
        );

        let catalog = Catalog::new(items?, users?, interactions?);
        let (n_items, n_users, n_interactions) = catalog.counts();
        info!(
            "Loaded {} items, {} users, {} interactions",
            n_items, n_users, n_interactions
        );

        catalog.validate()?;
        Ok(catalog)
    }

    /// Check table integrity.
    ///
    /// Duplicate item or user ids are fatal. Interactions pointing at items
    /// missing from the item table are tolerated (they still train the id
    /// space) but reported.
    pub fn validate(&self) -> Result<()> {
        let mut item_ids = HashSet::with_capacity(self.items.len());
        for item in self.items.items() {
            if !item_ids.insert(item.id) {
                return Err(DataLoadError::DuplicateId {
                    entity: "item".to_string(),
                    id: item.id,
                });
            }
        }

        let mut user_ids = HashSet::with_capacity(self.users.len());
        for user in self.users.users() {
            if !user_ids.insert(user.id) {
                return Err(DataLoadError::DuplicateId {
                    entity: "user".to_string(),
                    id: user.id,
                });
            }
        }

        let orphans = self
            .interactions
            .rows()
            .iter()
            .filter(|row| !item_ids.contains(&row.item_id))
            .count();
        if orphans > 0 {
            warn!("{} interactions reference items without metadata", orphans);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn interaction(user_id: UserId, item_id: ItemId) -> RawInteraction {
        RawInteraction {
            user_id,
            item_id,
            last_watch_dt: NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
            watched_pct: 50.0,
        }
    }

    #[test]
    fn test_validate_rejects_duplicate_items() {
        let catalog = Catalog::new(
            ItemTable::from_items(vec![Item::new(1, "A"), Item::new(1, "B")]),
            UserTable::default(),
            InteractionTable::default(),
        );
        let err = catalog.validate().unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateId { id: 1, .. }));
    }

    #[test]
    fn test_validate_tolerates_orphan_interactions() {
        let catalog = Catalog::new(
            ItemTable::from_items(vec![Item::new(1, "A")]),
            UserTable::from_users(vec![User::new(7)]),
            InteractionTable::new(vec![interaction(7, 1), interaction(7, 99)]),
        );
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_load_from_dir_missing_files() {
        let err = Catalog::load_from_dir(Path::new("/nonexistent/catalog")).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }
}
