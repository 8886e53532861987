//! Categorical feature preparation.
//!
//! Turns the raw item and user tables into long-format feature tables
//! (`id, feature, value`) for the dataset builder. High-cardinality item
//! columns such as directors or studios are capped to their top-K most
//! frequent values; everything else collapses into a shared "other" bucket.

use data_loader::{ItemTable, UserTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::error::PipelineError;

/// Bucket for values outside the retained top-K set
pub const OTHER_VALUE: &str = "other";

/// Separator inside multi-valued cells ("Nolan, Villeneuve")
pub const VALUE_SEPARATOR: char = ',';

pub const DIRECTORS_TOP_K: usize = 30;
pub const STUDIOS_TOP_K: usize = 15;

/// Which columns become categorical features, and how many values to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Item column -> number of most frequent values retained
    #[serde(default = "default_item_top_k")]
    pub item_top_k: BTreeMap<String, usize>,

    /// User columns passed through as categorical features
    #[serde(default = "default_user_columns")]
    pub user_columns: Vec<String>,
}

fn default_item_top_k() -> BTreeMap<String, usize> {
    BTreeMap::from([
        ("directors".to_string(), DIRECTORS_TOP_K),
        ("studios".to_string(), STUDIOS_TOP_K),
    ])
}

fn default_user_columns() -> Vec<String> {
    ["age", "income", "sex", "kids_flg"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            item_top_k: default_item_top_k(),
            user_columns: default_user_columns(),
        }
    }
}

/// One (entity, feature, value) triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRow {
    pub id: u32,
    pub feature: String,
    pub value: String,
}

/// Long-format categorical feature table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Prepares item and user feature tables from a `FeatureConfig`.
#[derive(Debug, Clone)]
pub struct FeaturePreparer {
    config: FeatureConfig,
}

impl FeaturePreparer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Categorical item feature names, in config order
    pub fn item_feature_names(&self) -> Vec<String> {
        self.config.item_top_k.keys().cloned().collect()
    }

    pub fn user_feature_names(&self) -> Vec<String> {
        self.config.user_columns.clone()
    }

    /// Build the item feature table.
    ///
    /// Rows follow item table order, then config order. A multi-valued cell
    /// yields one row per distinct (possibly collapsed) value.
    pub fn prepare_item_features(&self, items: &ItemTable) -> Result<FeatureTable, PipelineError> {
        for column in self.config.item_top_k.keys() {
            if !items.has_column(column) {
                return Err(PipelineError::MissingFeatureColumn {
                    table: "items".to_string(),
                    column: column.clone(),
                });
            }
        }

        let retained: HashMap<&str, HashSet<&str>> = self
            .config
            .item_top_k
            .iter()
            .map(|(column, &k)| {
                let cells = items.items().iter().filter_map(|item| item.attribute(column));
                (column.as_str(), top_k_values(cells, k))
            })
            .collect();

        let mut rows = Vec::new();
        for item in items.items() {
            for column in self.config.item_top_k.keys() {
                let Some(cell) = item.attribute(column) else {
                    continue;
                };
                let keep = &retained[column.as_str()];
                let mut seen: Vec<&str> = Vec::new();
                for value in split_values(cell) {
                    let value = if keep.contains(value) { value } else { OTHER_VALUE };
                    if !seen.contains(&value) {
                        seen.push(value);
                        rows.push(FeatureRow {
                            id: item.id,
                            feature: column.clone(),
                            value: value.to_string(),
                        });
                    }
                }
            }
        }

        debug!("Prepared {} item feature rows", rows.len());
        Ok(FeatureTable::new(rows))
    }

    /// Build the user feature table. Values are kept verbatim.
    pub fn prepare_user_features(&self, users: &UserTable) -> Result<FeatureTable, PipelineError> {
        for column in &self.config.user_columns {
            if !users.has_column(column) {
                return Err(PipelineError::MissingFeatureColumn {
                    table: "users".to_string(),
                    column: column.clone(),
                });
            }
        }

        let rows: Vec<FeatureRow> = users
            .users()
            .iter()
            .flat_map(|user| {
                self.config.user_columns.iter().filter_map(move |column| {
                    user.attribute(column).map(|value| FeatureRow {
                        id: user.id,
                        feature: column.clone(),
                        value: value.to_string(),
                    })
                })
            })
            .collect();

        debug!("Prepared {} user feature rows", rows.len());
        Ok(FeatureTable::new(rows))
    }
}

fn split_values(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(VALUE_SEPARATOR)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// The `k` most frequent values; ties go to the lexicographically smaller
/// value so the result does not depend on table order.
fn top_k_values<'a>(cells: impl Iterator<Item = &'a str>, k: usize) -> HashSet<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for cell in cells {
        for value in split_values(cell) {
            *counts.entry(value).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(k).map(|(value, _)| value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Item, User};

    fn items() -> ItemTable {
        ItemTable::from_items(vec![
            Item::new(1, "A").with_attribute("directors", "Nolan").with_attribute("studios", "WB"),
            Item::new(2, "B").with_attribute("directors", "Nolan, Scott").with_attribute("studios", "Fox"),
            Item::new(3, "C").with_attribute("directors", "Scott").with_attribute("studios", "WB"),
            Item::new(4, "D").with_attribute("directors", "Mann, Lynch").with_attribute("studios", "A24"),
            Item::new(5, "E").with_attribute("studios", "WB"),
        ])
    }

    fn config(directors: usize, studios: usize) -> FeatureConfig {
        FeatureConfig {
            item_top_k: BTreeMap::from([
                ("directors".to_string(), directors),
                ("studios".to_string(), studios),
            ]),
            user_columns: vec!["age".to_string()],
        }
    }

    fn values_for(table: &FeatureTable, id: u32, feature: &str) -> Vec<String> {
        table
            .rows()
            .iter()
            .filter(|r| r.id == id && r.feature == feature)
            .map(|r| r.value.clone())
            .collect()
    }

    #[test]
    fn test_top_k_collapses_rest_to_other() {
        let preparer = FeaturePreparer::new(config(2, 1));
        let table = preparer.prepare_item_features(&items()).unwrap();

        // Nolan and Scott both appear twice; Mann and Lynch once
        assert_eq!(values_for(&table, 2, "directors"), vec!["Nolan", "Scott"]);
        // Two non-retained directors collapse into a single "other" row
        assert_eq!(values_for(&table, 4, "directors"), vec![OTHER_VALUE]);
        assert_eq!(values_for(&table, 1, "studios"), vec!["WB"]);
        assert_eq!(values_for(&table, 2, "studios"), vec![OTHER_VALUE]);
        // Missing cells produce no rows
        assert!(values_for(&table, 5, "directors").is_empty());
    }

    #[test]
    fn test_tie_break_is_lexicographic() {
        let cells = vec!["b", "a", "c", "c"];
        let top = top_k_values(cells.into_iter(), 2);

        assert!(top.contains("c"));
        assert!(top.contains("a"));
        assert!(!top.contains("b"));
    }

    #[test]
    fn test_encoding_is_stable_across_calls() {
        let preparer = FeaturePreparer::new(config(1, 1));
        let first = preparer.prepare_item_features(&items()).unwrap();
        let second = preparer.prepare_item_features(&items()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_item_column_is_error() {
        let mut cfg = config(2, 2);
        cfg.item_top_k.insert("countries".to_string(), 5);

        let err = FeaturePreparer::new(cfg).prepare_item_features(&items()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingFeatureColumn {
                table: "items".to_string(),
                column: "countries".to_string(),
            }
        );
    }

    #[test]
    fn test_user_features_pass_through() {
        let users = UserTable::from_users(vec![
            User::new(1).with_attribute("age", "age_25_34"),
            User::new(2),
            User::new(3).with_attribute("age", "age_65_inf"),
        ]);
        let table = FeaturePreparer::new(config(1, 1)).prepare_user_features(&users).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].value, "age_65_inf");
    }

    #[test]
    fn test_missing_user_column_is_error() {
        let users = UserTable::from_users(vec![User::new(1)]);
        let err = FeaturePreparer::new(config(1, 1)).prepare_user_features(&users).unwrap_err();
        assert!(matches!(err, PipelineError::MissingFeatureColumn { .. }));
    }

    #[test]
    fn test_default_config_deserializes_from_empty_object() {
        let cfg: FeatureConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, FeatureConfig::default());
        assert_eq!(cfg.item_top_k["directors"], DIRECTORS_TOP_K);
    }
}
