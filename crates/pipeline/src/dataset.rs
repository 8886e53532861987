//! Dataset construction.
//!
//! A `Dataset` is everything a ranking model needs to score users: the user
//! and item id maps, interactions expressed in internal ids, and optional
//! one-hot encoded categorical features.
//!
//! The training dataset is built once per recommender. Request datasets are
//! tiny (one synthetic user) and reuse the training item map through an
//! `Arc`, so internal item ids mean the same thing on both sides.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::features::FeatureTable;
use crate::id_map::{IdMap, InternalId, ItemIdMap, UserKey};
use crate::interactions::InteractionFrame;

// =============================================================================
// Interactions
// =============================================================================

/// One interaction in internal id space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionEntry {
    pub user: InternalId,
    pub item: InternalId,
    pub weight: f32,
    pub last_watch_dt: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct Interactions {
    entries: Vec<InteractionEntry>,
    /// Per-user history, weights summed per item, sorted by item
    by_user: HashMap<InternalId, Vec<(InternalId, f32)>>,
}

impl Interactions {
    /// Map a frame through existing id maps.
    ///
    /// Rows whose user or item is not in the maps are dropped; the number of
    /// dropped rows is returned alongside.
    pub fn from_frame(
        frame: &InteractionFrame,
        user_id_map: &IdMap<UserKey>,
        item_id_map: &ItemIdMap,
    ) -> (Self, usize) {
        let mut entries = Vec::with_capacity(frame.len());
        let mut dropped = 0;

        for row in frame.rows() {
            match (
                user_id_map.to_internal(&row.user),
                item_id_map.to_internal(&row.item_id),
            ) {
                (Some(user), Some(item)) => entries.push(InteractionEntry {
                    user,
                    item,
                    weight: row.weight,
                    last_watch_dt: row.last_watch_dt,
                }),
                _ => dropped += 1,
            }
        }

        (Self::from_entries(entries), dropped)
    }

    pub fn from_entries(entries: Vec<InteractionEntry>) -> Self {
        let mut grouped: HashMap<InternalId, BTreeMap<InternalId, f32>> = HashMap::new();
        for entry in &entries {
            *grouped
                .entry(entry.user)
                .or_default()
                .entry(entry.item)
                .or_insert(0.0) += entry.weight;
        }
        let by_user = grouped
            .into_iter()
            .map(|(user, items)| (user, items.into_iter().collect()))
            .collect();

        Self { entries, by_user }
    }

    pub fn entries(&self) -> &[InteractionEntry] {
        &self.entries
    }

    /// Items seen by a user with their summed weights, sorted by item
    pub fn user_items(&self, user: InternalId) -> &[(InternalId, f32)] {
        self.by_user.get(&user).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Categorical features
// =============================================================================

/// Sparse one-hot encoding of categorical features.
///
/// Columns are `(feature, value)` pairs sorted lexicographically, so the
/// same feature table always yields the same column numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalFeatures {
    names: Vec<String>,
    columns: Vec<(String, String)>,
    column_index: HashMap<(String, String), u32>,
    /// Active column ids per internal entity id, sorted
    rows: Vec<Vec<u32>>,
}

impl CategoricalFeatures {
    fn build(
        table: &FeatureTable,
        names: &[String],
        kind: &str,
        n_rows: usize,
        lookup: impl Fn(u32) -> Option<InternalId>,
    ) -> Result<Self, PipelineError> {
        let mut present: BTreeSet<&str> = BTreeSet::new();
        let mut pairs: BTreeSet<(String, String)> = BTreeSet::new();

        for row in table.rows() {
            if !names.contains(&row.feature) {
                return Err(PipelineError::UndeclaredFeature {
                    kind: kind.to_string(),
                    feature: row.feature.clone(),
                });
            }
            present.insert(row.feature.as_str());
            pairs.insert((row.feature.clone(), row.value.clone()));
        }

        if let Some(absent) = names.iter().find(|n| !present.contains(n.as_str())) {
            return Err(PipelineError::UnknownCategoricalFeature {
                kind: kind.to_string(),
                feature: absent.clone(),
            });
        }

        let columns: Vec<(String, String)> = pairs.into_iter().collect();
        let column_index: HashMap<(String, String), u32> = columns
            .iter()
            .enumerate()
            .map(|(idx, pair)| (pair.clone(), idx as u32))
            .collect();

        let mut rows = vec![Vec::new(); n_rows];
        for row in table.rows() {
            if let Some(internal) = lookup(row.id) {
                let column = column_index[&(row.feature.clone(), row.value.clone())];
                rows[internal as usize].push(column);
            }
        }
        for active in &mut rows {
            active.sort_unstable();
            active.dedup();
        }

        Ok(Self {
            names: names.to_vec(),
            columns,
            column_index,
            rows,
        })
    }

    /// Encode ad-hoc `(feature, value)` pairs into this column space.
    /// Pairs unseen at build time are ignored.
    pub fn encode<'a>(&self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<u32> {
        let mut active: Vec<u32> = pairs
            .into_iter()
            .filter_map(|(feature, value)| {
                self.column_index
                    .get(&(feature.to_string(), value.to_string()))
                    .copied()
            })
            .collect();
        active.sort_unstable();
        active.dedup();
        active
    }

    /// Same column space, new rows
    pub fn with_rows(&self, rows: Vec<Vec<u32>>) -> Self {
        Self {
            names: self.names.clone(),
            columns: self.columns.clone(),
            column_index: self.column_index.clone(),
            rows,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, internal: InternalId) -> &[u32] {
        self.rows
            .get(internal as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// Immutable model input.
#[derive(Debug, Clone)]
pub struct Dataset {
    user_id_map: IdMap<UserKey>,
    item_id_map: Arc<ItemIdMap>,
    interactions: Interactions,
    user_features: Option<Arc<CategoricalFeatures>>,
    item_features: Option<Arc<CategoricalFeatures>>,
}

impl Dataset {
    /// Assemble a dataset from parts, without features
    pub fn new(user_id_map: IdMap<UserKey>, item_id_map: Arc<ItemIdMap>, interactions: Interactions) -> Self {
        Self {
            user_id_map,
            item_id_map,
            interactions,
            user_features: None,
            item_features: None,
        }
    }

    pub fn with_user_features(mut self, features: Arc<CategoricalFeatures>) -> Self {
        self.user_features = Some(features);
        self
    }

    pub fn with_item_features(mut self, features: Arc<CategoricalFeatures>) -> Self {
        self.item_features = Some(features);
        self
    }

    pub fn user_id_map(&self) -> &IdMap<UserKey> {
        &self.user_id_map
    }

    pub fn item_id_map(&self) -> &Arc<ItemIdMap> {
        &self.item_id_map
    }

    pub fn interactions(&self) -> &Interactions {
        &self.interactions
    }

    pub fn user_features(&self) -> Option<&Arc<CategoricalFeatures>> {
        self.user_features.as_ref()
    }

    pub fn item_features(&self) -> Option<&Arc<CategoricalFeatures>> {
        self.item_features.as_ref()
    }

    pub fn n_users(&self) -> usize {
        self.user_id_map.len()
    }

    pub fn n_items(&self) -> usize {
        self.item_id_map.len()
    }
}

/// Builds the training dataset from a weighted frame and feature tables.
///
/// ## Usage
/// ```ignore
/// let dataset = DatasetBuilder::new(&frame)
///     .user_features(&user_table, &preparer.user_feature_names())
///     .item_features(&item_table, &preparer.item_feature_names())
///     .build()?;
/// ```
///
/// Id maps list interacting entities first (first-seen order), then
/// entities that only appear in a feature table.
pub struct DatasetBuilder<'a> {
    frame: &'a InteractionFrame,
    user_features: Option<(&'a FeatureTable, &'a [String])>,
    item_features: Option<(&'a FeatureTable, &'a [String])>,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(frame: &'a InteractionFrame) -> Self {
        Self {
            frame,
            user_features: None,
            item_features: None,
        }
    }

    pub fn user_features(mut self, table: &'a FeatureTable, categorical: &'a [String]) -> Self {
        self.user_features = Some((table, categorical));
        self
    }

    pub fn item_features(mut self, table: &'a FeatureTable, categorical: &'a [String]) -> Self {
        self.item_features = Some((table, categorical));
        self
    }

    pub fn build(self) -> Result<Dataset, PipelineError> {
        if self.frame.is_empty() {
            return Err(PipelineError::EmptyInteractions);
        }

        let mut user_id_map = IdMap::from_values(self.frame.rows().iter().map(|r| r.user.clone()));
        let mut item_id_map = IdMap::from_values(self.frame.rows().iter().map(|r| r.item_id));

        if let Some((table, _)) = self.user_features {
            user_id_map.add_ids(table.rows().iter().map(|r| UserKey::Known(r.id)));
        }
        if let Some((table, _)) = self.item_features {
            item_id_map.add_ids(table.rows().iter().map(|r| r.id));
        }

        let (interactions, _) = Interactions::from_frame(self.frame, &user_id_map, &item_id_map);

        let user_features = self
            .user_features
            .map(|(table, names)| {
                CategoricalFeatures::build(table, names, "user", user_id_map.len(), |id| {
                    user_id_map.to_internal(&UserKey::Known(id))
                })
            })
            .transpose()?;
        let item_features = self
            .item_features
            .map(|(table, names)| {
                CategoricalFeatures::build(table, names, "item", item_id_map.len(), |id| {
                    item_id_map.to_internal(&id)
                })
            })
            .transpose()?;

        info!(
            "Built dataset: {} users, {} items, {} interactions",
            user_id_map.len(),
            item_id_map.len(),
            interactions.len()
        );
        if let Some(features) = &item_features {
            debug!("Item feature space has {} columns", features.n_columns());
        }

        let mut dataset = Dataset::new(user_id_map, Arc::new(item_id_map), interactions);
        dataset.user_features = user_features.map(Arc::new);
        dataset.item_features = item_features.map(Arc::new);
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureRow;
    use crate::interactions::{FrameRow, PLACEHOLDER_TIMESTAMP};

    fn row(user: u32, item: u32, weight: f32) -> FrameRow {
        FrameRow {
            user: UserKey::Known(user),
            item_id: item,
            weight,
            last_watch_dt: PLACEHOLDER_TIMESTAMP,
        }
    }

    fn feature(id: u32, feature: &str, value: &str) -> FeatureRow {
        FeatureRow {
            id,
            feature: feature.to_string(),
            value: value.to_string(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_orders_ids_and_adds_cold_entities() {
        let frame = InteractionFrame::new(vec![row(1, 20, 3.0), row(2, 10, 1.0), row(1, 10, 1.0)]);
        let items = FeatureTable::new(vec![feature(10, "studios", "WB"), feature(30, "studios", "other")]);
        let item_names = names(&["studios"]);

        let dataset = DatasetBuilder::new(&frame)
            .item_features(&items, &item_names)
            .build()
            .unwrap();

        assert_eq!(dataset.item_id_map().external_ids(), &[20, 10, 30]);
        assert_eq!(dataset.n_users(), 2);
        assert_eq!(dataset.interactions().len(), 3);

        let features = dataset.item_features().unwrap();
        assert_eq!(
            features.columns(),
            &[
                ("studios".to_string(), "WB".to_string()),
                ("studios".to_string(), "other".to_string()),
            ]
        );
        // item 30 is internal id 2, item 20 has no features
        assert_eq!(features.row(2), &[1]);
        assert!(features.row(0).is_empty());
    }

    #[test]
    fn test_user_items_sums_duplicate_weights() {
        let frame = InteractionFrame::new(vec![row(1, 5, 3.0), row(1, 5, 1.0), row(1, 4, 1.0)]);
        let dataset = DatasetBuilder::new(&frame).build().unwrap();

        // item 5 -> internal 0, item 4 -> internal 1
        assert_eq!(dataset.interactions().user_items(0), &[(0, 4.0), (1, 1.0)]);
        assert!(dataset.interactions().user_items(7).is_empty());
    }

    #[test]
    fn test_undeclared_feature_is_error() {
        let frame = InteractionFrame::new(vec![row(1, 1, 1.0)]);
        let users = FeatureTable::new(vec![feature(1, "age", "18_24"), feature(1, "income", "low")]);
        let user_names = names(&["age"]);

        let err = DatasetBuilder::new(&frame)
            .user_features(&users, &user_names)
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::UndeclaredFeature { ref feature, .. } if feature == "income"));
    }

    #[test]
    fn test_declared_but_absent_feature_is_error() {
        let frame = InteractionFrame::new(vec![row(1, 1, 1.0)]);
        let users = FeatureTable::new(vec![feature(1, "age", "18_24")]);
        let user_names = names(&["age", "sex"]);

        let err = DatasetBuilder::new(&frame)
            .user_features(&users, &user_names)
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownCategoricalFeature { .. }));
    }

    #[test]
    fn test_empty_frame_is_error() {
        let frame = InteractionFrame::default();
        let err = DatasetBuilder::new(&frame).build().unwrap_err();
        assert_eq!(err, PipelineError::EmptyInteractions);
    }

    #[test]
    fn test_from_frame_drops_unknown_items() {
        let item_map = IdMap::from_values(vec![1u32, 2]);
        let user_map = IdMap::from_values(vec![UserKey::synthetic("user")]);
        let frame = InteractionFrame::synthetic(UserKey::synthetic("user"), &[2, 99, 1]);

        let (interactions, dropped) = Interactions::from_frame(&frame, &user_map, &item_map);

        assert_eq!(dropped, 1);
        assert_eq!(interactions.user_items(0), &[(0, 3.0), (1, 3.0)]);
    }

    #[test]
    fn test_encode_ignores_unseen_pairs() {
        let frame = InteractionFrame::new(vec![row(1, 1, 1.0)]);
        let users = FeatureTable::new(vec![feature(1, "age", "18_24"), feature(1, "sex", "F")]);
        let user_names = names(&["age", "sex"]);
        let dataset = DatasetBuilder::new(&frame)
            .user_features(&users, &user_names)
            .build()
            .unwrap();

        let features = dataset.user_features().unwrap();
        let encoded = features.encode([("sex", "F"), ("age", "65_inf"), ("city", "Moscow")]);
        assert_eq!(encoded, vec![1]);
    }
}
