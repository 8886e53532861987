//! Joining display titles onto recommendations.

use data_loader::{ItemId, ItemTable};
use pipeline::Recommendation;
use serde::Serialize;

/// Final recommendation row returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitledRecommendation {
    pub item_id: ItemId,
    /// `None` when the item has no metadata row
    pub title: Option<String>,
    pub rank: usize,
    pub score: f32,
}

/// Left join of item titles onto recommendations, ordered by rank.
///
/// The sort is stable, so rows sharing a rank keep their input order. A
/// missing title never drops a row.
pub fn add_titles(items: &ItemTable, recommendations: Vec<Recommendation>) -> Vec<TitledRecommendation> {
    let titles = items.titles();

    let mut rows: Vec<TitledRecommendation> = recommendations
        .into_iter()
        .map(|reco| TitledRecommendation {
            item_id: reco.item_id,
            title: titles.get(&reco.item_id).map(|t| t.to_string()),
            rank: reco.rank,
            score: reco.score,
        })
        .collect();

    rows.sort_by_key(|row| row.rank);
    rows
}
