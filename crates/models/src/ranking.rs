//! Scoring loop shared by every model.
//!
//! Models only decide how to score items from a user's history; looking up
//! users, filtering viewed items, top-k selection, tie-breaking and ranking
//! happen here so that all models behave the same way at the edges.

use pipeline::{Dataset, InternalId, ModelError, Recommendation, UserKey};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Highest score first; equal scores go to the lower internal id
fn by_score_then_index(a: &(InternalId, f32), b: &(InternalId, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Keep the `k` best candidates, ordered best first
pub(crate) fn top_k(mut candidates: Vec<(InternalId, f32)>, k: usize) -> Vec<(InternalId, f32)> {
    if k == 0 {
        return Vec::new();
    }
    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, by_score_then_index);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(by_score_then_index);
    candidates
}

/// Reject datasets whose item space is larger than the trained one
pub(crate) fn check_item_space(dataset: &Dataset, trained_items: usize) -> Result<(), ModelError> {
    if dataset.n_items() > trained_items {
        return Err(ModelError::IncompatibleDataset {
            expected: trained_items,
            found: dataset.n_items(),
        });
    }
    Ok(())
}

/// Drive `score` over every requested user.
///
/// `score` receives the user's history (internal item id, weight) and returns
/// candidate scores; candidates outside the dataset's item space are ignored.
pub(crate) fn recommend_each<F>(
    users: &[UserKey],
    dataset: &Dataset,
    k: usize,
    filter_viewed: bool,
    score: F,
) -> Result<Vec<Recommendation>, ModelError>
where
    F: Fn(&[(InternalId, f32)]) -> Vec<(InternalId, f32)>,
{
    let item_id_map = dataset.item_id_map();
    let mut out = Vec::with_capacity(users.len() * k);

    for user in users {
        let internal = dataset
            .user_id_map()
            .to_internal(user)
            .ok_or_else(|| ModelError::UnknownUser(user.clone()))?;
        let history = dataset.interactions().user_items(internal);
        let viewed: HashSet<InternalId> = if filter_viewed {
            history.iter().map(|&(item, _)| item).collect()
        } else {
            HashSet::new()
        };

        let candidates: Vec<(InternalId, f32)> = score(history)
            .into_iter()
            .filter(|(item, _)| (*item as usize) < item_id_map.len() && !viewed.contains(item))
            .collect();

        for (position, (item, item_score)) in top_k(candidates, k).into_iter().enumerate() {
            let item_id = *item_id_map.to_external(item).ok_or_else(|| {
                ModelError::Inference(format!("internal item {} has no external id", item))
            })?;
            out.push(Recommendation {
                user: user.clone(),
                item_id,
                rank: position + 1,
                score: item_score,
            });
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_orders_and_breaks_ties_by_index() {
        let candidates = vec![(4, 0.5), (1, 0.9), (3, 0.5), (2, 0.1), (0, 0.5)];

        assert_eq!(top_k(candidates.clone(), 3), vec![(1, 0.9), (0, 0.5), (3, 0.5)]);
        assert_eq!(top_k(candidates.clone(), 10).len(), 5);
        assert!(top_k(candidates, 0).is_empty());
    }
}
