//! Weighted interaction frames.
//!
//! A frame is the long-format (user, item, weight, timestamp) table handed to
//! the dataset builder. Training frames derive their weights from how much
//! of a movie was watched; request frames are synthetic.

use chrono::NaiveDate;
use data_loader::{InteractionTable, ItemId};

use crate::id_map::UserKey;

/// Watching more than this share of a movie counts as meaningful engagement
pub const ENGAGEMENT_THRESHOLD_PCT: f32 = 20.0;

/// Weight of a meaningful (above-threshold) interaction
pub const ENGAGED_WEIGHT: f32 = 3.0;

/// Weight of a light (at or below threshold) interaction
pub const LIGHT_WEIGHT: f32 = 1.0;

/// Identity of the ad-hoc user built for every recommendation request
pub const SYNTHETIC_USER: &str = "user";

/// Timestamp stamped on every synthetic interaction
pub const PLACEHOLDER_TIMESTAMP: NaiveDate = match NaiveDate::from_ymd_opt(2022, 2, 2) {
    Some(date) => date,
    None => panic!("invalid placeholder date"),
};

/// Interaction weight for a given watch percentage.
///
/// Exactly 20% is still a light interaction.
pub fn engagement_weight(watched_pct: f32) -> f32 {
    if watched_pct > ENGAGEMENT_THRESHOLD_PCT {
        ENGAGED_WEIGHT
    } else {
        LIGHT_WEIGHT
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    pub user: UserKey,
    pub item_id: ItemId,
    pub weight: f32,
    pub last_watch_dt: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionFrame {
    rows: Vec<FrameRow>,
}

impl InteractionFrame {
    pub fn new(rows: Vec<FrameRow>) -> Self {
        Self { rows }
    }

    /// Weight every raw interaction by the engagement rule
    pub fn from_raw(table: &InteractionTable) -> Self {
        let rows = table
            .rows()
            .iter()
            .map(|raw| FrameRow {
                user: UserKey::Known(raw.user_id),
                item_id: raw.item_id,
                weight: engagement_weight(raw.watched_pct),
                last_watch_dt: raw.last_watch_dt,
            })
            .collect();
        Self { rows }
    }

    /// One row per viewed item for a single user, all treated as meaningful
    /// engagement and stamped with the placeholder timestamp.
    pub fn synthetic(user: UserKey, viewed_items: &[ItemId]) -> Self {
        let rows = viewed_items
            .iter()
            .map(|&item_id| FrameRow {
                user: user.clone(),
                item_id,
                weight: ENGAGED_WEIGHT,
                last_watch_dt: PLACEHOLDER_TIMESTAMP,
            })
            .collect();
        Self { rows }
    }

    /// Keep only rows matching the predicate
    pub fn retain(&mut self, keep: impl FnMut(&FrameRow) -> bool) {
        self.rows.retain(keep);
    }

    pub fn rows(&self) -> &[FrameRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::RawInteraction;

    #[test]
    fn test_engagement_weight_boundary() {
        assert_eq!(engagement_weight(0.0), LIGHT_WEIGHT);
        assert_eq!(engagement_weight(19.9), LIGHT_WEIGHT);
        assert_eq!(engagement_weight(20.0), LIGHT_WEIGHT);
        assert_eq!(engagement_weight(20.01), ENGAGED_WEIGHT);
        assert_eq!(engagement_weight(100.0), ENGAGED_WEIGHT);
    }

    #[test]
    fn test_from_raw_weights_every_row() {
        let day = NaiveDate::from_ymd_opt(2021, 7, 4).unwrap();
        let table = InteractionTable::new(vec![
            RawInteraction { user_id: 1, item_id: 10, last_watch_dt: day, watched_pct: 85.0 },
            RawInteraction { user_id: 1, item_id: 11, last_watch_dt: day, watched_pct: 20.0 },
            RawInteraction { user_id: 2, item_id: 10, last_watch_dt: day, watched_pct: 3.0 },
        ]);

        let frame = InteractionFrame::from_raw(&table);
        let weights: Vec<f32> = frame.rows().iter().map(|r| r.weight).collect();

        assert_eq!(weights, vec![3.0, 1.0, 1.0]);
        assert_eq!(frame.rows()[2].user, UserKey::Known(2));
    }

    #[test]
    fn test_synthetic_frame() {
        let frame = InteractionFrame::synthetic(UserKey::synthetic(SYNTHETIC_USER), &[7, 3]);

        assert_eq!(frame.len(), 2);
        for row in frame.rows() {
            assert_eq!(row.weight, ENGAGED_WEIGHT);
            assert_eq!(row.last_watch_dt, PLACEHOLDER_TIMESTAMP);
            assert_eq!(row.user, UserKey::synthetic("user"));
        }
        assert_eq!(frame.rows()[0].item_id, 7);
    }
}
