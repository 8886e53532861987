//! Ranking models and their on-disk artifacts.
//!
//! This crate provides the concrete implementations behind
//! `pipeline::Model`:
//! - `popular`: one global ranking
//! - `item_knn`: item-to-item neighbour lists
//! - `item_factors`: latent item vectors with on-the-fly user fold-in
//!
//! Models are loaded from versioned JSON artifacts with `load_model`. Every
//! model is read-only after loading, so one instance can serve concurrent
//! requests.

pub mod artifact;
pub mod error;
pub mod item_factors;
pub mod item_knn;
pub mod popular;
mod ranking;

pub use artifact::{load_artifact, load_model, save_artifact, ModelArtifact, ModelKind, FORMAT_VERSION};
pub use error::ArtifactError;
pub use item_factors::ItemFactorsModel;
pub use item_knn::ItemKnnModel;
pub use popular::PopularModel;

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{
        Dataset, IdMap, InteractionFrame, Interactions, ItemIdMap, Model, ModelError, UserKey,
    };
    use std::path::PathBuf;
    use std::sync::Arc;

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    /// Items 100..=104 map to internal ids 0..=4
    fn item_map() -> Arc<ItemIdMap> {
        Arc::new(IdMap::from_values(vec![100, 101, 102, 103, 104]))
    }

    /// Dataset with one synthetic user who watched the given items
    fn request_dataset(viewed: &[u32]) -> Dataset {
        let user = UserKey::synthetic("user");
        let frame = InteractionFrame::synthetic(user.clone(), viewed);
        let users = IdMap::from_values(vec![user]);
        let items = item_map();
        let (interactions, _) = Interactions::from_frame(&frame, &users, &items);
        Dataset::new(users, items, interactions)
    }

    fn user() -> Vec<UserKey> {
        vec![UserKey::synthetic("user")]
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("models-{}-{}.json", std::process::id(), name))
    }

    fn item_ids(recos: &[pipeline::Recommendation]) -> Vec<u32> {
        recos.iter().map(|r| r.item_id).collect()
    }

    // ============================================================================
    // Artifact round trip and validation
    // ============================================================================

    #[test]
    fn test_save_and_load_artifact() {
        let path = temp_path("roundtrip");
        let artifact = ModelArtifact::new(
            "pop",
            ModelKind::Popular {
                scores: vec![5.0, 4.0, 3.0, 2.0, 1.0],
            },
        );

        save_artifact(&path, &artifact).unwrap();
        let model = load_model(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(model.name(), "pop");
    }

    #[test]
    fn test_kind_tag_in_json() {
        let json = r#"{"format_version":1,"model":{"kind":"item_knn","neighbors":[[[1,0.5]],[]]}}"#;
        let artifact: ModelArtifact = serde_json::from_str(json).unwrap();

        assert_eq!(
            artifact.model,
            ModelKind::ItemKnn {
                neighbors: vec![vec![(1, 0.5)], vec![]]
            }
        );
        // Unnamed artifacts are named after their kind
        assert_eq!(artifact.into_model().unwrap().name(), "item_knn");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_model(&temp_path("does-not-exist")).err().unwrap();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let path = temp_path("malformed");
        std::fs::write(&path, "not json").unwrap();
        let err = load_model(&path).err().unwrap();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, ArtifactError::Format(_)));
    }

    #[test]
    fn test_unsupported_version() {
        let artifact = ModelArtifact {
            format_version: 99,
            name: None,
            model: ModelKind::Popular { scores: vec![1.0] },
        };
        assert!(matches!(
            artifact.validate(),
            Err(ArtifactError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_invalid_payloads() {
        let knn = ModelArtifact::new(
            "knn",
            ModelKind::ItemKnn {
                neighbors: vec![vec![(7, 1.0)]],
            },
        );
        assert!(matches!(knn.validate(), Err(ArtifactError::Invalid(_))));

        let factors = ModelArtifact::new(
            "als",
            ModelKind::ItemFactors {
                factors: vec![vec![1.0, 0.0], vec![1.0]],
            },
        );
        assert!(matches!(factors.validate(), Err(ArtifactError::Invalid(_))));
    }

    // ============================================================================
    // Model behaviour
    // ============================================================================

    #[test]
    fn test_popular_filters_viewed_and_ranks() {
        let model = PopularModel::new("pop", vec![5.0, 4.0, 3.0, 2.0, 1.0]);
        let dataset = request_dataset(&[100, 102]);

        let recos = model.recommend(&user(), &dataset, 2, true).unwrap();
        assert_eq!(item_ids(&recos), vec![101, 103]);
        assert_eq!(recos.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2]);

        let unfiltered = model.recommend(&user(), &dataset, 2, false).unwrap();
        assert_eq!(item_ids(&unfiltered), vec![100, 101]);
    }

    #[test]
    fn test_item_knn_only_recommends_linked_items() {
        let model = ItemKnnModel::new(
            "knn",
            vec![
                vec![(1, 0.9), (2, 0.2)],
                vec![(0, 0.9)],
                vec![(0, 0.2), (3, 0.8)],
                vec![(2, 0.8)],
                vec![],
            ],
        );
        let dataset = request_dataset(&[100, 102]);

        let recos = model.recommend(&user(), &dataset, 10, true).unwrap();
        // 101: 3 * 0.9, 103: 3 * 0.8, 104 has no link
        assert_eq!(item_ids(&recos), vec![101, 103]);
        assert!((recos[0].score - 2.7).abs() < 1e-5);
    }

    #[test]
    fn test_item_factors_fold_in() {
        let model = ItemFactorsModel::new(
            "als",
            vec![
                vec![1.0, 0.0],
                vec![0.9, 0.1],
                vec![0.0, 1.0],
                vec![0.1, 0.9],
                vec![0.5, 0.5],
            ],
        );
        let dataset = request_dataset(&[100]);

        let recos = model.recommend(&user(), &dataset, 3, true).unwrap();
        assert_eq!(item_ids(&recos), vec![101, 104, 103]);
    }

    #[test]
    fn test_incompatible_dataset() {
        let model = PopularModel::new("pop", vec![1.0, 2.0]);
        let err = model.recommend(&user(), &request_dataset(&[100]), 5, true).unwrap_err();

        assert_eq!(err, ModelError::IncompatibleDataset { expected: 2, found: 5 });
    }

    #[test]
    fn test_unknown_user() {
        let model = PopularModel::new("pop", vec![1.0; 5]);
        let err = model
            .recommend(&[UserKey::Known(1)], &request_dataset(&[100]), 5, true)
            .unwrap_err();

        assert_eq!(err, ModelError::UnknownUser(UserKey::Known(1)));
    }
}
