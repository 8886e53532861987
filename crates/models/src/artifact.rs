//! On-disk model artifacts.
//!
//! An artifact is a versioned JSON document. Everything inside it is
//! expressed in the internal item index space of the dataset the model was
//! trained on, which is why the recommender must keep reusing that
//! dataset's item id map.
//!
//! ```json
//! { "format_version": 1, "name": "als", "model": { "kind": "item_factors", "factors": [[0.1, 0.2]] } }
//! ```

use pipeline::{InternalId, Model};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::error::ArtifactError;
use crate::item_factors::ItemFactorsModel;
use crate::item_knn::ItemKnnModel;
use crate::popular::PopularModel;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    /// Free-form model name used in logs and comparisons
    #[serde(default)]
    pub name: Option<String>,
    pub model: ModelKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    Popular { scores: Vec<f32> },
    ItemKnn { neighbors: Vec<Vec<(InternalId, f32)>> },
    ItemFactors { factors: Vec<Vec<f32>> },
}

impl ModelKind {
    fn kind_name(&self) -> &'static str {
        match self {
            ModelKind::Popular { .. } => "popular",
            ModelKind::ItemKnn { .. } => "item_knn",
            ModelKind::ItemFactors { .. } => "item_factors",
        }
    }

    fn n_items(&self) -> usize {
        match self {
            ModelKind::Popular { scores } => scores.len(),
            ModelKind::ItemKnn { neighbors } => neighbors.len(),
            ModelKind::ItemFactors { factors } => factors.len(),
        }
    }
}

impl ModelArtifact {
    pub fn new(name: impl Into<String>, model: ModelKind) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            name: Some(name.into()),
            model,
        }
    }

    /// Check internal consistency of the payload
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: self.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if self.model.n_items() == 0 {
            return Err(ArtifactError::Invalid("model has no items".to_string()));
        }

        match &self.model {
            ModelKind::Popular { .. } => {}
            ModelKind::ItemKnn { neighbors } => {
                let n_items = neighbors.len();
                let out_of_range = neighbors
                    .iter()
                    .flatten()
                    .find(|(item, _)| *item as usize >= n_items);
                if let Some((item, _)) = out_of_range {
                    return Err(ArtifactError::Invalid(format!(
                        "neighbour {} outside of {} trained items",
                        item, n_items
                    )));
                }
            }
            ModelKind::ItemFactors { factors } => {
                let dim = factors[0].len();
                if dim == 0 || factors.iter().any(|f| f.len() != dim) {
                    return Err(ArtifactError::Invalid(
                        "item factors must share one non-zero dimension".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Turn the payload into a ready-to-query model
    pub fn into_model(self) -> Result<Box<dyn Model>, ArtifactError> {
        self.validate()?;
        let name = self
            .name
            .unwrap_or_else(|| self.model.kind_name().to_string());

        let model: Box<dyn Model> = match self.model {
            ModelKind::Popular { scores } => Box::new(PopularModel::new(name, scores)),
            ModelKind::ItemKnn { neighbors } => Box::new(ItemKnnModel::new(name, neighbors)),
            ModelKind::ItemFactors { factors } => Box::new(ItemFactorsModel::new(name, factors)),
        };
        Ok(model)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Read an artifact without instantiating the model
pub fn load_artifact(path: &Path) -> Result<ModelArtifact, ArtifactError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))?;
    artifact.validate()?;
    Ok(artifact)
}

pub fn save_artifact(path: &Path, artifact: &ModelArtifact) -> Result<(), ArtifactError> {
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, artifact)?;
    writer.flush().map_err(|e| io_error(path, e))
}

/// Load a model from an artifact file.
///
/// Any failure here is meant to be fatal for the caller; there is no retry.
pub fn load_model(path: &Path) -> Result<Box<dyn Model>, ArtifactError> {
    let artifact = load_artifact(path)?;
    info!(
        "Loaded {} model with {} items from {}",
        artifact.model.kind_name(),
        artifact.model.n_items(),
        path.display()
    );
    artifact.into_model()
}
