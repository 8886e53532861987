//! Bidirectional mapping between external identifiers and the dense
//! internal index space used by ranking models.

use data_loader::{ItemId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Dense index assigned by an `IdMap`
pub type InternalId = u32;

/// External user identity.
///
/// Training users come from the user table; ad-hoc requests use a
/// synthetic, never persisted identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserKey {
    Known(UserId),
    Synthetic(String),
}

impl UserKey {
    pub fn synthetic(name: impl Into<String>) -> Self {
        UserKey::Synthetic(name.into())
    }
}

impl From<UserId> for UserKey {
    fn from(id: UserId) -> Self {
        UserKey::Known(id)
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::Known(id) => write!(f, "{}", id),
            UserKey::Synthetic(name) => write!(f, "{}", name),
        }
    }
}

/// Insertion-ordered map between external ids and `0..len` internal ids.
///
/// Once built, internal ids never move: `add_ids` only appends.
#[derive(Debug, Clone, PartialEq)]
pub struct IdMap<E: Eq + Hash> {
    external: Vec<E>,
    internal: HashMap<E, InternalId>,
}

/// Item id space shared by the training dataset and every request dataset
pub type ItemIdMap = IdMap<ItemId>;

impl<E: Clone + Eq + Hash> IdMap<E> {
    pub fn new() -> Self {
        Self {
            external: Vec::new(),
            internal: HashMap::new(),
        }
    }

    /// Build a map from values, keeping the first occurrence of each id
    pub fn from_values(values: impl IntoIterator<Item = E>) -> Self {
        let mut map = Self::new();
        map.add_ids(values);
        map
    }

    /// Append ids not yet present, in iteration order
    pub fn add_ids(&mut self, values: impl IntoIterator<Item = E>) {
        for value in values {
            if !self.internal.contains_key(&value) {
                let idx = self.external.len() as InternalId;
                self.internal.insert(value.clone(), idx);
                self.external.push(value);
            }
        }
    }

    pub fn to_internal(&self, external: &E) -> Option<InternalId> {
        self.internal.get(external).copied()
    }

    pub fn to_external(&self, internal: InternalId) -> Option<&E> {
        self.external.get(internal as usize)
    }

    pub fn contains(&self, external: &E) -> bool {
        self.internal.contains_key(external)
    }

    /// External ids ordered by internal id
    pub fn external_ids(&self) -> &[E] {
        &self.external
    }

    pub fn len(&self) -> usize {
        self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.external.is_empty()
    }
}

impl<E: Clone + Eq + Hash> Default for IdMap<E> {
    fn default() -> Self {
        Self::new()
    }
}
