//! Read-only scene snapshot: object boxes by id plus the room architecture.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::arch::Architecture;
use crate::error::{RelationError, RelationResult};
use crate::geometry::OrientedBox;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub category: String,
    pub bbox: OrientedBox,
}

/// Geometry of one scene snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneGeometry {
    pub objects: BTreeMap<String, SceneObject>,
    #[serde(default)]
    pub architecture: Option<Architecture>,
}

impl SceneGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = Some(architecture);
        self
    }

    /// Adds an object keyed by its box id, replacing any previous object with that id.
    pub fn insert(&mut self, category: impl Into<String>, bbox: OrientedBox) {
        self.objects.insert(
            bbox.id.clone(),
            SceneObject {
                category: category.into(),
                bbox,
            },
        );
    }

    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    /// Instances of a category in id order.
    pub fn instances_of(&self, category: &str) -> Vec<&OrientedBox> {
        self.objects
            .values()
            .filter(|object| object.category == category)
            .map(|object| &object.bbox)
            .collect()
    }

    /// Resolves a reference to concrete boxes.
    ///
    /// An exact id wins; otherwise the first `count` instances of the category are taken.
    pub fn resolve(&self, name: &str, count: usize) -> RelationResult<Vec<&OrientedBox>> {
        if let Some(object) = self.objects.get(name) {
            return Ok(vec![&object.bbox]);
        }
        let boxes: Vec<&OrientedBox> = self
            .objects
            .values()
            .filter(|object| object.category == name)
            .map(|object| &object.bbox)
            .take(count)
            .collect();
        if boxes.is_empty() {
            return Err(RelationError::Geometry(format!("missing object `{name}`")));
        }
        if boxes.len() < count {
            return Err(RelationError::Geometry(format!(
                "expected {count} instances of `{name}`, found {}",
                boxes.len()
            )));
        }
        Ok(boxes)
    }

    pub fn architecture(&self) -> RelationResult<&Architecture> {
        self.architecture
            .as_ref()
            .ok_or_else(|| RelationError::Geometry("scene has no architecture".into()))
    }
}
