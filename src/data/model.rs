use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque region identifier as handed out by the source.
pub type RegionId = String;
/// Opaque feature identifier as handed out by the source.
pub type FeatureId = String;
/// Spot identifier, unique within one region.
pub type SpotId = i64;

// ---------------------------------------------------------------------------
// Region – a leaf of the region hierarchy
// ---------------------------------------------------------------------------

/// A leaf region eligible for export.
///
/// `name` is the display name (the last `/` segment of the source path).
/// Names are not guaranteed to be unique across ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

// ---------------------------------------------------------------------------
// Region hierarchy
// ---------------------------------------------------------------------------

/// One node of the region hierarchy. `name` is the fully qualified slash-path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionNode {
    pub id: RegionId,
    pub name: String,
    #[serde(default)]
    pub subregions: Vec<RegionId>,
}

impl RegionNode {
    pub fn is_leaf(&self) -> bool {
        self.subregions.is_empty()
    }

    /// Last `/`-delimited segment of the qualified name.
    pub fn display_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Region hierarchy as a node table linked by id.
///
/// Nothing here guarantees a tree: child ids may dangle or form cycles.
/// [`crate::data::regions::flatten_leaves`] is what rejects those.
#[derive(Debug, Clone, Default)]
pub struct RegionTree {
    pub root: RegionId,
    nodes: HashMap<RegionId, RegionNode>,
}

impl RegionTree {
    pub fn new(root: impl Into<RegionId>, nodes: impl IntoIterator<Item = RegionNode>) -> Self {
        Self {
            root: root.into(),
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&RegionNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// A named, ordered grouping of features; selects the output columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureList {
    pub id: String,
    pub name: String,
    pub declared_feature_count: usize,
}

/// A measurable quantity. Its name becomes an output column header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Spots and intensities (parallel arrays, as the source delivers them)
// ---------------------------------------------------------------------------

/// All spots of one region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotSet {
    #[serde(rename = "spot_id")]
    pub ids: Vec<SpotId>,
    pub x: Vec<i64>,
    pub y: Vec<i64>,
}

impl SpotSet {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Parallel arrays must agree in length.
    pub fn is_consistent(&self) -> bool {
        self.ids.len() == self.x.len() && self.ids.len() == self.y.len()
    }
}

/// Sparse spot → intensity mapping of one feature within one region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureIntensities {
    pub spot_ids: Vec<SpotId>,
    pub values: Vec<f64>,
}

impl FeatureIntensities {
    pub fn len(&self) -> usize {
        self.spot_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spot_ids.is_empty()
    }

    pub fn is_consistent(&self) -> bool {
        self.spot_ids.len() == self.values.len()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (SpotId, f64)> + '_ {
        self.spot_ids.iter().copied().zip(self.values.iter().copied())
    }
}
