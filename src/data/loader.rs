use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::model::{
    Feature, FeatureId, FeatureIntensities, FeatureList, RegionId, RegionNode, SpotSet,
};

// ---------------------------------------------------------------------------
// Source document – the on-disk form of a measurement session
// ---------------------------------------------------------------------------

/// Everything a session serves, as stored in a `.json` source file:
///
/// ```json
/// {
///   "root": "r0",
///   "regions": [
///     { "id": "r0", "name": "Regions", "subregions": ["r1"] },
///     { "id": "r1", "name": "Regions/Kidney", "subregions": [] }
///   ],
///   "feature_lists": [
///     { "id": "fl1", "name": "Peaks", "features": [{ "id": "f1", "name": "m/z 885.55" }] }
///   ],
///   "spots": { "r1": { "spot_id": [1, 2], "x": [0, 1], "y": [0, 0] } },
///   "intensities": { "f1": { "r1": { "spot_ids": [1], "values": [3.5] } } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub root: RegionId,
    pub regions: Vec<RegionNode>,
    #[serde(default)]
    pub feature_lists: Vec<FeatureListEntry>,
    #[serde(default)]
    pub spots: BTreeMap<RegionId, SpotSet>,
    #[serde(default)]
    pub intensities: BTreeMap<FeatureId, BTreeMap<RegionId, FeatureIntensities>>,
}

/// A feature list together with its member features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureListEntry {
    pub id: String,
    pub name: String,
    /// Count as declared by the source; falls back to `features.len()`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_features: Option<usize>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureListEntry {
    pub fn summary(&self) -> FeatureList {
        FeatureList {
            id: self.id.clone(),
            name: self.name.clone(),
            declared_feature_count: self.num_features.unwrap_or(self.features.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a source document from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.json` – see [`SourceDocument`]
pub fn load_file(path: &Path) -> Result<SourceDocument> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn load_json(path: &Path) -> Result<SourceDocument> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

/// Parse and structurally validate a source document.
pub fn parse_json(text: &str) -> Result<SourceDocument> {
    let doc: SourceDocument = serde_json::from_str(text).context("parsing JSON")?;
    validate(&doc)?;
    Ok(doc)
}

fn validate(doc: &SourceDocument) -> Result<()> {
    let mut seen = HashSet::with_capacity(doc.regions.len());
    for node in &doc.regions {
        if !seen.insert(node.id.as_str()) {
            bail!("Duplicate region id `{}`", node.id);
        }
    }

    let mut list_ids = HashSet::with_capacity(doc.feature_lists.len());
    for list in &doc.feature_lists {
        if !list_ids.insert(list.id.as_str()) {
            bail!("Duplicate feature list id `{}`", list.id);
        }
    }

    Ok(())
}
