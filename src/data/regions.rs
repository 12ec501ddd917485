use std::collections::HashSet;

use super::model::{Region, RegionTree};
use crate::error::{ExportError, Result};
use crate::report::Warning;

// ---------------------------------------------------------------------------
// Region flattening
// ---------------------------------------------------------------------------

/// Collect the leaf regions of `tree`, depth-first and left-to-right.
///
/// Internal nodes are never emitted. The walk uses an explicit stack and a
/// visited set, so a node reachable twice (cycle or shared child) and a child
/// id with no node both fail with [`ExportError::MalformedHierarchy`].
pub fn flatten_leaves(tree: &RegionTree) -> Result<Vec<Region>> {
    let mut leaves = Vec::new();
    let mut visited: HashSet<&str> = HashSet::with_capacity(tree.len());
    let mut stack: Vec<&str> = vec![tree.root.as_str()];

    while let Some(id) = stack.pop() {
        let node = tree.node(id).ok_or_else(|| {
            ExportError::MalformedHierarchy(format!("region `{id}` is referenced but not defined"))
        })?;
        if !visited.insert(node.id.as_str()) {
            return Err(ExportError::MalformedHierarchy(format!(
                "region `{}` ({}) is reachable more than once",
                node.id, node.name
            )));
        }

        if node.is_leaf() {
            leaves.push(Region {
                id: node.id.clone(),
                name: node.display_name().to_string(),
            });
        } else {
            // Reversed so the first child is popped first.
            stack.extend(node.subregions.iter().rev().map(String::as_str));
        }
    }

    Ok(leaves)
}

// ---------------------------------------------------------------------------
// Name uniqueness
// ---------------------------------------------------------------------------

/// Returns a warning when display names repeat. Advisory only.
pub fn check_unique_names(regions: &[Region]) -> Option<Warning> {
    let unique = regions
        .iter()
        .map(|r| r.name.as_str())
        .collect::<HashSet<_>>()
        .len();
    (unique != regions.len()).then(|| Warning::DuplicateRegionNames {
        total: regions.len(),
        unique,
    })
}
