use std::collections::HashMap;

use super::catalog::FeatureCatalog;
use crate::data::model::{FeatureIntensities, Region, SpotId, SpotSet};
use crate::data::source::Session;
use crate::error::{ExportError, Result, SourceError};

// ---------------------------------------------------------------------------
// SpotIndex – spot id → row position within one region
// ---------------------------------------------------------------------------

/// Built once per region and shared by every feature of that region.
///
/// A repeated spot id maps to its last occurrence.
#[derive(Debug, Clone, Default)]
pub struct SpotIndex {
    rows: HashMap<SpotId, usize>,
}

impl SpotIndex {
    pub fn build(spots: &SpotSet) -> Self {
        let rows = spots
            .ids
            .iter()
            .enumerate()
            .map(|(row, &id)| (id, row))
            .collect();
        Self { rows }
    }

    pub fn row_of(&self, spot_id: SpotId) -> Option<usize> {
        self.rows.get(&spot_id).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RowBlock – dense rows of one region
// ---------------------------------------------------------------------------

/// The rows one region contributes to the export.
///
/// Feature values are stored per column; `None` is the missing-value marker.
/// A reported `0.0` stays `Some(0.0)`; a reported NaN is treated as missing.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBlock {
    pub tissue_id: String,
    pub spot_ids: Vec<SpotId>,
    pub x: Vec<i64>,
    pub y: Vec<i64>,
    values: Vec<Vec<Option<f64>>>,
}

impl RowBlock {
    /// One row per spot, every feature cell missing.
    pub fn new(region: &Region, spots: SpotSet, feature_count: usize) -> Self {
        let n = spots.len();
        Self {
            tissue_id: region.name.clone(),
            spot_ids: spots.ids,
            x: spots.x,
            y: spots.y,
            values: vec![vec![None; n]; feature_count],
        }
    }

    /// Write one feature's sparse values into `column`.
    ///
    /// Pairs whose spot is not in `index` are dropped; the count of dropped
    /// pairs is returned. A NaN reading stays missing.
    pub fn scatter(
        &mut self,
        column: usize,
        index: &SpotIndex,
        intensities: &FeatureIntensities,
    ) -> usize {
        let cells = &mut self.values[column];
        let mut dropped = 0;
        for (spot_id, value) in intensities.pairs() {
            match index.row_of(spot_id) {
                Some(row) => cells[row] = (!value.is_nan()).then_some(value),
                None => dropped += 1,
            }
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.spot_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spot_ids.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.values.len()
    }

    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        self.values[column][row]
    }
}

// ---------------------------------------------------------------------------
// Per-region assembly
// ---------------------------------------------------------------------------

/// Result of processing one region.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionOutcome {
    /// The region has no spots and contributes no rows.
    Discarded,
    Block(RowBlock),
}

/// Fetch spots and feature intensities for `region` and build its row block.
pub fn assemble_region<S: Session + ?Sized>(
    session: &S,
    region: &Region,
    catalog: &FeatureCatalog,
) -> Result<RegionOutcome> {
    let spots = session
        .region_spots(&region.id)
        .map_err(|e| ExportError::read(format!("spots of region {region}"), e))?;

    if !spots.is_consistent() {
        return Err(ExportError::read(
            format!("spots of region {region}"),
            SourceError::Inconsistent(format!(
                "{} spot ids, {} x, {} y",
                spots.ids.len(),
                spots.x.len(),
                spots.y.len()
            )),
        ));
    }
    if spots.is_empty() {
        return Ok(RegionOutcome::Discarded);
    }

    let index = SpotIndex::build(&spots);
    let mut block = RowBlock::new(region, spots, catalog.len());

    for (column, feature) in catalog.features().iter().enumerate() {
        let intensities = session
            .feature_intensities(&feature.id, &region.id)
            .map_err(|e| {
                ExportError::read(
                    format!("intensities of feature `{}` in region {region}", feature.name),
                    e,
                )
            })?;
        if !intensities.is_consistent() {
            return Err(ExportError::read(
                format!("intensities of feature `{}` in region {region}", feature.name),
                SourceError::Inconsistent(format!(
                    "{} spot ids, {} values",
                    intensities.spot_ids.len(),
                    intensities.values.len()
                )),
            ));
        }
        // Ids outside this region's spot set are dropped; they may point at an
        // upstream integrity problem rather than intended cross-region data.
        let dropped = block.scatter(column, &index, &intensities);
        if dropped > 0 {
            log::debug!(
                "Dropped {dropped} intensities of `{}` for spots outside region {region}",
                feature.name
            );
        }
    }

    Ok(RegionOutcome::Block(block))
}
