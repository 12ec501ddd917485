//! Export pipeline: region list + feature list → one CSV table.
//!
//! ```text
//!   FeatureList ──► catalog ──► column set (fixed for the export)
//!                                   │
//!   for each region (in order):     ▼
//!     spots ──► matrix::SpotIndex ──► matrix::RowBlock ◄── sparse intensities
//!                                   │
//!                                   ▼
//!                            table::ExportTable ──► CSV (temp file, rename)
//! ```

pub mod catalog;
pub mod matrix;
pub mod table;

use std::error::Error as StdError;
use std::path::Path;

use crate::data::model::{FeatureList, Region};
use crate::data::regions::{check_unique_names, flatten_leaves};
use crate::data::source::{DataSource, Session, SessionGuard};
use crate::error::{ExportError, Result};
use crate::report::{ExportObserver, Warning};

use catalog::FeatureCatalog;
use matrix::{assemble_region, RegionOutcome};
use table::ExportTable;

// ---------------------------------------------------------------------------
// Source inspection
// ---------------------------------------------------------------------------

/// What a caller needs to set up an export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCatalog {
    /// Leaf regions in tree order.
    pub regions: Vec<Region>,
    pub feature_lists: Vec<FeatureList>,
}

/// Open `path`, list its leaf regions and feature lists, and close it again.
///
/// Duplicate region names are reported to `observer` but do not fail.
pub fn inspect<D: DataSource>(
    source: &D,
    path: &Path,
    observer: &mut dyn ExportObserver,
) -> Result<SourceCatalog> {
    report_failure(observer, |observer| {
        let session = open(source, path)?;

        let tree = session
            .region_tree()
            .map_err(|e| ExportError::read("region tree", e))?;
        let regions = flatten_leaves(&tree)?;
        log::info!("Found {} leaf regions", regions.len());

        if let Some(warning) = check_unique_names(&regions) {
            observer.on_warning(&warning);
        }

        let feature_lists = session
            .feature_lists()
            .map_err(|e| ExportError::read("feature lists", e))?;
        log::info!("Found {} feature lists", feature_lists.len());

        Ok(SourceCatalog {
            regions,
            feature_lists,
        })
    })
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub regions_processed: usize,
    /// Regions without spots, in processing order.
    pub discarded: Vec<Region>,
    pub rows_written: usize,
    pub columns: Vec<String>,
}

/// Export `regions` × `feature_list` from the file at `source_path` into a
/// CSV at `output_path`.
///
/// Blocking; reports one progress event per region to `observer`. Any source
/// failure aborts the whole export, the session is closed, and `output_path`
/// is not touched.
pub fn export<D: DataSource>(
    source: &D,
    source_path: &Path,
    output_path: &Path,
    regions: &[Region],
    feature_list: &FeatureList,
    observer: &mut dyn ExportObserver,
) -> Result<ExportSummary> {
    report_failure(observer, |observer| {
        let session = open(source, source_path)?;
        let catalog = FeatureCatalog::resolve(&*session, feature_list)?;
        let (table, discarded) = build_table(&*session, regions, &catalog, observer)?;
        drop(session);

        table.write_to_path(output_path)?;
        log::info!(
            "Wrote {} rows from {} regions to {}",
            table.row_count(),
            regions.len() - discarded.len(),
            output_path.display()
        );

        Ok(ExportSummary {
            regions_processed: regions.len(),
            discarded,
            rows_written: table.row_count(),
            columns: table.columns().to_vec(),
        })
    })
}

/// Assemble the in-memory table for `regions` from an open session.
///
/// Returns the table and the regions that were discarded for having no spots.
pub fn build_table<S: Session + ?Sized>(
    session: &S,
    regions: &[Region],
    catalog: &FeatureCatalog,
    observer: &mut dyn ExportObserver,
) -> Result<(ExportTable, Vec<Region>)> {
    let mut table = ExportTable::new(catalog.columns());
    let mut discarded = Vec::new();

    for (i, region) in regions.iter().enumerate() {
        log::info!("Processing region {}/{}: {}", i + 1, regions.len(), region.name);
        observer.on_region_processed(i);

        match assemble_region(session, region, catalog)? {
            RegionOutcome::Block(block) => table.push(block),
            RegionOutcome::Discarded => {
                observer.on_warning(&Warning::EmptyRegion {
                    region: region.clone(),
                });
                discarded.push(region.clone());
            }
        }
    }

    if !discarded.is_empty() {
        log::info!("{} regions had no spots and were skipped", discarded.len());
    }
    Ok((table, discarded))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open<D: DataSource>(source: &D, path: &Path) -> Result<SessionGuard<D::Session>> {
    source
        .open(path)
        .map(SessionGuard::new)
        .map_err(|source| ExportError::SourceUnavailable { source })
}

/// Run `f`, forwarding a failure to the observer's error sink before returning it.
fn report_failure<T>(
    observer: &mut dyn ExportObserver,
    f: impl FnOnce(&mut dyn ExportObserver) -> Result<T>,
) -> Result<T> {
    let result = f(&mut *observer);
    if let Err(e) = &result {
        observer.on_error(e.kind(), &error_chain(e));
    }
    result
}

/// `outer: inner: innermost`
fn error_chain(err: &dyn StdError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::data::loader::{FeatureListEntry, SourceDocument};
    use crate::data::model::{
        Feature, FeatureIntensities, RegionNode, RegionTree, SpotSet,
    };
    use crate::data::source::{DocumentSession, MemorySource};
    use crate::error::{ErrorKind, SourceError};

    // ---- fixtures ----

    fn node(id: &str, name: &str, subs: &[&str]) -> RegionNode {
        RegionNode {
            id: id.into(),
            name: name.into(),
            subregions: subs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn spots(ids: &[i64]) -> SpotSet {
        SpotSet {
            ids: ids.to_vec(),
            x: ids.iter().map(|i| i * 2).collect(),
            y: ids.iter().map(|i| i * 3).collect(),
        }
    }

    /// Tree `A: [L1 (s1, s2), L2 ()]`, list `[f1]`, `f1` measures `s1 = 3.5`.
    fn worked_example() -> SourceDocument {
        let mut doc = SourceDocument {
            root: "A".into(),
            regions: vec![
                node("A", "Regions/A", &["L1", "L2"]),
                node("L1", "Regions/A/L1", &[]),
                node("L2", "Regions/A/L2", &[]),
            ],
            feature_lists: vec![
                FeatureListEntry {
                    id: "fl".into(),
                    name: "Peaks".into(),
                    num_features: None,
                    features: vec![Feature {
                        id: "f1".into(),
                        name: "f1".into(),
                    }],
                },
                FeatureListEntry {
                    id: "none".into(),
                    name: "Nothing".into(),
                    num_features: None,
                    features: vec![],
                },
            ],
            ..Default::default()
        };
        doc.spots.insert("L1".into(), spots(&[1, 2]));
        doc.intensities.entry("f1".into()).or_default().insert(
            "L1".into(),
            FeatureIntensities {
                spot_ids: vec![1],
                values: vec![3.5],
            },
        );
        doc
    }

    #[derive(Default)]
    struct Recorder {
        progress: Vec<usize>,
        warnings: Vec<Warning>,
        errors: Vec<(ErrorKind, String)>,
    }

    impl ExportObserver for Recorder {
        fn on_region_processed(&mut self, index: usize) {
            self.progress.push(index);
        }

        fn on_warning(&mut self, warning: &Warning) {
            self.warnings.push(warning.clone());
        }

        fn on_error(&mut self, kind: ErrorKind, message: &str) {
            self.errors.push((kind, message.to_string()));
        }
    }

    /// Counts `close` calls on the sessions it hands out.
    struct CountingSource {
        inner: MemorySource,
        closes: Rc<Cell<usize>>,
    }

    struct CountingSession {
        inner: DocumentSession,
        closes: Rc<Cell<usize>>,
    }

    impl DataSource for CountingSource {
        type Session = CountingSession;

        fn open(&self, path: &Path) -> Result<CountingSession, SourceError> {
            Ok(CountingSession {
                inner: self.inner.open(path)?,
                closes: Rc::clone(&self.closes),
            })
        }
    }

    impl Session for CountingSession {
        fn region_tree(&self) -> Result<RegionTree, SourceError> {
            self.inner.region_tree()
        }
        fn feature_lists(&self) -> Result<Vec<FeatureList>, SourceError> {
            self.inner.feature_lists()
        }
        fn feature_members(&self, id: &str) -> Result<Vec<Feature>, SourceError> {
            self.inner.feature_members(id)
        }
        fn region_spots(&self, id: &str) -> Result<SpotSet, SourceError> {
            self.inner.region_spots(id)
        }
        fn feature_intensities(
            &self,
            feature_id: &str,
            region_id: &str,
        ) -> Result<FeatureIntensities, SourceError> {
            self.inner.feature_intensities(feature_id, region_id)
        }
        fn close(&mut self) {
            self.closes.set(self.closes.get() + 1);
            self.inner.close();
        }
    }

    struct LockedSource;

    impl DataSource for LockedSource {
        type Session = DocumentSession;

        fn open(&self, path: &Path) -> Result<DocumentSession, SourceError> {
            Err(SourceError::Unavailable {
                path: path.to_path_buf(),
                reason: "locked by another process".into(),
            })
        }
    }

    fn list<'a>(catalog: &'a SourceCatalog, id: &str) -> &'a FeatureList {
        catalog.feature_lists.iter().find(|l| l.id == id).unwrap()
    }

    fn run(
        doc: SourceDocument,
        feature_list_id: &str,
    ) -> (String, ExportSummary, Recorder) {
        let source = MemorySource::new(doc);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let mut rec = Recorder::default();

        let catalog = inspect(&source, Path::new("mem"), &mut rec).unwrap();
        let fl = list(&catalog, feature_list_id).clone();
        let summary = export(&source, Path::new("mem"), &out, &catalog.regions, &fl, &mut rec).unwrap();
        (std::fs::read_to_string(&out).unwrap(), summary, rec)
    }

    // ---- behaviour ----

    #[test]
    fn worked_example_output() {
        let (csv, summary, rec) = run(worked_example(), "fl");

        assert_eq!(csv, "spotId,x,y,tissue_id,f1\n1,2,3,L1,3.5\n2,4,6,L1,\n");
        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.regions_processed, 2);
        assert_eq!(summary.discarded.len(), 1);
        assert_eq!(summary.discarded[0].id, "L2");
        assert_eq!(rec.progress, vec![0, 1]);
        assert!(rec.errors.is_empty());
        assert!(matches!(rec.warnings.as_slice(), [Warning::EmptyRegion { region }] if region.id == "L2"));
    }

    #[test]
    fn empty_feature_list_yields_base_columns_only() {
        let (csv, summary, _) = run(worked_example(), "none");
        assert_eq!(csv, "spotId,x,y,tissue_id\n1,2,3,L1\n2,4,6,L1\n");
        assert_eq!(summary.columns, vec!["spotId", "x", "y", "tissue_id"]);
    }

    #[test]
    fn empty_region_list_writes_header_only() {
        let source = MemorySource::new(worked_example());
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let fl = FeatureList {
            id: "fl".into(),
            name: "Peaks".into(),
            declared_feature_count: 1,
        };

        let summary = export(&source, Path::new("mem"), &out, &[], &fl, &mut ()).unwrap();
        assert_eq!(summary.rows_written, 0);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "spotId,x,y,tissue_id,f1\n");
    }

    #[test]
    fn duplicate_names_warn_but_keep_separate_blocks() {
        let mut doc = worked_example();
        doc.regions = vec![
            node("A", "Regions/A", &["L1", "X"]),
            node("L1", "Regions/A/Cortex", &[]),
            node("X", "Regions/B/Cortex", &[]),
        ];
        doc.spots.insert("X".into(), spots(&[7]));

        let (csv, summary, rec) = run(doc, "fl");
        assert!(rec
            .warnings
            .contains(&Warning::DuplicateRegionNames { total: 2, unique: 1 }));
        assert_eq!(
            csv,
            "spotId,x,y,tissue_id,f1\n1,2,3,Cortex,3.5\n2,4,6,Cortex,\n7,14,21,Cortex,\n"
        );
        assert!(summary.discarded.is_empty());
    }

    #[test]
    fn columns_are_identical_when_regions_measure_different_features() {
        let mut doc = worked_example();
        doc.feature_lists[0].features.push(Feature {
            id: "f2".into(),
            name: "f2".into(),
        });
        doc.spots.insert("L2".into(), spots(&[5]));
        doc.intensities.entry("f2".into()).or_default().insert(
            "L2".into(),
            FeatureIntensities {
                spot_ids: vec![5],
                values: vec![0.0],
            },
        );

        let (csv, _, _) = run(doc, "fl");
        assert_eq!(
            csv,
            "spotId,x,y,tissue_id,f1,f2\n\
             1,2,3,L1,3.5,\n\
             2,4,6,L1,,\n\
             5,10,15,L2,,0.0\n"
        );
    }

    #[test]
    fn export_is_byte_identical_across_runs() {
        let (first, _, _) = run(worked_example(), "fl");
        let (second, _, _) = run(worked_example(), "fl");
        assert_eq!(first, second);
    }

    #[test]
    fn unavailable_source_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let mut rec = Recorder::default();
        let fl = FeatureList {
            id: "fl".into(),
            name: "Peaks".into(),
            declared_feature_count: 1,
        };

        let err = export(&LockedSource, Path::new("x.json"), &out, &[], &fl, &mut rec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert!(!out.exists());
        assert_eq!(rec.errors.len(), 1);
        assert_eq!(rec.errors[0].0, ErrorKind::SourceUnavailable);
        assert!(rec.errors[0].1.contains("locked by another process"));

        let err = inspect(&LockedSource, Path::new("x.json"), &mut ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[test]
    fn read_failure_aborts_and_closes_session() {
        let closes = Rc::new(Cell::new(0));
        let source = CountingSource {
            inner: MemorySource::new(worked_example()),
            closes: Rc::clone(&closes),
        };
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        std::fs::write(&out, "previous").unwrap();

        let regions = vec![
            Region { id: "L1".into(), name: "L1".into() },
            Region { id: "stale".into(), name: "Stale".into() },
        ];
        let fl = FeatureList {
            id: "fl".into(),
            name: "Peaks".into(),
            declared_feature_count: 1,
        };
        let mut rec = Recorder::default();

        let err = export(&source, Path::new("mem"), &out, &regions, &fl, &mut rec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceReadFailure);
        assert_eq!(closes.get(), 1);
        assert_eq!(rec.progress, vec![0, 1]);
        assert_eq!(rec.errors[0].0, ErrorKind::SourceReadFailure);
        assert!(rec.errors[0].1.contains("stale"));
        // destination untouched, no temp file left behind
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "previous");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn successful_export_closes_session_once() {
        let closes = Rc::new(Cell::new(0));
        let source = CountingSource {
            inner: MemorySource::new(worked_example()),
            closes: Rc::clone(&closes),
        };
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");

        let catalog = inspect(&source, Path::new("mem"), &mut ()).unwrap();
        assert_eq!(closes.get(), 1);

        let fl = list(&catalog, "fl").clone();
        export(&source, Path::new("mem"), &out, &catalog.regions, &fl, &mut ()).unwrap();
        assert_eq!(closes.get(), 2);
    }

    #[test]
    fn cyclic_hierarchy_fails_inspection() {
        let mut doc = worked_example();
        doc.regions[1].subregions.push("A".into());
        let mut rec = Recorder::default();

        let err = inspect(&MemorySource::new(doc), Path::new("mem"), &mut rec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedHierarchy);
        assert_eq!(rec.errors[0].0, ErrorKind::MalformedHierarchy);
    }

    #[test]
    fn error_chain_includes_sources() {
        let err = ExportError::read("spots of region X", SourceError::UnknownRegion("X".into()));
        assert_eq!(
            error_chain(&err),
            "failed to read spots of region X from source: unknown region id `X`"
        );
    }
}
