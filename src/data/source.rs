use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

use super::loader::{self, SourceDocument};
use super::model::{Feature, FeatureIntensities, FeatureList, RegionTree, SpotSet};
use crate::error::SourceError;

// ---------------------------------------------------------------------------
// Provider interface
// ---------------------------------------------------------------------------

/// Opens sessions on measurement files.
pub trait DataSource {
    type Session: Session;

    fn open(&self, path: &Path) -> Result<Self::Session, SourceError>;
}

/// Read-only view of one opened measurement file.
pub trait Session {
    fn region_tree(&self) -> Result<RegionTree, SourceError>;

    fn feature_lists(&self) -> Result<Vec<FeatureList>, SourceError>;

    /// Member features of a list, in source order.
    fn feature_members(&self, feature_list_id: &str) -> Result<Vec<Feature>, SourceError>;

    fn region_spots(&self, region_id: &str) -> Result<SpotSet, SourceError>;

    /// Sparse intensities of one feature, scoped to one region.
    fn feature_intensities(
        &self,
        feature_id: &str,
        region_id: &str,
    ) -> Result<FeatureIntensities, SourceError>;

    /// Release the session. Must tolerate repeated calls.
    fn close(&mut self);
}

/// Closes the wrapped session when dropped, on success and failure alike.
pub struct SessionGuard<S: Session> {
    session: S,
}

impl<S: Session> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

impl<S: Session> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: Session> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.session.close();
    }
}

// ---------------------------------------------------------------------------
// Document-backed session
// ---------------------------------------------------------------------------

/// Serves a [`SourceDocument`].
#[derive(Debug)]
pub struct DocumentSession {
    doc: Arc<SourceDocument>,
    region_ids: HashSet<String>,
    feature_ids: HashSet<String>,
    closed: bool,
}

impl DocumentSession {
    pub fn new(doc: Arc<SourceDocument>) -> Self {
        let region_ids = doc.regions.iter().map(|n| n.id.clone()).collect();
        let feature_ids = doc
            .feature_lists
            .iter()
            .flat_map(|l| l.features.iter().map(|f| f.id.clone()))
            .chain(doc.intensities.keys().cloned())
            .collect();
        Self {
            doc,
            region_ids,
            feature_ids,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn live(&self) -> Result<&SourceDocument, SourceError> {
        if self.closed {
            Err(SourceError::Closed)
        } else {
            Ok(&*self.doc)
        }
    }

    fn known_region(&self, region_id: &str) -> Result<(), SourceError> {
        if self.region_ids.contains(region_id) {
            Ok(())
        } else {
            Err(SourceError::UnknownRegion(region_id.to_string()))
        }
    }
}

impl Session for DocumentSession {
    fn region_tree(&self) -> Result<RegionTree, SourceError> {
        let doc = self.live()?;
        Ok(RegionTree::new(doc.root.clone(), doc.regions.iter().cloned()))
    }

    fn feature_lists(&self) -> Result<Vec<FeatureList>, SourceError> {
        let doc = self.live()?;
        Ok(doc.feature_lists.iter().map(|l| l.summary()).collect())
    }

    fn feature_members(&self, feature_list_id: &str) -> Result<Vec<Feature>, SourceError> {
        let doc = self.live()?;
        doc.feature_lists
            .iter()
            .find(|l| l.id == feature_list_id)
            .map(|l| l.features.clone())
            .ok_or_else(|| SourceError::UnknownFeatureList(feature_list_id.to_string()))
    }

    fn region_spots(&self, region_id: &str) -> Result<SpotSet, SourceError> {
        let doc = self.live()?;
        self.known_region(region_id)?;
        let spots = doc.spots.get(region_id).cloned().unwrap_or_default();
        if !spots.is_consistent() {
            return Err(SourceError::Inconsistent(format!(
                "region `{region_id}`: {} spot ids, {} x, {} y",
                spots.ids.len(),
                spots.x.len(),
                spots.y.len()
            )));
        }
        Ok(spots)
    }

    fn feature_intensities(
        &self,
        feature_id: &str,
        region_id: &str,
    ) -> Result<FeatureIntensities, SourceError> {
        let doc = self.live()?;
        if !self.feature_ids.contains(feature_id) {
            return Err(SourceError::UnknownFeature(feature_id.to_string()));
        }
        self.known_region(region_id)?;
        let intensities = doc
            .intensities
            .get(feature_id)
            .and_then(|by_region| by_region.get(region_id))
            .cloned()
            .unwrap_or_default();
        if !intensities.is_consistent() {
            return Err(SourceError::Inconsistent(format!(
                "feature `{feature_id}` in region `{region_id}`: {} spot ids, {} values",
                intensities.spot_ids.len(),
                intensities.values.len()
            )));
        }
        Ok(intensities)
    }

    fn close(&mut self) {
        if !self.closed {
            log::debug!("Closing source session");
            self.closed = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Opens source documents from disk (see [`loader::load_file`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSource;

impl DataSource for JsonSource {
    type Session = DocumentSession;

    fn open(&self, path: &Path) -> Result<DocumentSession, SourceError> {
        let doc = loader::load_file(path).map_err(|e| SourceError::Unavailable {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })?;
        log::info!("Opened source {}", path.display());
        Ok(DocumentSession::new(Arc::new(doc)))
    }
}

/// Serves an in-memory document regardless of the requested path.
#[derive(Debug, Clone)]
pub struct MemorySource {
    doc: Arc<SourceDocument>,
}

impl MemorySource {
    pub fn new(doc: SourceDocument) -> Self {
        Self { doc: Arc::new(doc) }
    }
}

impl DataSource for MemorySource {
    type Session = DocumentSession;

    fn open(&self, _path: &Path) -> Result<DocumentSession, SourceError> {
        Ok(DocumentSession::new(Arc::clone(&self.doc)))
    }
}
