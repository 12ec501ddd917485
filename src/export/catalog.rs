use crate::data::model::{Feature, FeatureList};
use crate::data::source::Session;
use crate::error::{ExportError, Result};

/// Columns present in every export, ahead of the feature columns.
pub const BASE_COLUMNS: [&str; 4] = ["spotId", "x", "y", "tissue_id"];

// ---------------------------------------------------------------------------
// FeatureCatalog – the resolved column set of one export
// ---------------------------------------------------------------------------

/// Member features of the selected list, in source order.
///
/// The order is the output column order and stays fixed for the whole export.
/// An empty catalog is valid and yields only the base columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCatalog {
    features: Vec<Feature>,
}

impl FeatureCatalog {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Ask the session for the members of `list`.
    pub fn resolve<S: Session + ?Sized>(session: &S, list: &FeatureList) -> Result<Self> {
        let features = session
            .feature_members(&list.id)
            .map_err(|e| ExportError::read(format!("members of feature list `{}`", list.name), e))?;

        if features.len() != list.declared_feature_count {
            log::debug!(
                "Feature list `{}` declares {} features, source returned {}",
                list.name,
                list.declared_feature_count,
                features.len()
            );
        }
        log::info!("Resolved {} features from list `{}`", features.len(), list.name);
        Ok(Self { features })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Full header: base columns, then feature names.
    pub fn columns(&self) -> Vec<String> {
        BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.features.iter().map(|f| f.name.clone()))
            .collect()
    }
}
