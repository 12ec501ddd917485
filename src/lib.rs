//! Export per-spot feature intensities of imaging mass spectrometry regions
//! into a single CSV table.
//!
//! The core is [`export::export`]: for each selected leaf region it builds one
//! dense row block (spot id, x, y, region name, one column per feature) from
//! the source's sparse intensity mappings and writes all blocks under one
//! header.

pub mod data;
pub mod error;
pub mod export;
pub mod report;

pub use data::model::{Feature, FeatureList, Region};
pub use data::source::{DataSource, JsonSource, MemorySource, Session};
pub use error::{ErrorKind, ExportError, SourceError};
pub use export::{export, inspect, ExportSummary, SourceCatalog};
pub use report::{ChannelObserver, ExportEvent, ExportObserver, LogObserver, Warning};
