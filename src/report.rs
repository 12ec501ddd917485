use std::fmt;
use std::sync::mpsc::Sender;

use crate::data::model::Region;
use crate::error::ErrorKind;

// ---------------------------------------------------------------------------
// Advisory conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    DuplicateRegionNames,
    EmptyRegion,
}

/// A non-fatal condition. Reporting one never changes what gets exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    DuplicateRegionNames { total: usize, unique: usize },
    EmptyRegion { region: Region },
}

impl Warning {
    pub fn kind(&self) -> WarningKind {
        match self {
            Warning::DuplicateRegionNames { .. } => WarningKind::DuplicateRegionNames,
            Warning::EmptyRegion { .. } => WarningKind::EmptyRegion,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DuplicateRegionNames { total, unique } => write!(
                f,
                "Duplicate region names found; rows of same-named regions share a tissue_id. \
                 Total regions: {total}, unique regions: {unique}"
            ),
            Warning::EmptyRegion { region } => {
                write!(f, "Region {region} has no valid spots and was skipped")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Observer: progress, warning and error sinks
// ---------------------------------------------------------------------------

/// Injected sink for everything the core wants to tell its caller.
///
/// Calls are one-way; the core never waits on the observer.
pub trait ExportObserver {
    /// Emitted once per region iterated (discarded ones included), 0-based.
    fn on_region_processed(&mut self, _index: usize) {}

    fn on_warning(&mut self, _warning: &Warning) {}

    fn on_error(&mut self, _kind: ErrorKind, _message: &str) {}
}

/// Discards every notification.
impl ExportObserver for () {}

/// Forwards notifications to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver {
    pub region_count: usize,
}

impl LogObserver {
    pub fn new(region_count: usize) -> Self {
        Self { region_count }
    }
}

impl ExportObserver for LogObserver {
    fn on_region_processed(&mut self, index: usize) {
        log::debug!("Progress: {}/{} regions", index + 1, self.region_count);
    }

    fn on_warning(&mut self, warning: &Warning) {
        match warning.kind() {
            WarningKind::EmptyRegion => log::debug!("{warning}"),
            WarningKind::DuplicateRegionNames => log::warn!("{warning}"),
        }
    }

    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        log::error!("[{kind}] {message}");
    }
}

/// Event form of the observer calls, for callers that drain them on another thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    RegionProcessed(usize),
    Warning(Warning),
    Error { kind: ErrorKind, message: String },
}

/// Sends [`ExportEvent`]s over a channel. A hung-up receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<ExportEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<ExportEvent>) -> Self {
        Self { tx }
    }
}

impl ExportObserver for ChannelObserver {
    fn on_region_processed(&mut self, index: usize) {
        let _ = self.tx.send(ExportEvent::RegionProcessed(index));
    }

    fn on_warning(&mut self, warning: &Warning) {
        let _ = self.tx.send(ExportEvent::Warning(warning.clone()));
    }

    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        let _ = self.tx.send(ExportEvent::Error {
            kind,
            message: message.to_string(),
        });
    }
}
