//! Data layer: core types, source sessions, and region handling.
//!
//! Architecture:
//! ```text
//!   .json source document
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → SourceDocument
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  source   │  DataSource::open → Session (region tree, features,
//!   └──────────┘   spots, sparse intensities)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  regions  │  region tree → ordered leaf regions, name check
//!   └──────────┘
//! ```

pub mod loader;
pub mod model;
pub mod regions;
pub mod source;
