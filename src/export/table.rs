use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::catalog::BASE_COLUMNS;
use super::matrix::RowBlock;
use crate::error::{ExportError, Result};

// ---------------------------------------------------------------------------
// ExportTable – concatenated row blocks under one header
// ---------------------------------------------------------------------------

/// All row blocks of one export, in region order, sharing one column set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    columns: Vec<String>,
    blocks: Vec<RowBlock>,
}

impl ExportTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: RowBlock) {
        debug_assert_eq!(block.feature_count() + BASE_COLUMNS.len(), self.columns.len());
        self.blocks.push(block);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn blocks(&self) -> &[RowBlock] {
        &self.blocks
    }

    pub fn row_count(&self) -> usize {
        self.blocks.iter().map(RowBlock::len).sum()
    }

    /// Encode as CSV: header row, then one row per spot. Missing values are
    /// empty cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;

        let mut record: Vec<String> = Vec::with_capacity(self.columns.len());
        for block in &self.blocks {
            for row in 0..block.len() {
                record.clear();
                record.push(block.spot_ids[row].to_string());
                record.push(block.x[row].to_string());
                record.push(block.y[row].to_string());
                record.push(block.tissue_id.clone());
                for column in 0..block.feature_count() {
                    record.push(block.value(row, column).map(format_intensity).unwrap_or_default());
                }
                wtr.write_record(&record)?;
            }
        }

        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Write the table to `path`.
    ///
    /// The data goes to a temporary file next to `path` and is renamed into
    /// place only once fully written; on error `path` is left untouched.
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let output_err = |source: std::io::Error| ExportError::Output {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(output_err)?;
        self.write_csv(tmp.as_file_mut())?;
        tmp.as_file().sync_all().map_err(output_err)?;
        tmp.persist(path).map_err(|e| output_err(e.error))?;
        Ok(())
    }
}

/// Shortest round-trip form, always with a decimal point or exponent
/// (`3.5`, `0.0`, `1e-7`).
pub fn format_intensity(value: f64) -> String {
    format!("{value:?}")
}
