use crate::consolidate::TABLE_SCHEMA_VERSION;
use crate::error::{DatasetError, Result};
use crate::grid::GridSpec;
use crate::ledger::LEDGER_SCHEMA_VERSION;
use crate::split::Split;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

pub const MARKER_FILE_NAME: &str = ".tiles_complete.json";

/// Written last into a frame directory once every tile and the ledger exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMarker {
    pub ledger_schema: u32,
    pub table_schema: u32,
    pub frame_id: String,
    pub split: Split,
    pub grid: GridSpec,
    pub tile_count: usize,
    pub completed_at: DateTime<Utc>,
}

impl TileMarker {
    pub fn new(frame_id: &str, split: Split, grid: GridSpec) -> Self {
        Self {
            ledger_schema: LEDGER_SCHEMA_VERSION,
            table_schema: TABLE_SCHEMA_VERSION,
            frame_id: frame_id.to_string(),
            split,
            grid,
            tile_count: grid.tile_count(),
            completed_at: Utc::now(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|source| DatasetError::Marker {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the marker through a temporary file so it is either whole or absent
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::Builder::new()
            .prefix(".marker")
            .tempfile_in(dir)?;
        let json = serde_json::to_vec_pretty(self).map_err(|source| DatasetError::Marker {
            path: path.to_path_buf(),
            source,
        })?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| DatasetError::Io(e.error))?;
        Ok(())
    }

    /// Rejects a marker written for another grid
    pub fn ensure_grid(&self, grid: GridSpec) -> Result<()> {
        if self.grid != grid || self.tile_count != grid.tile_count() {
            return Err(DatasetError::GridMismatch {
                frame: self.frame_id.clone(),
                expected: grid.to_string(),
                found: format!("{} ({} tiles)", self.grid, self.tile_count),
            });
        }
        Ok(())
    }
}
