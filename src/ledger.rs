use crate::error::{DatasetError, Result};
use crate::frame::Frame;
use crate::grid::GridSpec;
use crate::label::LabelCode;
use crate::tile_store::TileArtifact;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// One row of a per-frame ledger, column names are a contract with the labelers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    #[serde(rename = "ImageFileName")]
    pub image_file_name: String,
    #[serde(rename = "TrainOrTest")]
    pub train_or_test: String,
    #[serde(rename = "TileIndex")]
    pub tile_index: u32,
    #[serde(rename = "TilePath", default)]
    pub tile_path: Option<String>,
    #[serde(rename = "LabelText", default)]
    pub label_text: String,
    /// Authoritative when present; a blank code falls back to `LabelText`
    #[serde(rename = "LabelCode", default)]
    pub label_code: Option<u8>,
}

/// Result of reading a ledger
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerLoad {
    Loaded(BTreeMap<u32, LabelCode>),
    Absent,
    Unreadable(String),
}

impl LedgerLoad {
    /// Labels by tile index; absent and unreadable ledgers yield no labels
    pub fn labels(&self) -> BTreeMap<u32, LabelCode> {
        match self {
            LedgerLoad::Loaded(labels) => labels.clone(),
            LedgerLoad::Absent | LedgerLoad::Unreadable(_) => BTreeMap::new(),
        }
    }
}

/// Per-frame label table, the unit of manual editing
///
/// The automated pipeline only ever creates a ledger once and reads it afterwards.
#[derive(Debug, Clone)]
pub struct LabelLedger {
    frame_id: String,
    path: PathBuf,
}

impl LabelLedger {
    pub fn new(frame_id: &str, frame_dir: &Path) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            path: frame_dir.join(Self::file_name(frame_id)),
        }
    }

    pub fn file_name(frame_id: &str) -> String {
        format!("{}_labels.csv", frame_id)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the ledger, tolerating a missing or unreadable file
    ///
    /// Only a ledger written for a different grid is an error: its indices cannot
    /// be mapped onto the configured tiles without an explicit migration.
    pub fn load(&self, grid: GridSpec) -> Result<LedgerLoad> {
        if !self.path.exists() {
            return Ok(LedgerLoad::Absent);
        }
        match self.read(grid) {
            Ok(labels) => Ok(LedgerLoad::Loaded(labels)),
            Err(err @ DatasetError::GridMismatch { .. }) => Err(err),
            Err(err) => Ok(LedgerLoad::Unreadable(err.to_string())),
        }
    }

    /// Strictly reads the ledger into a tile index to label map
    pub fn read(&self, grid: GridSpec) -> Result<BTreeMap<u32, LabelCode>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| self.unreadable(e.to_string()))?;

        let mut labels = BTreeMap::new();
        for (line, record) in reader.deserialize::<LedgerRecord>().enumerate() {
            let record = record.map_err(|e| self.unreadable(e.to_string()))?;
            if !grid.contains_index(record.tile_index) {
                return Err(DatasetError::GridMismatch {
                    frame: self.frame_id.clone(),
                    expected: format!("{} ({} tiles)", grid, grid.tile_count()),
                    found: format!("ledger tile index {}", record.tile_index),
                });
            }
            let label = match record.label_code {
                Some(code) => LabelCode::from_code(code).ok_or_else(|| {
                    self.unreadable(format!("row {} has unknown label code {}", line + 2, code))
                })?,
                None => LabelCode::from_text(&record.label_text).ok_or_else(|| {
                    self.unreadable(format!(
                        "row {} has no label code and unknown label text '{}'",
                        line + 2,
                        record.label_text
                    ))
                })?,
            };
            if labels.insert(record.tile_index, label).is_some() {
                return Err(self.unreadable(format!(
                    "tile index {} appears more than once",
                    record.tile_index
                )));
            }
        }
        Ok(labels)
    }

    /// Writes a fresh ledger with every tile labelled `none`
    ///
    /// Fails with `LedgerExists` rather than replace a ledger that is already on disk.
    /// The rows go to a temporary file first, so an interrupted run never leaves a
    /// truncated ledger in place.
    pub fn initialize(&self, frame: &Frame, tiles: &[TileArtifact]) -> Result<()> {
        if self.path.exists() {
            return Err(self.exists_error());
        }
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::Builder::new()
            .prefix(".ledger")
            .suffix(".csv.tmp")
            .tempfile_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            for tile in tiles {
                let label = LabelCode::default();
                writer.serialize(LedgerRecord {
                    image_file_name: frame.file_name.clone(),
                    train_or_test: frame.split.to_string(),
                    tile_index: tile.position.index,
                    tile_path: Some(tile.path.to_string_lossy().into_owned()),
                    label_text: label.text().to_string(),
                    label_code: Some(label.code()),
                })?;
            }
            writer.flush()?;
        }
        tmp.persist_noclobber(&self.path).map_err(|e| match e.error.kind() {
            ErrorKind::AlreadyExists => self.exists_error(),
            _ => DatasetError::Io(e.error),
        })?;
        Ok(())
    }

    fn exists_error(&self) -> DatasetError {
        DatasetError::LedgerExists {
            path: self.path.clone(),
        }
    }

    fn unreadable(&self, reason: String) -> DatasetError {
        DatasetError::LedgerRead {
            path: self.path.clone(),
            reason,
        }
    }
}
