use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::grid::TilePosition;
use crate::label::LabelCode;
use crate::ledger::LedgerLoad;
use crate::split::Split;
use crate::tile_store::{Completion, TileStore};
use crate::utils;
use std::io::Write;
use std::path::Path;

pub const TABLE_SCHEMA_VERSION: u32 = 1;

const IDENTITY_COLUMNS: [&str; 5] = ["image_filename", "cell_number", "cell_row", "cell_col", "label"];
const FEATURE_DEFAULT: &str = "0.0";

/// One tile row of the consolidated dataset table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    pub image_filename: String,
    pub position: TilePosition,
    pub label: LabelCode,
}

/// A frame whose labels could not be carried over and fell back to defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerWarning {
    pub frame_id: String,
    pub reason: String,
}

/// The wide per-split table handed to training
#[derive(Debug, Clone)]
pub struct ConsolidatedTable {
    pub split: Split,
    pub frame_count: usize,
    pub feature_columns: usize,
    pub rows: Vec<DatasetRow>,
    pub warnings: Vec<LedgerWarning>,
}

impl ConsolidatedTable {
    pub fn header(&self) -> Vec<String> {
        IDENTITY_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain((1..=self.feature_columns).map(|i| format!("c{}", i)))
            .collect()
    }

    /// Replaces the table file at `path` in one rename
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        utils::ensure_dir(dir)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".dataset")
            .suffix(".csv.tmp")
            .tempfile_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer.write_record(self.header())?;

            let features = vec![FEATURE_DEFAULT; self.feature_columns];
            for row in &self.rows {
                let mut record = vec![
                    row.image_filename.clone(),
                    row.position.index.to_string(),
                    row.position.row.to_string(),
                    row.position.col.to_string(),
                    row.label.code().to_string(),
                ];
                record.extend(features.iter().map(|f| f.to_string()));
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().flush()?;
        tmp.persist(path).map_err(|e| DatasetError::Io(e.error))?;
        Ok(())
    }
}

/// Folds every per-frame ledger of a split into the consolidated table
pub struct Consolidator<'a> {
    config: &'a DatasetConfig,
}

impl<'a> Consolidator<'a> {
    pub fn new(config: &'a DatasetConfig) -> Self {
        Self { config }
    }

    /// Name the training side uses for a frame's rows
    pub fn image_filename(frame_id: &str) -> String {
        TileStore::overlay_file_name(frame_id)
    }

    /// Builds the table for one split from the frames present in the tile store
    ///
    /// Frames come in lexicographic order of their id and tiles in ascending index
    /// order. A tile without a ledger entry gets the default label. Any frame cut
    /// for a different grid fails the whole split so the previous table survives.
    pub fn consolidate(&self, split: Split) -> Result<ConsolidatedTable> {
        let store = TileStore::new(self.config, split);
        let grid = self.config.grid;
        let frame_ids = store.tiled_frames()?;

        let mut rows = Vec::with_capacity(frame_ids.len() * grid.tile_count());
        let mut warnings = Vec::new();

        for frame_id in &frame_ids {
            if let Completion::Complete(marker) = store.completion(frame_id)? {
                utils::debug_println(format_args!(
                    "{} completed at {}",
                    frame_id, marker.completed_at
                ));
            }

            let load = store.ledger(frame_id).load(grid)?;
            match &load {
                LedgerLoad::Loaded(_) => {}
                LedgerLoad::Absent => warnings.push(LedgerWarning {
                    frame_id: frame_id.clone(),
                    reason: "ledger missing, all tiles default to none".to_string(),
                }),
                LedgerLoad::Unreadable(reason) => {
                    utils::warn_println(format_args!(
                        "labels of {} could not be read and are reset to none in the table: {}",
                        frame_id, reason
                    ));
                    warnings.push(LedgerWarning {
                        frame_id: frame_id.clone(),
                        reason: reason.clone(),
                    });
                }
            }

            let labels = load.labels();
            let image_filename = Self::image_filename(frame_id);
            rows.extend(grid.positions().map(|position| DatasetRow {
                image_filename: image_filename.clone(),
                position,
                label: labels.get(&position.index).copied().unwrap_or_default(),
            }));
        }

        Ok(ConsolidatedTable {
            split,
            frame_count: frame_ids.len(),
            feature_columns: self.config.feature_columns,
            rows,
            warnings,
        })
    }

    /// Consolidates a split and overwrites its table file
    pub fn consolidate_and_write(&self, split: Split) -> Result<ConsolidatedTable> {
        let table = self.consolidate(split)?;
        table.write_csv(&self.config.consolidated_table_path(split))?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::grid::GridSpec;
    use image::{Rgb, RgbImage};
    use std::fs;

    fn setup() -> (tempfile::TempDir, DatasetConfig) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DatasetConfig::with_roots(dir.path().join("corpus"), dir.path().join("tiles"));
        config.frame_width = 80;
        config.frame_height = 60;
        config.draw_overlay = false;
        (dir, config)
    }

    fn tile_frame(config: &DatasetConfig, split: Split, id: &str) {
        let frame = Frame {
            id: id.to_string(),
            file_name: format!("{}.png", id),
            split,
            path: config.split_corpus_dir(split).join(format!("{}.png", id)),
        };
        TileStore::new(config, split)
            .materialize(&frame, &RgbImage::from_pixel(80, 60, Rgb([9, 9, 9])))
            .unwrap();
    }

    fn set_label(config: &DatasetConfig, split: Split, id: &str, index: u32, label: LabelCode) {
        let store = TileStore::new(config, split);
        let path = store.ledger(id).path().to_path_buf();
        let from = format!("tile_{:02}.png,none,0", index);
        let to = format!("tile_{:02}.png,{},{}", index, label.text(), label.code());
        let content = fs::read_to_string(&path).unwrap().replace(&from, &to);
        fs::write(&path, content).unwrap();
    }

    #[test]
    fn test_rows_per_frame_and_order() {
        let (_dir, config) = setup();
        for id in ["frame_0003", "frame_0001", "frame_0002"] {
            tile_frame(&config, Split::Train, id);
        }

        let table = Consolidator::new(&config).consolidate(Split::Train).unwrap();
        assert_eq!(table.frame_count, 3);
        assert_eq!(table.rows.len(), 64 * 3);
        assert!(table.warnings.is_empty());

        let keys: Vec<(String, u32)> = table
            .rows
            .iter()
            .map(|r| (r.image_filename.clone(), r.position.index))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(table.rows[0].image_filename, "frame_0001_grid_overlay.png");
        assert_eq!(table.rows[63].position, TilePosition { index: 64, row: 8, col: 8 });
    }

    #[test]
    fn test_ledger_labels_are_carried_over() {
        let (_dir, config) = setup();
        tile_frame(&config, Split::Train, "frame_0001");
        set_label(&config, Split::Train, "frame_0001", 5, LabelCode::Ball);

        // re-running the tile store must not reset the edit
        tile_frame(&config, Split::Train, "frame_0001");

        let table = Consolidator::new(&config).consolidate(Split::Train).unwrap();
        let tile5 = table.rows.iter().find(|r| r.position.index == 5).unwrap();
        assert_eq!(tile5.label, LabelCode::Ball);
        assert_eq!(
            table.rows.iter().filter(|r| r.label != LabelCode::None).count(),
            1
        );
    }

    #[test]
    fn test_labels_survive_lost_tiles_and_marker() {
        let (_dir, config) = setup();
        tile_frame(&config, Split::Train, "frame_0001");
        set_label(&config, Split::Train, "frame_0001", 5, LabelCode::Ball);
        let store = TileStore::new(&config, Split::Train);
        fs::remove_file(store.marker_path("frame_0001")).unwrap();
        fs::remove_file(store.tile_path("frame_0001", 1)).unwrap();

        let table = Consolidator::new(&config).consolidate(Split::Train).unwrap();
        assert_eq!(table.frame_count, 1);
        assert_eq!(table.rows.len(), 64);
        assert_eq!(table.rows[4].label, LabelCode::Ball);
    }

    #[test]
    fn test_missing_ledger_rows_default_to_none() {
        let (_dir, config) = setup();
        tile_frame(&config, Split::Test, "frame_0001");
        let store = TileStore::new(&config, Split::Test);
        let path = store.ledger("frame_0001").path().to_path_buf();
        fs::write(
            &path,
            "ImageFileName,TrainOrTest,TileIndex,TilePath,LabelText,LabelCode\n\
             frame_0001.png,test,3,,stump,3\n",
        )
        .unwrap();

        let table = Consolidator::new(&config).consolidate(Split::Test).unwrap();
        assert_eq!(table.rows.len(), 64);
        assert_eq!(table.rows[2].label, LabelCode::Stump);
        assert!(table.rows.iter().filter(|r| r.position.index != 3).all(|r| r.label == LabelCode::None));
    }

    #[test]
    fn test_unreadable_ledger_is_reported() {
        let (_dir, config) = setup();
        tile_frame(&config, Split::Train, "frame_0001");
        let path = TileStore::new(&config, Split::Train)
            .ledger("frame_0001")
            .path()
            .to_path_buf();
        fs::write(&path, "garbage\n1\n").unwrap();

        let table = Consolidator::new(&config).consolidate(Split::Train).unwrap();
        assert_eq!(table.rows.len(), 64);
        assert_eq!(table.warnings.len(), 1);
        assert_eq!(table.warnings[0].frame_id, "frame_0001");
    }

    #[test]
    fn test_grid_change_fails_split_and_keeps_previous_table() {
        let (_dir, mut config) = setup();
        tile_frame(&config, Split::Train, "frame_0001");
        let consolidator = Consolidator::new(&config);
        consolidator.consolidate_and_write(Split::Train).unwrap();
        let table_path = config.consolidated_table_path(Split::Train);
        let before = fs::read(&table_path).unwrap();

        config.grid = GridSpec::new(4, 4);
        let err = Consolidator::new(&config)
            .consolidate_and_write(Split::Train)
            .unwrap_err();
        assert!(matches!(err, DatasetError::GridMismatch { .. }));
        assert_eq!(fs::read(&table_path).unwrap(), before);
    }

    #[test]
    fn test_written_table_schema() {
        let (_dir, config) = setup();
        tile_frame(&config, Split::Train, "frame_0001");
        set_label(&config, Split::Train, "frame_0001", 10, LabelCode::Bat);

        let table = Consolidator::new(&config)
            .consolidate_and_write(Split::Train)
            .unwrap();
        assert_eq!(table.header().len(), 5 + 64);

        let content = fs::read_to_string(config.consolidated_table_path(Split::Train)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1 + 64);
        assert!(lines[0].starts_with("image_filename,cell_number,cell_row,cell_col,label,c1,c2,"));
        assert!(lines[0].ends_with(",c64"));
        let row10: Vec<&str> = lines[10].split(',').collect();
        assert_eq!(&row10[..5], &["frame_0001_grid_overlay.png", "10", "2", "2", "2"]);
        assert_eq!(row10.len(), 69);
        assert!(row10[5..].iter().all(|v| *v == "0.0"));
    }

    #[test]
    fn test_empty_split_yields_header_only() {
        let (_dir, config) = setup();
        let table = Consolidator::new(&config)
            .consolidate_and_write(Split::Test)
            .unwrap();
        assert!(table.rows.is_empty());
        let content = fs::read_to_string(config.consolidated_table_path(Split::Test)).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
