use crate::cli::Args;
use crate::error::{DatasetError, Result};
use crate::grid::GridSpec;
use crate::split::Split;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = "dataset_info.csv";

/// Everything the dataset components need to know about roots, grid and schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub corpus_root: PathBuf,
    pub tiles_root: PathBuf,
    pub grid: GridSpec,
    pub frame_width: u32,
    pub frame_height: u32,
    pub feature_columns: usize,
    pub image_extensions: Vec<String>,
    pub draw_overlay: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            corpus_root: "frames_dataset".into(),
            tiles_root: "frames_dataset_tiles".into(),
            grid: GridSpec::default(),
            frame_width: 800,
            frame_height: 600,
            feature_columns: 64,
            image_extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
            draw_overlay: true,
        }
    }
}

impl DatasetConfig {
    /// Config rooted at the given corpus and tiles directories, defaults elsewhere
    pub fn with_roots<P: AsRef<Path>, Q: AsRef<Path>>(corpus_root: P, tiles_root: Q) -> Self {
        Self {
            corpus_root: corpus_root.as_ref().to_path_buf(),
            tiles_root: tiles_root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.cols == 0 || self.grid.rows == 0 {
            return Err(DatasetError::InvalidConfig(format!(
                "grid {} has no tiles",
                self.grid
            )));
        }
        let (tile_width, tile_height) = self.tile_size();
        if tile_width == 0 || tile_height == 0 {
            return Err(DatasetError::InvalidConfig(format!(
                "frame {}x{} is smaller than grid {}",
                self.frame_width, self.frame_height, self.grid
            )));
        }
        if self.feature_columns == 0 {
            return Err(DatasetError::InvalidConfig(
                "feature placeholder width must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Tile size in pixels as (width, height) after truncating division
    pub fn tile_size(&self) -> (u32, u32) {
        (
            self.frame_width / self.grid.cols,
            self.frame_height / self.grid.rows,
        )
    }

    pub fn split_corpus_dir(&self, split: Split) -> PathBuf {
        self.corpus_root.join(split.as_str())
    }

    pub fn split_tiles_dir(&self, split: Split) -> PathBuf {
        self.tiles_root.join(split.as_str())
    }

    pub fn consolidated_table_path(&self, split: Split) -> PathBuf {
        self.split_tiles_dir(split)
            .join(format!("objects_{}_dataset.csv", split))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.corpus_root.join(MANIFEST_FILE_NAME)
    }

    /// Whether a file name carries one of the configured image extensions
    pub fn is_frame_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.image_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// Builds the dataset configuration from command line arguments
pub fn build_config(args: &Args) -> anyhow::Result<DatasetConfig> {
    let config = DatasetConfig {
        corpus_root: PathBuf::from(&args.corpus),
        tiles_root: PathBuf::from(&args.tiles),
        grid: GridSpec::new(args.cols, args.rows),
        frame_width: args.width,
        frame_height: args.height,
        feature_columns: args.features,
        draw_overlay: !args.no_overlay,
        ..DatasetConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// Resolves an optional `--split` value into the splits to process
pub fn selected_splits(split: Option<&str>) -> anyhow::Result<Vec<Split>> {
    match split {
        Some(name) => Ok(vec![name.parse::<Split>().map_err(|e| anyhow!(e))?]),
        None => Ok(Split::ALL.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = DatasetConfig::with_roots("corpus", "tiles");
        assert_eq!(config.tile_size(), (100, 75));
        assert_eq!(config.grid.tile_count(), 64);
        assert_eq!(
            config.consolidated_table_path(Split::Train),
            PathBuf::from("tiles/train/objects_train_dataset.csv")
        );
        assert_eq!(config.manifest_path(), PathBuf::from("corpus/dataset_info.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_frame_extension_filter() {
        let config = DatasetConfig::default();
        assert!(config.is_frame_file(Path::new("frame_0001.PNG")));
        assert!(config.is_frame_file(Path::new("frame_0002.jpeg")));
        assert!(!config.is_frame_file(Path::new("frame_0001_labels.csv")));
        assert!(!config.is_frame_file(Path::new("README")));
    }

    #[test]
    fn test_validate_rejects_bad_grid() {
        let mut config = DatasetConfig::default();
        config.grid = GridSpec::new(0, 8);
        assert!(matches!(config.validate(), Err(DatasetError::InvalidConfig(_))));

        let mut config = DatasetConfig::default();
        config.frame_width = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_selected_splits() {
        assert_eq!(selected_splits(None).unwrap(), vec![Split::Train, Split::Test]);
        assert_eq!(selected_splits(Some("test")).unwrap(), vec![Split::Test]);
        assert!(selected_splits(Some("holdout")).is_err());
    }
}
