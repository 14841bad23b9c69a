use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::frame;
use crate::split::Split;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One row of `dataset_info.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub image_path: String,
    pub set_type: Split,
}

/// Scans both splits of the corpus; fails fast if either split directory is missing
///
/// Paths are relative to the corpus root's parent, e.g. `frames_dataset/train/frame_0001.png`,
/// train entries first, each split sorted by file name.
pub fn build_manifest(config: &DatasetConfig) -> Result<Vec<ManifestEntry>> {
    for split in Split::ALL {
        let dir = config.split_corpus_dir(split);
        if !dir.is_dir() {
            return Err(DatasetError::CorpusMissing {
                split: split.to_string(),
                path: dir,
            });
        }
    }

    let base = config
        .corpus_root
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut entries = Vec::new();
    for split in Split::ALL {
        for frame in frame::discover_frames(config, split)? {
            entries.push(ManifestEntry {
                image_path: relative_display(&frame.path, &base),
                set_type: split,
            });
        }
    }
    Ok(entries)
}

/// Writes the manifest from scratch, replacing whatever was there
pub fn write_manifest(entries: &[ManifestEntry], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if entries.is_empty() {
        writer.write_record(["image_path", "set_type"])?;
    }
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

/// Builds and writes `<corpus>/dataset_info.csv`, returning the entries written
pub fn regenerate_manifest(config: &DatasetConfig) -> Result<Vec<ManifestEntry>> {
    let entries = build_manifest(config)?;
    write_manifest(&entries, &config.manifest_path())?;
    Ok(entries)
}

fn relative_display(path: &Path, base: &Path) -> String {
    let relative: PathBuf = path
        .strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf());
    relative.to_string_lossy().into_owned()
}
