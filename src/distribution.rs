use crate::config::DatasetConfig;
use crate::error::Result;
use crate::label::LabelCode;
use crate::ledger::LedgerLoad;
use crate::split::Split;
use crate::tile_store::TileStore;
use std::collections::BTreeMap;
use std::fmt;

/// Label counts recorded in the ledgers of one split
#[derive(Debug, Clone, Default)]
pub struct LabelDistribution {
    pub split: Option<Split>,
    pub counts: BTreeMap<LabelCode, usize>,
    pub frames: usize,
    pub frames_without_objects: usize,
    pub unreadable_ledgers: Vec<String>,
}

impl LabelDistribution {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn percentage(&self, label: LabelCode) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.counts.get(&label).copied().unwrap_or(0) as f64 * 100.0 / total as f64
    }
}

/// Counts labels across every ledger of a split
pub fn summarize(config: &DatasetConfig, split: Split) -> Result<LabelDistribution> {
    let store = TileStore::new(config, split);
    let mut summary = LabelDistribution {
        split: Some(split),
        ..Default::default()
    };

    for frame_id in store.tiled_frames()? {
        let labels = match store.ledger(&frame_id).load(config.grid)? {
            LedgerLoad::Loaded(labels) => labels,
            LedgerLoad::Absent => continue,
            LedgerLoad::Unreadable(_) => {
                summary.unreadable_ledgers.push(frame_id);
                continue;
            }
        };

        summary.frames += 1;
        if labels.values().all(|label| *label == LabelCode::None) {
            summary.frames_without_objects += 1;
        }
        for label in labels.values() {
            *summary.counts.entry(*label).or_insert(0) += 1;
        }
    }
    Ok(summary)
}

impl fmt::Display for LabelDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.split.map(|s| s.as_str().to_uppercase()).unwrap_or_default();
        writeln!(f, "{} SPLIT SUMMARY", name)?;
        for label in LabelCode::ALL {
            let count = self.counts.get(&label).copied().unwrap_or(0);
            writeln!(
                f,
                "Code {} ({:<6}): {:6} ({:5.2}%)",
                label.code(),
                label.text(),
                count,
                self.percentage(label)
            )?;
        }
        write!(
            f,
            "Frames with NO objects: {} out of {}",
            self.frames_without_objects, self.frames
        )?;
        if !self.unreadable_ledgers.is_empty() {
            write!(
                f,
                "\nUnreadable ledgers: {}",
                self.unreadable_ledgers.join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use image::{Rgb, RgbImage};
    use std::fs;

    #[test]
    fn test_summarize_counts_labels() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DatasetConfig::with_roots(dir.path().join("corpus"), dir.path().join("tiles"));
        config.frame_width = 80;
        config.frame_height = 60;
        config.draw_overlay = false;

        let store = TileStore::new(&config, Split::Train);
        for id in ["frame_0001", "frame_0002"] {
            let frame = Frame {
                id: id.to_string(),
                file_name: format!("{}.png", id),
                split: Split::Train,
                path: config.split_corpus_dir(Split::Train).join(format!("{}.png", id)),
            };
            store
                .materialize(&frame, &RgbImage::from_pixel(80, 60, Rgb([0, 0, 0])))
                .unwrap();
        }
        let path = store.ledger("frame_0002").path().to_path_buf();
        let content = fs::read_to_string(&path)
            .unwrap()
            .replace("tile_01.png,none,0", "tile_01.png,ball,1")
            .replace("tile_02.png,none,0", "tile_02.png,stump,3");
        fs::write(&path, content).unwrap();

        let summary = summarize(&config, Split::Train).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.frames_without_objects, 1);
        assert_eq!(summary.total(), 128);
        assert_eq!(summary.counts.get(&LabelCode::Ball), Some(&1));
        assert_eq!(summary.counts.get(&LabelCode::Stump), Some(&1));
        assert_eq!(summary.counts.get(&LabelCode::None), Some(&126));
        assert!((summary.percentage(LabelCode::Ball) - 100.0 / 128.0).abs() < 1e-9);

        let text = summary.to_string();
        assert!(text.starts_with("TRAIN SPLIT SUMMARY"));
        assert!(text.contains("Frames with NO objects: 1 out of 2"));
    }
}
