use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::split::Split;
use crate::utils;
use std::fs;
use std::path::PathBuf;

/// One source image of the raw corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// File name without extension, e.g. `frame_0001`
    pub id: String,
    /// File name as found in the corpus, e.g. `frame_0001.png`
    pub file_name: String,
    pub split: Split,
    pub path: PathBuf,
}

impl Frame {
    pub fn from_path(path: PathBuf, split: Split) -> Option<Self> {
        let id = utils::file_stem_string(&path)?;
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            id,
            file_name,
            split,
            path,
        })
    }
}

/// Lists the frames of one split in file name order
///
/// A missing split directory is a corpus error and halts the run.
pub fn discover_frames(config: &DatasetConfig, split: Split) -> Result<Vec<Frame>> {
    let dir = config.split_corpus_dir(split);
    if !dir.is_dir() {
        return Err(DatasetError::CorpusMissing {
            split: split.to_string(),
            path: dir,
        });
    }

    let mut frames: Vec<Frame> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && config.is_frame_file(path))
        .filter_map(|path| Frame::from_path(path, split))
        .collect();
    frames.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    utils::debug_println(format_args!(
        "found {} {} frames in {}",
        frames.len(),
        split,
        dir.display()
    ));
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_frames_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig::with_roots(dir.path().join("corpus"), dir.path().join("tiles"));
        let train = config.split_corpus_dir(Split::Train);
        fs::create_dir_all(&train).unwrap();
        for name in ["frame_0003.png", "frame_0001.PNG", "frame_0002.jpg", "notes.txt"] {
            fs::write(train.join(name), b"").unwrap();
        }
        fs::create_dir_all(train.join("nested.png")).unwrap();

        let frames = discover_frames(&config, Split::Train).unwrap();
        let names: Vec<&str> = frames.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["frame_0001.PNG", "frame_0002.jpg", "frame_0003.png"]);
        assert_eq!(frames[0].id, "frame_0001");
        assert!(frames.iter().all(|f| f.split == Split::Train));
    }

    #[test]
    fn test_missing_split_is_corpus_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig::with_roots(dir.path(), dir.path().join("tiles"));
        let err = discover_frames(&config, Split::Test).unwrap_err();
        assert!(matches!(err, DatasetError::CorpusMissing { .. }));
        assert!(!err.is_recoverable());
    }
}
