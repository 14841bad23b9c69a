use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building the tile dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("corpus directory for split '{split}' not found: {}", path.display())]
    CorpusMissing { split: String, path: PathBuf },

    #[error("failed to decode frame {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("frame '{frame}' produced {actual} tiles, expected {expected}")]
    Shape {
        frame: String,
        expected: usize,
        actual: usize,
    },

    #[error("image buffer has {0} dimension(s), at least 2 spatial dimensions are required")]
    Dimensionality(usize),

    #[error("pixel buffer does not fit a {width}x{height} RGB frame: {source}")]
    Buffer {
        width: u32,
        height: u32,
        #[source]
        source: ndarray::ShapeError,
    },

    #[error("ledger {} is unreadable: {reason}", path.display())]
    LedgerRead { path: PathBuf, reason: String },

    #[error("ledger {} already exists and is never overwritten", path.display())]
    LedgerExists { path: PathBuf },

    #[error("frame '{frame}' was tiled as {found}, configured grid is {expected}; migrate it explicitly")]
    GridMismatch {
        frame: String,
        expected: String,
        found: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("completion marker {} is invalid: {source}", path.display())]
    Marker {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl DatasetError {
    /// Per-frame failures that skip the frame and let the batch continue
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DatasetError::Decode { .. }
                | DatasetError::Shape { .. }
                | DatasetError::Buffer { .. }
                | DatasetError::LedgerRead { .. }
                | DatasetError::GridMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let shape = DatasetError::Shape {
            frame: "frame_0001".to_string(),
            expected: 64,
            actual: 63,
        };
        assert!(shape.is_recoverable());

        let corpus = DatasetError::CorpusMissing {
            split: "train".to_string(),
            path: PathBuf::from("frames_dataset/train"),
        };
        assert!(!corpus.is_recoverable());
        assert!(corpus.to_string().contains("frames_dataset/train"));
    }

    #[test]
    fn test_buffer_mismatch_is_a_frame_error() {
        let err = DatasetError::Buffer {
            width: 800,
            height: 600,
            source: ndarray::ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape),
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().starts_with("pixel buffer does not fit a 800x600 RGB frame"));
    }
}
