use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::frame::Frame;
use crate::grid::{self, TilePosition};
use crate::imaging;
use crate::ledger::{LabelLedger, LedgerLoad};
use crate::marker::{MARKER_FILE_NAME, TileMarker};
use crate::split::Split;
use crate::utils;
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

const FRAME_DIR_SUFFIX: &str = "_tiles";
const STAGING_SUFFIX: &str = ".partial";

/// A tile file and the grid cell it was cut from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileArtifact {
    pub position: TilePosition,
    pub path: PathBuf,
}

/// State of a frame directory on disk
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Marker present and written for the configured grid
    Complete(TileMarker),
    /// Directory present without a valid marker: a legacy layout or an interrupted run
    Partial,
    Absent,
}

/// What `materialize` did for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// Already complete, nothing written
    Skipped,
    /// Built in a staging directory and moved into place
    Created,
    /// Existing directory completed in place without touching existing files
    Repaired {
        tiles_written: usize,
        ledger_initialized: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Materialized {
    pub outcome: MaterializeOutcome,
    pub tiles: Vec<TileArtifact>,
    /// Set when an existing ledger could not be read during repair
    pub ledger_warning: Option<String>,
}

/// Owns the tile artifacts of one split:
/// `<tiles_root>/<split>/<frame>_tiles/tile_NN.png` plus the frame's ledger and marker
pub struct TileStore<'a> {
    config: &'a DatasetConfig,
    split: Split,
}

impl<'a> TileStore<'a> {
    pub fn new(config: &'a DatasetConfig, split: Split) -> Self {
        Self { config, split }
    }

    pub fn split_dir(&self) -> PathBuf {
        self.config.split_tiles_dir(self.split)
    }

    pub fn frame_dir(&self, frame_id: &str) -> PathBuf {
        self.split_dir().join(format!("{}{}", frame_id, FRAME_DIR_SUFFIX))
    }

    fn staging_dir(&self, frame_id: &str) -> PathBuf {
        self.split_dir()
            .join(format!(".{}{}{}", frame_id, FRAME_DIR_SUFFIX, STAGING_SUFFIX))
    }

    pub fn tile_file_name(index: u32) -> String {
        format!("tile_{:02}.png", index)
    }

    pub fn tile_path(&self, frame_id: &str, index: u32) -> PathBuf {
        self.frame_dir(frame_id).join(Self::tile_file_name(index))
    }

    /// Final tile paths for a frame in ascending index order
    pub fn tile_artifacts(&self, frame_id: &str) -> Vec<TileArtifact> {
        self.config
            .grid
            .positions()
            .map(|position| TileArtifact {
                position,
                path: self.tile_path(frame_id, position.index),
            })
            .collect()
    }

    pub fn ledger(&self, frame_id: &str) -> LabelLedger {
        LabelLedger::new(frame_id, &self.frame_dir(frame_id))
    }

    pub fn marker_path(&self, frame_id: &str) -> PathBuf {
        self.frame_dir(frame_id).join(MARKER_FILE_NAME)
    }

    pub fn overlay_file_name(frame_id: &str) -> String {
        format!("{}_grid_overlay.png", frame_id)
    }

    /// Sentinel probe on the first tile only
    ///
    /// Says nothing about the other tiles or the ledger; skip decisions use
    /// `completion` instead.
    pub fn tiles_exist(&self, frame_id: &str) -> bool {
        self.tile_path(frame_id, 1).is_file()
    }

    pub fn completion(&self, frame_id: &str) -> Result<Completion> {
        let marker_path = self.marker_path(frame_id);
        if marker_path.is_file() {
            match TileMarker::read(&marker_path) {
                Ok(marker) => {
                    marker.ensure_grid(self.config.grid)?;
                    return Ok(Completion::Complete(marker));
                }
                Err(err) => {
                    utils::warn_println(format_args!("{}, treating frame as partial", err));
                    return Ok(Completion::Partial);
                }
            }
        }
        if self.frame_dir(frame_id).is_dir() {
            Ok(Completion::Partial)
        } else {
            Ok(Completion::Absent)
        }
    }

    /// Frame ids with a tile directory in this split, in lexicographic order
    ///
    /// A directory counts once it holds the sentinel tile, a marker or a ledger, so
    /// labels of a frame whose tiles went missing still reach the table.
    pub fn tiled_frames(&self) -> Result<Vec<String>> {
        let dir = self.split_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut frame_ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(STAGING_SUFFIX) {
                continue;
            }
            let Some(frame_id) = name.strip_suffix(FRAME_DIR_SUFFIX) else {
                continue;
            };
            if self.tiles_exist(frame_id)
                || self.marker_path(frame_id).is_file()
                || self.ledger(frame_id).exists()
            {
                frame_ids.push(frame_id.to_string());
            }
        }
        frame_ids.sort();
        Ok(frame_ids)
    }

    /// Decodes and tiles a frame unless it is already complete
    pub fn ensure_frame(&self, frame: &Frame) -> Result<Materialized> {
        if let Completion::Complete(_) = self.completion(&frame.id)? {
            return Ok(self.skipped(&frame.id));
        }
        let image =
            imaging::load_frame(&frame.path, self.config.frame_width, self.config.frame_height)?;
        self.materialize(frame, &image)
    }

    /// Writes the tiles, the initial ledger and the completion marker of one frame
    ///
    /// Complete frames are left untouched. A new frame is assembled in a staging
    /// directory and renamed into place only when everything has been written, so an
    /// interrupted run never leaves a half-built frame directory behind. An existing
    /// directory without a marker is completed in place: existing tiles are kept as
    /// they are and an existing ledger is never replaced.
    pub fn materialize(&self, frame: &Frame, image: &RgbImage) -> Result<Materialized> {
        match self.completion(&frame.id)? {
            Completion::Complete(_) => Ok(self.skipped(&frame.id)),
            Completion::Absent => self.create(frame, image),
            Completion::Partial => self.repair(frame, image),
        }
    }

    fn skipped(&self, frame_id: &str) -> Materialized {
        utils::debug_println(format_args!("skipping {} - tiles already complete", frame_id));
        Materialized {
            outcome: MaterializeOutcome::Skipped,
            tiles: self.tile_artifacts(frame_id),
            ledger_warning: None,
        }
    }

    /// Splits the frame and converts every tile before anything is written
    fn cut_tiles(&self, frame: &Frame, image: &RgbImage) -> Result<Vec<RgbImage>> {
        let grid = self.config.grid;
        let pixels = imaging::rgb_to_array(image)?;
        let tiles = grid::split_into_grid(pixels.view().into_dyn(), grid.cols, grid.rows)?;
        if tiles.len() != grid.tile_count() {
            return Err(DatasetError::Shape {
                frame: frame.id.clone(),
                expected: grid.tile_count(),
                actual: tiles.len(),
            });
        }

        let images: Vec<RgbImage> = tiles.iter().filter_map(imaging::array_to_rgb).collect();
        if images.len() != grid.tile_count() {
            return Err(DatasetError::Shape {
                frame: frame.id.clone(),
                expected: grid.tile_count(),
                actual: images.len(),
            });
        }
        Ok(images)
    }

    fn create(&self, frame: &Frame, image: &RgbImage) -> Result<Materialized> {
        let tile_images = self.cut_tiles(frame, image)?;
        let artifacts = self.tile_artifacts(&frame.id);

        let staging = StagingDir::create(self.staging_dir(&frame.id))?;
        for (artifact, tile) in artifacts.iter().zip(&tile_images) {
            tile.save(staging.path().join(Self::tile_file_name(artifact.position.index)))?;
        }
        if self.config.draw_overlay {
            imaging::render_grid_overlay(image, self.config.grid)
                .save(staging.path().join(Self::overlay_file_name(&frame.id)))?;
        }
        LabelLedger::new(&frame.id, staging.path()).initialize(frame, &artifacts)?;
        TileMarker::new(&frame.id, self.split, self.config.grid)
            .write(&staging.path().join(MARKER_FILE_NAME))?;
        staging.commit(&self.frame_dir(&frame.id))?;

        utils::debug_println(format_args!(
            "created {} tiles for {}",
            artifacts.len(),
            frame.id
        ));
        Ok(Materialized {
            outcome: MaterializeOutcome::Created,
            tiles: artifacts,
            ledger_warning: None,
        })
    }

    fn repair(&self, frame: &Frame, image: &RgbImage) -> Result<Materialized> {
        let ledger = self.ledger(&frame.id);
        // a ledger cut for another grid must fail before any file is added
        let ledger_warning = match ledger.load(self.config.grid)? {
            LedgerLoad::Unreadable(reason) => Some(reason),
            LedgerLoad::Loaded(_) | LedgerLoad::Absent => None,
        };

        let tile_images = self.cut_tiles(frame, image)?;
        let artifacts = self.tile_artifacts(&frame.id);

        let mut tiles_written = 0;
        for (artifact, tile) in artifacts.iter().zip(&tile_images) {
            if !artifact.path.is_file() {
                imaging::save_png_atomic(tile, &artifact.path)?;
                tiles_written += 1;
            }
        }

        let overlay_path = self.frame_dir(&frame.id).join(Self::overlay_file_name(&frame.id));
        if self.config.draw_overlay && !overlay_path.is_file() {
            imaging::save_png_atomic(
                &imaging::render_grid_overlay(image, self.config.grid),
                &overlay_path,
            )?;
        }

        let ledger_initialized = if ledger.path().exists() {
            false
        } else {
            ledger.initialize(frame, &artifacts)?;
            true
        };

        TileMarker::new(&frame.id, self.split, self.config.grid)
            .write(&self.marker_path(&frame.id))?;

        utils::debug_println(format_args!(
            "repaired {}: {} tiles written, ledger initialized: {}",
            frame.id, tiles_written, ledger_initialized
        ));
        Ok(Materialized {
            outcome: MaterializeOutcome::Repaired {
                tiles_written,
                ledger_initialized,
            },
            tiles: artifacts,
            ledger_warning,
        })
    }
}

/// Staging directory removed on drop unless committed
struct StagingDir {
    path: PathBuf,
    committed: bool,
}

impl StagingDir {
    /// Creates an empty staging directory, clearing leftovers of an interrupted run
    fn create(path: PathBuf) -> Result<Self> {
        if path.exists() {
            utils::debug_println(format_args!(
                "removing stale staging directory {}",
                path.display()
            ));
            fs::remove_dir_all(&path)?;
        }
        utils::ensure_dir(&path)?;
        Ok(Self {
            path,
            committed: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self, target: &Path) -> Result<()> {
        fs::rename(&self.path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
