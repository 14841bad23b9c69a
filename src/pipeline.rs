use crate::config::DatasetConfig;
use crate::consolidate::{ConsolidatedTable, Consolidator, LedgerWarning};
use crate::frame;
use crate::progress::FrameProgressTracker;
use crate::split::Split;
use crate::tile_store::{MaterializeOutcome, TileStore};
use crate::utils;
use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;

/// A frame that was skipped because of a recoverable error
#[derive(Debug, Clone)]
pub struct FrameFailure {
    pub frame_id: String,
    pub reason: String,
}

/// Outcome of building one split
#[derive(Debug, Clone, Default)]
pub struct SplitReport {
    pub split: Option<Split>,
    pub frames_found: usize,
    pub created: usize,
    pub skipped: usize,
    pub repaired: usize,
    pub failed: Vec<FrameFailure>,
    pub ledger_warnings: Vec<LedgerWarning>,
    pub table_rows: usize,
    pub table_path: PathBuf,
}

impl SplitReport {
    fn record_table(&mut self, table: ConsolidatedTable, path: PathBuf) {
        self.table_rows = table.rows.len();
        self.table_path = path;
        for warning in table.warnings {
            if !self.ledger_warnings.contains(&warning) {
                self.ledger_warnings.push(warning);
            }
        }
    }
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.split.map(|s| s.as_str().to_uppercase()).unwrap_or_default();
        writeln!(f, "{} split - {} frames found", name, self.frames_found)?;
        writeln!(f, "  Created: {} new frames", self.created)?;
        writeln!(f, "  Skipped: {} complete frames", self.skipped)?;
        writeln!(f, "  Repaired: {} partial frames", self.repaired)?;
        writeln!(f, "  Failed: {} frames", self.failed.len())?;
        write!(
            f,
            "  Table: {} ({} rows)",
            self.table_path.display(),
            self.table_rows
        )
    }
}

/// Tiles every frame of a split, initializes new ledgers and rewrites the split's table
///
/// Decode, shape and grid errors skip the frame and the batch carries on; a missing
/// corpus directory or a failing write stops the run.
pub fn build_split(config: &DatasetConfig, split: Split, show_progress: bool) -> Result<SplitReport> {
    let frames = frame::discover_frames(config, split)?;
    let store = TileStore::new(config, split);
    utils::ensure_dir(&store.split_dir())
        .with_context(|| format!("Failed to create {}", store.split_dir().display()))?;

    println!(
        "\nProcessing {} split - {} frames found",
        split.as_str().to_uppercase(),
        frames.len()
    );

    let mut tracker = if show_progress {
        FrameProgressTracker::new(frames.len() as u64, split.as_str())
    } else {
        FrameProgressTracker::hidden(frames.len() as u64)
    };

    let mut report = SplitReport {
        split: Some(split),
        frames_found: frames.len(),
        ..Default::default()
    };

    for frame in &frames {
        match store.ensure_frame(frame) {
            Ok(materialized) => {
                match materialized.outcome {
                    MaterializeOutcome::Created => report.created += 1,
                    MaterializeOutcome::Skipped => report.skipped += 1,
                    MaterializeOutcome::Repaired { .. } => report.repaired += 1,
                }
                if let Some(reason) = materialized.ledger_warning {
                    tracker.println(format!(
                        "WARNING: existing ledger of {} is unreadable and was left as is: {}",
                        frame.id, reason
                    ));
                    report.ledger_warnings.push(LedgerWarning {
                        frame_id: frame.id.clone(),
                        reason,
                    });
                }
            }
            Err(err) if err.is_recoverable() => {
                tracker.println(format!("WARNING: {}: {} - skipping", frame.file_name, err));
                report.failed.push(FrameFailure {
                    frame_id: frame.id.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to tile {}", frame.path.display()));
            }
        }
        tracker.update_frame();
    }
    tracker.finish();

    let table = consolidate_split(config, split)?;
    report.record_table(table, config.consolidated_table_path(split));
    Ok(report)
}

/// Rewrites the consolidated table of a split from its ledgers
pub fn consolidate_split(config: &DatasetConfig, split: Split) -> Result<ConsolidatedTable> {
    let path = config.consolidated_table_path(split);
    let table = Consolidator::new(config)
        .consolidate_and_write(split)
        .with_context(|| format!("Failed to consolidate {} into {}", split, path.display()))?;
    utils::debug_println(format_args!(
        "consolidated {} frames of {} into {} rows",
        table.frame_count,
        split,
        table.rows.len()
    ));
    Ok(table)
}

/// Builds the requested splits in order
pub fn run_build(config: &DatasetConfig, splits: &[Split], show_progress: bool) -> Result<Vec<SplitReport>> {
    splits
        .iter()
        .map(|split| build_split(config, *split, show_progress))
        .collect()
}

/// Repeats every ledger warning after the run so it cannot scroll away unnoticed
pub fn print_ledger_banner(warnings: &[LedgerWarning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!("\n================================================================");
    eprintln!(
        "WARNING: labels of {} frame(s) were NOT carried into the dataset table.",
        warnings.len()
    );
    eprintln!("Their tiles use the default label until the ledger is fixed:");
    for warning in warnings {
        eprintln!("  - {}: {}", warning.frame_id, warning.reason);
    }
    eprintln!("================================================================");
}
