pub mod cli;
pub mod config;
pub mod consolidate;
pub mod distribution;
pub mod error;
pub mod frame;
pub mod grid;
pub mod imaging;
pub mod label;
pub mod ledger;
pub mod manifest;
pub mod marker;
pub mod pipeline;
pub mod progress;
pub mod split;
pub mod tile_store;
pub mod utils;

pub use config::DatasetConfig;
pub use consolidate::{ConsolidatedTable, Consolidator};
pub use error::DatasetError;
pub use grid::{GridSpec, TilePosition, split_into_grid};
pub use label::LabelCode;
pub use ledger::LabelLedger;
pub use split::Split;
pub use tile_store::TileStore;
