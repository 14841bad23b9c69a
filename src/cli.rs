use argh::FromArgs;

/// Cricket frame tiler: builds the labelled 8x8 tile dataset
#[derive(FromArgs, Debug)]
pub struct Args {
    /// raw frame corpus containing train/ and test/
    #[argh(option, default = "String::from(\"frames_dataset\")")]
    pub corpus: String,

    /// output root for tiles, ledgers and consolidated tables
    #[argh(option, default = "String::from(\"frames_dataset_tiles\")")]
    pub tiles: String,

    /// grid columns
    #[argh(option, default = "8")]
    pub cols: u32,

    /// grid rows
    #[argh(option, default = "8")]
    pub rows: u32,

    /// expected frame width, other sizes are resized
    #[argh(option, default = "800")]
    pub width: u32,

    /// expected frame height, other sizes are resized
    #[argh(option, default = "600")]
    pub height: u32,

    /// number of c1..cN feature placeholder columns
    #[argh(option, default = "64")]
    pub features: usize,

    /// skip writing the grid overlay image
    #[argh(switch)]
    pub no_overlay: bool,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
pub enum Command {
    Build(BuildArgs),
    Consolidate(ConsolidateArgs),
    Manifest(ManifestArgs),
    Stats(StatsArgs),
}

/// tile new frames, initialize their ledgers and consolidate each split
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "build")]
pub struct BuildArgs {
    /// only process this split (train or test)
    #[argh(option)]
    pub split: Option<String>,
}

/// rebuild the consolidated dataset table from the ledgers
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "consolidate")]
pub struct ConsolidateArgs {
    /// only consolidate this split (train or test)
    #[argh(option)]
    pub split: Option<String>,
}

/// regenerate dataset_info.csv from the raw corpus
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "manifest")]
pub struct ManifestArgs {}

/// print the label distribution recorded in the ledgers
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "stats")]
pub struct StatsArgs {
    /// only summarize this split (train or test)
    #[argh(option)]
    pub split: Option<String>,
}
