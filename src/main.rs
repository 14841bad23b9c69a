use anyhow::Result;
use frames2tiles::cli::{self, Command};
use frames2tiles::config::{self, DatasetConfig};
use frames2tiles::consolidate::LedgerWarning;
use frames2tiles::{distribution, manifest, pipeline};

fn run_build(config: &DatasetConfig, split: Option<&str>) -> Result<()> {
    let splits = config::selected_splits(split)?;
    let reports = pipeline::run_build(config, &splits, true)?;

    let mut warnings: Vec<LedgerWarning> = Vec::new();
    for report in &reports {
        println!("\n{}", report);
        warnings.extend(report.ledger_warnings.iter().cloned());
    }
    pipeline::print_ledger_banner(&warnings);

    println!("\nAll label CSVs generated successfully!");
    println!("Existing tiles and ledgers were preserved; new frames default to label 0 (none)");
    Ok(())
}

fn run_consolidate(config: &DatasetConfig, split: Option<&str>) -> Result<()> {
    let mut warnings = Vec::new();
    for split in config::selected_splits(split)? {
        let table = pipeline::consolidate_split(config, split)?;
        println!(
            "Generated labels CSV: {} ({} frames, {} rows)",
            config.consolidated_table_path(split).display(),
            table.frame_count,
            table.rows.len()
        );
        warnings.extend(table.warnings);
    }
    pipeline::print_ledger_banner(&warnings);
    Ok(())
}

fn run_manifest(config: &DatasetConfig) -> Result<()> {
    let entries = manifest::regenerate_manifest(config)?;
    let train = entries
        .iter()
        .filter(|e| e.set_type == frames2tiles::Split::Train)
        .count();
    println!("Dataset info generated successfully!");
    println!("Total train images: {}", train);
    println!("Total test images: {}", entries.len() - train);
    println!("Total images: {}", entries.len());
    println!("CSV file: {}", config.manifest_path().display());
    Ok(())
}

fn run_stats(config: &DatasetConfig, split: Option<&str>) -> Result<()> {
    for split in config::selected_splits(split)? {
        let summary = distribution::summarize(config, split)?;
        println!("\n{}", summary);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args: cli::Args = argh::from_env();
    let config = config::build_config(&args)?;

    match &args.command {
        Command::Build(build) => run_build(&config, build.split.as_deref()),
        Command::Consolidate(consolidate) => run_consolidate(&config, consolidate.split.as_deref()),
        Command::Manifest(_) => run_manifest(&config),
        Command::Stats(stats) => run_stats(&config, stats.split.as_deref()),
    }
}
