mod config;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;

use config::{Cli, Command, ExportArgs};
use spot_export::{export, inspect, FeatureList, JsonSource, LogObserver, Region};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Inspect { source } => run_inspect(&source),
        Command::Export(args) => run_export(&args),
    }
}

fn run_inspect(source: &Path) -> Result<()> {
    let catalog = inspect(&JsonSource, source, &mut LogObserver::default())
        .with_context(|| format!("inspecting {}", source.display()))?;

    println!("Feature lists ({}):", catalog.feature_lists.len());
    for list in &catalog.feature_lists {
        println!(
            "  {:<32} {:<24} {} features",
            list.name, list.id, list.declared_feature_count
        );
    }
    println!("Leaf regions ({}):", catalog.regions.len());
    for region in &catalog.regions {
        println!("  {:<32} {}", region.name, region.id);
    }
    Ok(())
}

fn run_export(args: &ExportArgs) -> Result<()> {
    let catalog = inspect(&JsonSource, &args.source, &mut LogObserver::default())
        .with_context(|| format!("inspecting {}", args.source.display()))?;

    let feature_list = select_feature_list(&catalog.feature_lists, &args.feature_list)?;
    let regions = select_regions(&catalog.regions, &args.regions)?;
    if regions.is_empty() {
        bail!("No regions found in the source file. Please add regions and try again.");
    }

    log::info!(
        "Export started: {} regions, feature list `{}`",
        regions.len(),
        feature_list.name
    );
    let summary = export(
        &JsonSource,
        &args.source,
        &args.output,
        &regions,
        feature_list,
        &mut LogObserver::new(regions.len()),
    )
    .with_context(|| format!("exporting to {}", args.output.display()))?;

    println!(
        "Wrote {} rows ({} columns) to {}",
        summary.rows_written,
        summary.columns.len(),
        args.output.display()
    );
    println!(
        "Processed {} regions, {} without spots",
        summary.regions_processed,
        summary.discarded.len()
    );
    Ok(())
}

/// Match by id first, then by name.
fn select_feature_list<'a>(lists: &'a [FeatureList], wanted: &str) -> Result<&'a FeatureList> {
    if lists.is_empty() {
        bail!("No feature lists found in the source file. Please add features and try again.");
    }
    lists
        .iter()
        .find(|l| l.id == wanted)
        .or_else(|| lists.iter().find(|l| l.name == wanted))
        .with_context(|| {
            let names: Vec<&str> = lists.iter().map(|l| l.name.as_str()).collect();
            format!("Feature list `{wanted}` not found; available: {names:?}")
        })
}

/// Keep regions whose display name is in `names`, in tree order. No names keeps all.
fn select_regions(regions: &[Region], names: &[String]) -> Result<Vec<Region>> {
    if names.is_empty() {
        return Ok(regions.to_vec());
    }
    if let Some(missing) = names.iter().find(|n| !regions.iter().any(|r| &r.name == *n)) {
        bail!("Region `{missing}` not found among the leaf regions");
    }
    Ok(regions
        .iter()
        .filter(|r| names.contains(&r.name))
        .cloned()
        .collect())
}
