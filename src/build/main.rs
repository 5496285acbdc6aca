//! Address build pipeline.
//!
//! Reads the postal tables and the per-prefecture registry files, reconciles
//! every prefecture in parallel and writes the flat CSV and the JSON API tree,
//! with residential addresses hung under their towns when present.

mod config;
mod output;
mod patches;
mod source;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use banchi::assemble::{sort_records, AddressTree};
use banchi::{AliasTable, PostalTables, Reconciler};

use crate::config::Config;
use crate::source::{
    load_residences, read_headerless, DataLayout, POSTAL_KANA_COLUMNS, POSTAL_ROMAJI_COLUMNS,
};

#[derive(Parser, Debug)]
#[command(name = "banchi-build")]
#[command(about = "Build the address dataset from the registry and postal tables")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefecture codes to process, e.g. "01,13" (default: all 47)
    #[arg(long, value_delimiter = ',')]
    prefs: Vec<String>,

    /// Override the data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Override the patch directory
    #[arg(long)]
    patches_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Banchi Build Pipeline");

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = args.data_dir {
        config.global.data_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.global.output_dir = dir;
    }
    if let Some(dir) = args.patches_dir {
        config.global.patches_dir = dir;
    }
    let global = &config.global;

    if let Some(threads) = global.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let aliases = AliasTable::builtin()
        .with_city_aliases(config.city_aliases.clone())
        .with_town_aliases(config.town_aliases.clone());
    info!(
        "Alias table: {} cities, {} towns",
        aliases.city_alias_count(),
        aliases.town_alias_count()
    );

    let layout = DataLayout::new(&global.data_dir);
    let kana_rows = read_headerless(&layout.postal_kana(), &POSTAL_KANA_COLUMNS)?;
    let romaji_rows = read_headerless(&layout.postal_romaji(), &POSTAL_ROMAJI_COLUMNS)?;
    let postal = PostalTables::build(&kana_rows, &romaji_rows);
    drop(kana_rows);
    drop(romaji_rows);
    info!(
        "Indexed {} kana and {} romaji postal rows",
        postal.kana.len(),
        postal.romaji.len()
    );

    let patch_set = patches::load_from_dir(&global.patches_dir)?;

    let pref_codes: Vec<String> = if args.prefs.is_empty() {
        (1..=47).map(|n| format!("{:02}", n)).collect()
    } else {
        args.prefs
            .iter()
            .map(|c| format!("{:0>2}", c.trim()))
            .collect()
    };
    info!("Processing {} prefectures", pref_codes.len());

    let pb = ProgressBar::new(pref_codes.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let reconciler = Reconciler::new(&aliases, &postal).with_patches(&patch_set);
    let report = reconciler.reconcile_all(
        &pref_codes,
        |code| layout.load_prefecture(code),
        |outcome| {
            pb.set_message(outcome.pref_code.clone());
            pb.inc(1);
        },
    );
    pb.finish_with_message("done");

    let totals = report.totals();
    for failed in &totals.failed {
        error!("Prefecture {} failed: {}", failed.pref_code, failed.error);
    }
    if report.all_failed() {
        anyhow::bail!("All {} prefectures failed", pref_codes.len());
    }

    let mut records: Vec<_> = report.records().cloned().collect();
    if global.sort_output {
        sort_records(&mut records);
    }

    output::write_flat_csv(&global.output_dir.join("latest.csv"), &records)?;
    let mut tree = AddressTree::build(&records, report.blocks());

    let pairs = layout.residential_pairs();
    if !pairs.is_empty() {
        let loaded: Vec<_> = pairs
            .par_iter()
            .map(|(residences, positions)| load_residences(residences, positions))
            .collect();
        for ((path, _), result) in pairs.iter().zip(loaded) {
            match result {
                Ok(towns) => {
                    let summary = tree.attach_residences(&towns);
                    info!(
                        "{}: {} residences in {} towns ({} towns skipped)",
                        path.display(),
                        summary.items,
                        summary.towns,
                        summary.skipped.len()
                    );
                }
                Err(e) => warn!("Skipping residential file {}: {:#}", path.display(), e),
            }
        }
    }

    output::write_tree(&global.output_dir.join("api"), &tree)?;

    info!(
        "Finished: {} records from {} prefectures (hit {}, nohit {}, fallbacks {}, rejected {}, patched {})",
        totals.records,
        totals.partitions_ok,
        totals.hit,
        totals.nohit,
        totals.town_fallbacks,
        totals.rejected_rows,
        totals.patched
    );
    if !totals.unmatched.is_empty() {
        warn!("No postal readings for {} cities", totals.unmatched.len());
    }
    if !totals.failed.is_empty() {
        warn!(
            "Partial build: {} of {} prefectures failed",
            totals.failed.len(),
            pref_codes.len()
        );
    }

    Ok(())
}
