//! Writes the flat CSV and the JSON tree.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use banchi::assemble::{flat_rows, header_line, AddressTree};
use banchi::CanonicalAddressRecord;

/// Write `latest.csv` with a quoted header line.
pub fn write_flat_csv(path: &Path, records: &[CanonicalAddressRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", header_line())?;
    for row in flat_rows(records) {
        writeln!(out, "{}", row.to_csv_line())?;
    }
    out.flush()?;

    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

/// File name of a town's residential-address list.
pub const RESIDENTIAL_FILE: &str = "住居表示.json";

/// Write `ja.json` and the per-city and per-town files under `api_dir/ja`.
pub fn write_tree(api_dir: &Path, tree: &AddressTree) -> Result<()> {
    let base = api_dir.join("ja");
    fs::create_dir_all(&base)?;
    write_json(&api_dir.join("ja.json"), &tree.city_index())?;

    let mut city_files = 0;
    let mut town_files = 0;
    let mut residential_files = 0;
    for pref in tree.prefectures() {
        let pref_dir = base.join(&pref.name);
        for city in &pref.cities {
            if !city.towns.is_empty() {
                fs::create_dir_all(&pref_dir)?;
                write_json(&pref_dir.join(format!("{}.json", city.name)), &city.towns)?;
                city_files += 1;
            }

            let city_dir = pref_dir.join(&city.name);
            for (town, blocks) in city.town_blocks() {
                fs::create_dir_all(&city_dir)?;
                write_json(&city_dir.join(format!("{}.json", town)), &blocks)?;
                town_files += 1;
            }

            for (town, items) in city.residences() {
                let town_dir = city_dir.join(town);
                fs::create_dir_all(&town_dir)?;
                write_json(&town_dir.join(RESIDENTIAL_FILE), &items)?;
                residential_files += 1;
            }
        }
    }

    info!(
        "Wrote {} city files, {} town files and {} residential files under {}",
        city_files,
        town_files,
        residential_files,
        base.display()
    );
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer(&mut out, value)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    out.flush()?;
    Ok(())
}
