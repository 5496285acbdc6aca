//! Reads registry and postal CSV files into raw rows.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use banchi::assemble::{join_residences, TownResidences};
use banchi::models::RawRow;
use banchi::reconcile::PrefectureInput;
use banchi::PartitionError;

/// Columns of the headerless kana postal file (KEN_ALL layout).
pub const POSTAL_KANA_COLUMNS: [&str; 15] = [
    "全国地方公共団体コード",
    "旧郵便番号",
    "郵便番号",
    "都道府県名カナ",
    "市区町村名カナ",
    "町域名カナ",
    "都道府県名",
    "市区町村名",
    "町域名",
    "一町域複数番号",
    "小字毎番地",
    "丁目有",
    "複数町域",
    "更新",
    "変更理由",
];

/// Columns of the headerless romaji postal file.
pub const POSTAL_ROMAJI_COLUMNS: [&str; 7] = [
    "郵便番号",
    "都道府県名",
    "市区町村名",
    "町域名",
    "都道府県名ローマ字",
    "市区町村名ローマ字",
    "町域名ローマ字",
];

const RESIDENTIAL_PREFIX: &str = "mt_rsdtdsp_rsdt_";
const RESIDENTIAL_POS_PREFIX: &str = "mt_rsdtdsp_rsdt_pos_";

/// Location of the input files under the data directory.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn postal_kana(&self) -> PathBuf {
        self.root.join("postal").join("ken_all.csv")
    }

    pub fn postal_romaji(&self) -> PathBuf {
        self.root.join("postal").join("ken_all_rome.csv")
    }

    pub fn registry_town(&self, pref_code: &str) -> PathBuf {
        self.root
            .join("registry")
            .join(format!("{}_town.csv", pref_code))
    }

    pub fn registry_block(&self, pref_code: &str) -> PathBuf {
        self.root
            .join("registry")
            .join(format!("{}_block.csv", pref_code))
    }

    pub fn residential_dir(&self) -> PathBuf {
        self.root.join("residential")
    }

    /// Residential files paired with their position files, sorted by name.
    ///
    /// A residence file without a matching position file is skipped.
    pub fn residential_pairs(&self) -> Vec<(PathBuf, PathBuf)> {
        let dir = self.residential_dir();
        if !dir.exists() {
            debug!("No residential directory at {}", dir.display());
            return Vec::new();
        }

        let mut pairs = Vec::new();
        for entry in WalkDir::new(&dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".csv")
                || !name.starts_with(RESIDENTIAL_PREFIX)
                || name.starts_with(RESIDENTIAL_POS_PREFIX)
            {
                continue;
            }

            let pos_name = name.replacen(RESIDENTIAL_PREFIX, RESIDENTIAL_POS_PREFIX, 1);
            let pos_path = path.with_file_name(pos_name);
            if pos_path.exists() {
                pairs.push((path.to_path_buf(), pos_path));
            } else {
                warn!("No position file for {}", path.display());
            }
        }
        info!("Found {} residential file pairs", pairs.len());
        pairs
    }

    /// Both registry files for one prefecture.
    ///
    /// A missing block file is fine; a missing town file fails the
    /// prefecture unless the block file exists.
    pub fn load_prefecture(&self, pref_code: &str) -> Result<PrefectureInput, PartitionError> {
        let town_path = self.registry_town(pref_code);
        let block_path = self.registry_block(pref_code);
        if !town_path.exists() && !block_path.exists() {
            return Err(PartitionError::source_unavailable(
                pref_code,
                format!("no registry file at {}", town_path.display()),
            ));
        }

        let read = |path: &Path| -> Result<Vec<RawRow>, PartitionError> {
            if !path.exists() {
                debug!("No registry file at {}", path.display());
                return Ok(Vec::new());
            }
            read_with_header(path)
                .map_err(|e| PartitionError::source_unavailable(pref_code, format!("{:#}", e)))
        };

        Ok(PrefectureInput::new(
            pref_code,
            read(&town_path)?,
            read(&block_path)?,
        ))
    }
}

/// Read one city's residence and position files and group them by town.
pub fn load_residences(residences: &Path, positions: &Path) -> Result<Vec<TownResidences>> {
    let rows = read_with_header(residences)?;
    let pos_rows = read_with_header(positions)?;
    join_residences(&rows, &pos_rows)
        .with_context(|| format!("Failed to join {}", residences.display()))
}

/// Read a CSV file whose first line names the columns.
pub fn read_with_header(path: &Path) -> Result<Vec<RawRow>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    rows_with_header(file).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Read a headerless CSV file, naming its columns with `columns`.
pub fn read_headerless(path: &Path, columns: &[&str]) -> Result<Vec<RawRow>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let rows = rows_headerless(file, columns)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    info!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn rows_with_header<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.trim_start_matches('\u{feff}').to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn rows_headerless<R: Read>(reader: R, columns: &[&str]) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: RawRow = columns
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}
