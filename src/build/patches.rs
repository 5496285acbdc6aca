use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use banchi::reconcile::{PatchRecord, PatchSet};

/// Load every `*.json` patch file under `dir`, in file-name order.
pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<PatchSet> {
    let dir = dir.as_ref();
    let mut set = PatchSet::new();
    if !dir.exists() {
        warn!("Patch directory not found: {}", dir.display());
        return Ok(set);
    }

    info!("Loading patches from {}", dir.display());

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }

    for path in files {
        set.extend(load_file(&path)?);
    }

    info!("Loaded {} patch records", set.len());
    Ok(set)
}

fn load_file(path: &Path) -> Result<Vec<PatchRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read patch file: {}", path.display()))?;
    let records: Vec<PatchRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse patch file: {}", path.display()))?;
    Ok(records)
}
