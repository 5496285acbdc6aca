use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use banchi::reconcile::{CityAlias, TownAlias};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub city_aliases: Vec<CityAlias>,
    #[serde(default)]
    pub town_aliases: Vec<TownAlias>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GlobalConfig {
    /// Holds `postal/` and `registry/`
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub patches_dir: PathBuf,
    /// Sort flat rows by codes and readings instead of discovery order
    pub sort_output: bool,
    /// Worker threads; rayon's default when unset
    pub threads: Option<usize>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("out"),
            patches_dir: PathBuf::from("patches"),
            sort_output: true,
            threads: None,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
