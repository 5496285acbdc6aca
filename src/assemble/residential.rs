//! Residential addresses (jyukyo hyoji) joined with their positions.
//!
//! Each city ships two files: the residence list and a position file keyed
//! by the same five ids. Residences are grouped by town so they can be
//! hung under the town entries of the address tree.

use hashbrown::HashMap;
use serde::Serialize;
use tracing::debug;

use crate::error::ResidentialError;
use crate::models::{field, Coordinate, RawRow};

/// Column names of the residential and residential-position files.
pub mod columns {
    pub const LG_CODE: &str = "全国地方公共団体コード";
    pub const TOWN_ID: &str = "町字id";
    pub const BLOCK_ID: &str = "街区id";
    pub const RESIDENCE_ID: &str = "住居id";
    pub const RESIDENCE2_ID: &str = "住居2id";
    pub const CITY_NAME: &str = "市区町村名";
    pub const WARD_NAME: &str = "政令市区名";
    pub const OAZA_NAME: &str = "大字・町名";
    pub const CHOME_NAME: &str = "丁目名";
    pub const BLOCK_CODE: &str = "街区符号";
    pub const RESIDENCE_NUMBER: &str = "住居番号";
    pub const CRS: &str = "代表点_座標参照系";
    pub const LAT: &str = "代表点_緯度";
    pub const LNG: &str = "代表点_経度";

    /// Ids that together identify one residence in both files
    pub const KEY: [&str; 5] = [LG_CODE, TOWN_ID, BLOCK_ID, RESIDENCE_ID, RESIDENCE2_ID];
}

/// Coordinate system every position row must use.
pub const EXPECTED_CRS: &str = "EPSG:6668";

/// One residence as written to `住居表示.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidentialItem {
    pub gaiku: String,
    pub jyukyo: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Residences of one town, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct TownResidences {
    pub lg_code: String,
    pub city_name: String,
    pub town_name: String,
    pub items: Vec<ResidentialItem>,
}

impl TownResidences {
    /// Two-digit prefecture code taken from the local government code.
    pub fn pref_code(&self) -> Option<&str> {
        self.lg_code.get(..2)
    }
}

pub fn residence_key(row: &RawRow) -> String {
    columns::KEY
        .iter()
        .map(|c| field(row, c))
        .collect::<Vec<_>>()
        .join("/")
}

/// Index position rows by residence key.
///
/// Rows with unparseable coordinates are left out; a row in any other
/// coordinate system fails the whole file.
pub fn position_index(rows: &[RawRow]) -> Result<HashMap<String, Coordinate>, ResidentialError> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        let key = residence_key(row);
        let crs = field(row, columns::CRS);
        if crs != EXPECTED_CRS {
            return Err(ResidentialError::UnexpectedCrs {
                crs: crs.to_string(),
                key,
            });
        }
        if let Some(c) = Coordinate::parse(field(row, columns::LAT), field(row, columns::LNG)) {
            index.insert(key, c);
        }
    }
    Ok(index)
}

/// Join residences with their positions and group them by town.
pub fn join_residences(
    rows: &[RawRow],
    positions: &[RawRow],
) -> Result<Vec<TownResidences>, ResidentialError> {
    let index = position_index(positions)?;

    let mut towns: Vec<TownResidences> = Vec::new();
    let mut town_pos: HashMap<(String, String), usize> = HashMap::new();
    let mut unplaced = 0;

    for row in rows {
        let city_name = format!(
            "{}{}",
            field(row, columns::CITY_NAME),
            field(row, columns::WARD_NAME)
        );
        let town_name = format!(
            "{}{}",
            field(row, columns::OAZA_NAME),
            field(row, columns::CHOME_NAME)
        );
        if city_name.is_empty() || town_name.is_empty() {
            continue;
        }

        let coordinate = index.get(&residence_key(row));
        if coordinate.is_none() {
            unplaced += 1;
        }
        let item = ResidentialItem {
            gaiku: field(row, columns::BLOCK_CODE).to_string(),
            jyukyo: field(row, columns::RESIDENCE_NUMBER).to_string(),
            lat: coordinate.map(|c| c.lat),
            lng: coordinate.map(|c| c.lng),
        };

        let next = towns.len();
        let idx = *town_pos
            .entry((city_name.clone(), town_name.clone()))
            .or_insert(next);
        if idx == next {
            towns.push(TownResidences {
                lg_code: field(row, columns::LG_CODE).to_string(),
                city_name,
                town_name,
                items: Vec::new(),
            });
        }
        towns[idx].items.push(item);
    }

    if unplaced > 0 {
        debug!("{} residences have no position", unplaced);
    }
    Ok(towns)
}
