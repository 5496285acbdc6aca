//! Registry records and the canonical merged record.

use std::fmt;

use super::{field, RawRow};
use crate::error::RowError;
use crate::reconcile::normalize::{squash_ideographic_space, strip_town_qualifier};

/// Column names used by the address registry CSV files.
pub mod columns {
    pub const PREF_CODE: &str = "都道府県コード";
    pub const PREF_NAME: &str = "都道府県名";
    pub const CITY_CODE: &str = "市区町村コード";
    pub const CITY_NAME: &str = "市区町村名";
    /// Town name at town granularity
    pub const TOWN_NAME: &str = "大字町丁目名";
    /// Town name at block granularity
    pub const BLOCK_TOWN_NAME: &str = "大字・丁目名";
    pub const KOAZA_NAME: &str = "小字・通称名";
    pub const BLOCK_NUMBER: &str = "街区符号・地番";
    pub const LATITUDE: &str = "緯度";
    pub const LONGITUDE: &str = "経度";

    /// Identity columns a town-granularity file must carry
    pub const TOWN_IDENTITY: [&str; 3] = [PREF_NAME, CITY_NAME, TOWN_NAME];
    /// Identity columns a block-granularity file must carry
    pub const BLOCK_IDENTITY: [&str; 3] = [PREF_NAME, CITY_NAME, BLOCK_TOWN_NAME];
}

/// Resolution of a registry source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Town (oaza / chome) level
    Town,
    /// Block (gaiku) level
    Block,
}

impl Granularity {
    /// Column carrying the town name at this granularity
    pub fn town_column(&self) -> &'static str {
        match self {
            Granularity::Town => columns::TOWN_NAME,
            Granularity::Block => columns::BLOCK_TOWN_NAME,
        }
    }

    pub fn identity_columns(&self) -> [&'static str; 3] {
        match self {
            Granularity::Town => columns::TOWN_IDENTITY,
            Granularity::Block => columns::BLOCK_IDENTITY,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Town => write!(f, "town"),
            Granularity::Block => write!(f, "block"),
        }
    }
}

/// Geographic point (lat/lng, degrees)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Parse a raw latitude/longitude pair; anything non-numeric yields `None`.
    pub fn parse(lat: &str, lng: &str) -> Option<Self> {
        let lat: f64 = lat.trim().parse().ok()?;
        let lng: f64 = lng.trim().parse().ok()?;
        if lat.is_finite() && lng.is_finite() {
            Some(Self { lat, lng })
        } else {
            None
        }
    }
}

/// A registry row at either granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct AdministrativeRecord {
    pub granularity: Granularity,
    /// Empty for block rows, which carry no codes
    pub pref_code: String,
    pub pref_name: String,
    /// Empty for block rows
    pub city_code: String,
    pub city_name: String,
    pub town_name: String,
    /// Empty when the row has no koaza
    pub koaza_name: String,
    pub block_number: Option<String>,
    pub coordinate: Option<Coordinate>,
}

impl AdministrativeRecord {
    /// Build a record from a raw registry row.
    ///
    /// Fails when prefecture, city or town is blank. Ideographic spaces in
    /// town and koaza names are removed.
    pub fn from_row(row: &RawRow, granularity: Granularity) -> Result<Self, RowError> {
        let pref_name = required(row, columns::PREF_NAME)?;
        let city_name = required(row, columns::CITY_NAME)?;
        let town_name = squash_ideographic_space(field(row, granularity.town_column()));
        if town_name.is_empty() {
            return Err(RowError::MissingField {
                field: granularity.town_column(),
            });
        }

        let block_number = match field(row, columns::BLOCK_NUMBER) {
            "" => None,
            n => Some(n.to_string()),
        };

        Ok(Self {
            granularity,
            pref_code: field(row, columns::PREF_CODE).to_string(),
            pref_name,
            city_code: field(row, columns::CITY_CODE).to_string(),
            city_name,
            town_name,
            koaza_name: squash_ideographic_space(field(row, columns::KOAZA_NAME)),
            block_number,
            coordinate: Coordinate::parse(
                field(row, columns::LATITUDE),
                field(row, columns::LONGITUDE),
            ),
        })
    }

    pub fn record_key(&self) -> RecordKey {
        RecordKey::new(
            &self.pref_name,
            &self.city_name,
            &self.town_name,
            &self.koaza_name,
        )
    }
}

fn required(row: &RawRow, name: &'static str) -> Result<String, RowError> {
    match field(row, name) {
        "" => Err(RowError::MissingField { field: name }),
        v => Ok(v.to_string()),
    }
}

/// Dedup key: prefecture + city + town (without a leading 大字/字) + koaza.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(pref: &str, city: &str, town: &str, koaza: &str) -> Self {
        Self(format!(
            "{}{}{}{}",
            pref,
            city,
            strip_town_qualifier(town),
            koaza
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One merged output location.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalAddressRecord {
    pub pref_code: String,
    pub pref_name: String,
    pub pref_kana: String,
    pub pref_romaji: String,
    pub city_code: String,
    pub city_name: String,
    pub city_kana: String,
    pub city_romaji: String,
    pub town_name: String,
    pub town_kana: String,
    pub town_romaji: String,
    pub koaza: String,
    pub coordinate: Option<Coordinate>,
    /// Postal code of the postal row the town matched, if any
    pub postal_code: Option<String>,
}

impl CanonicalAddressRecord {
    pub fn record_key(&self) -> RecordKey {
        RecordKey::new(&self.pref_name, &self.city_name, &self.town_name, &self.koaza)
    }
}

/// A block-granularity location for the block tree.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntry {
    pub pref_name: String,
    pub city_name: String,
    pub town_name: String,
    pub block_number: String,
    pub coordinate: Coordinate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_record_key_strips_oaza_qualifier() {
        let a = RecordKey::new("長野県", "長野市", "大字篠ノ井塩崎", "");
        let b = RecordKey::new("長野県", "長野市", "篠ノ井塩崎", "");
        let c = RecordKey::new("長野県", "長野市", "字篠ノ井塩崎", "");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "長野県長野市篠ノ井塩崎");
    }

    #[test]
    fn test_record_key_includes_koaza() {
        let a = RecordKey::new("長野県", "長野市", "篠ノ井塩崎", "四之宮");
        assert_eq!(a.as_str(), "長野県長野市篠ノ井塩崎四之宮");
    }

    #[test]
    fn test_from_town_row() {
        let r = row(&[
            ("都道府県コード", "01"),
            ("都道府県名", "北海道"),
            ("市区町村コード", "01632"),
            ("市区町村名", "河東郡士幌町"),
            ("大字町丁目名", "字士幌　仲通"),
            ("緯度", "43.168944"),
            ("経度", "143.246195"),
        ]);
        let rec = AdministrativeRecord::from_row(&r, Granularity::Town).unwrap();
        assert_eq!(rec.town_name, "字士幌仲通");
        assert_eq!(rec.city_code, "01632");
        assert_eq!(rec.koaza_name, "");
        assert_eq!(rec.coordinate, Some(Coordinate::new(43.168944, 143.246195)));
    }

    #[test]
    fn test_from_block_row_uses_block_columns() {
        let r = row(&[
            ("都道府県名", "長野県"),
            ("市区町村名", "長野市"),
            ("大字・丁目名", "篠ノ井塩崎"),
            ("小字・通称名", "四之宮"),
            ("街区符号・地番", "12"),
            ("緯度", "36.555444"),
            ("経度", "138.10524"),
        ]);
        let rec = AdministrativeRecord::from_row(&r, Granularity::Block).unwrap();
        assert_eq!(rec.town_name, "篠ノ井塩崎");
        assert_eq!(rec.koaza_name, "四之宮");
        assert_eq!(rec.block_number.as_deref(), Some("12"));
        assert_eq!(rec.pref_code, "");
    }

    #[test]
    fn test_missing_identity_field() {
        let r = row(&[("都道府県名", "長野県"), ("市区町村名", "長野市")]);
        let err = AdministrativeRecord::from_row(&r, Granularity::Town).unwrap_err();
        assert_eq!(err, RowError::MissingField { field: "大字町丁目名" });

        let r = row(&[("都道府県名", "長野県"), ("大字町丁目名", "篠ノ井塩崎")]);
        let err = AdministrativeRecord::from_row(&r, Granularity::Town).unwrap_err();
        assert_eq!(err, RowError::MissingField { field: "市区町村名" });
    }

    #[test]
    fn test_unparseable_coordinate_is_none() {
        assert_eq!(Coordinate::parse("", "138.1"), None);
        assert_eq!(Coordinate::parse("abc", "138.1"), None);
        assert_eq!(
            Coordinate::parse(" 36.5 ", "138.1"),
            Some(Coordinate::new(36.5, 138.1))
        );
    }
}
