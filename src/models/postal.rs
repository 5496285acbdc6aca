//! Postal-code reference records (kana and romaji tables).

use super::{field, RawRow};
use crate::reconcile::normalize::{half_to_full_width_kana, squash_ideographic_space};

/// Column names of the postal reference tables.
pub mod columns {
    pub const POSTAL_CODE: &str = "郵便番号";
    pub const PREF_NAME: &str = "都道府県名";
    pub const CITY_NAME: &str = "市区町村名";
    pub const TOWN_NAME: &str = "町域名";
    pub const PREF_KANA: &str = "都道府県名カナ";
    pub const CITY_KANA: &str = "市区町村名カナ";
    pub const TOWN_KANA: &str = "町域名カナ";
    pub const PREF_ROMAJI: &str = "都道府県名ローマ字";
    pub const CITY_ROMAJI: &str = "市区町村名ローマ字";
    pub const TOWN_ROMAJI: &str = "町域名ローマ字";
}

/// Which reading a postal table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reading {
    /// Phonetic (katakana)
    Kana,
    /// Latin transliteration
    Romaji,
}

impl Reading {
    /// Column names for the (prefecture, city, town) readings
    pub fn reading_columns(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Reading::Kana => (columns::PREF_KANA, columns::CITY_KANA, columns::TOWN_KANA),
            Reading::Romaji => (
                columns::PREF_ROMAJI,
                columns::CITY_ROMAJI,
                columns::TOWN_ROMAJI,
            ),
        }
    }
}

/// A single row of a postal reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalRecord {
    pub postal_code: String,
    pub pref_name: String,
    pub city_name: String,
    pub town_name: String,
    pub pref_reading: String,
    pub city_reading: String,
    pub town_reading: String,
}

impl PostalRecord {
    /// Build a postal record from a raw row.
    ///
    /// Kana readings come half-width in the source and are widened here.
    /// Returns `None` for rows without a prefecture or city.
    pub fn from_row(row: &RawRow, reading: Reading) -> Option<Self> {
        let pref_name = field(row, columns::PREF_NAME);
        let city_name = squash_ideographic_space(field(row, columns::CITY_NAME));
        if pref_name.is_empty() || city_name.is_empty() {
            return None;
        }

        let (pref_col, city_col, town_col) = reading.reading_columns();
        let widen = |s: &str| match reading {
            Reading::Kana => half_to_full_width_kana(s),
            Reading::Romaji => s.to_string(),
        };

        Some(Self {
            postal_code: field(row, columns::POSTAL_CODE).to_string(),
            pref_name: pref_name.to_string(),
            city_name,
            town_name: field(row, columns::TOWN_NAME).to_string(),
            pref_reading: widen(field(row, pref_col)),
            city_reading: widen(field(row, city_col)),
            town_reading: widen(field(row, town_col)),
        })
    }
}
