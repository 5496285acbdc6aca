//! Name aliases between the address registry and the postal tables.
//!
//! The registry and the postal tables spell some cities and towns
//! differently (renames, ヶ/ケ variants, island prefixes). The table is
//! built once at startup and shared read-only.

use hashbrown::HashMap;
use serde::Deserialize;

use crate::models::Reading;

/// City spelled `official` in the registry and `postal` in the postal tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CityAlias {
    pub pref: String,
    pub official: String,
    pub postal: String,
    /// Replaces the postal table's city kana
    #[serde(default)]
    pub kana: Option<String>,
    /// Replaces the postal table's city romaji
    #[serde(default)]
    pub romaji: Option<String>,
}

impl CityAlias {
    pub fn new(pref: &str, official: &str, postal: &str) -> Self {
        Self {
            pref: pref.to_string(),
            official: official.to_string(),
            postal: postal.to_string(),
            kana: None,
            romaji: None,
        }
    }

    pub fn with_readings(mut self, kana: &str, romaji: &str) -> Self {
        self.kana = Some(kana.to_string());
        self.romaji = Some(romaji.to_string());
        self
    }

    pub fn reading_override(&self, reading: Reading) -> Option<&str> {
        match reading {
            Reading::Kana => self.kana.as_deref(),
            Reading::Romaji => self.romaji.as_deref(),
        }
    }
}

/// Chome-stripped town spelled `official` in the registry and `postal` in the postal tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TownAlias {
    pub pref: String,
    pub official: String,
    pub postal: String,
}

impl TownAlias {
    pub fn new(pref: &str, official: &str, postal: &str) -> Self {
        Self {
            pref: pref.to_string(),
            official: official.to_string(),
            postal: postal.to_string(),
        }
    }
}

/// Result of a city lookup.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCity<'a> {
    /// City name to search for in the postal tables
    pub postal_name: &'a str,
    pub alias: Option<&'a CityAlias>,
}

impl<'a> ResolvedCity<'a> {
    pub fn is_alias(&self) -> bool {
        self.alias.is_some()
    }

    pub fn reading_override(&self, reading: Reading) -> Option<&'a str> {
        self.alias.and_then(|a| a.reading_override(reading))
    }
}

/// Exact-match alias lookup keyed by prefecture, then official name.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    cities: HashMap<String, HashMap<String, CityAlias>>,
    towns: HashMap<String, HashMap<String, TownAlias>>,
}

impl AliasTable {
    /// Empty table: every name resolves to itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Known differences between the registry and the postal tables.
    pub fn builtin() -> Self {
        Self::new()
            .with_city_aliases([
                CityAlias::new("青森県", "東津軽郡外ケ浜町", "東津軽郡外ヶ浜町"),
                CityAlias::new("茨城県", "龍ヶ崎市", "龍ケ崎市"),
                CityAlias::new("千葉県", "鎌ヶ谷市", "鎌ケ谷市"),
                CityAlias::new("千葉県", "袖ヶ浦市", "袖ケ浦市"),
                CityAlias::new("東京都", "三宅村", "三宅島三宅村")
                    .with_readings("ミヤケムラ", "MIYAKE MURA"),
                CityAlias::new("東京都", "八丈町", "八丈島八丈町")
                    .with_readings("ハチジョウマチ", "HACHIJO MACHI"),
                CityAlias::new("滋賀県", "犬上郡大字多賀町", "犬上郡多賀町")
                    .with_readings("イヌカミグンオオアザタガチョウ", "INUKAMI GUN OAZA TAGA CHO"),
                CityAlias::new("兵庫県", "篠山市", "丹波篠山市"),
                CityAlias::new("福岡県", "筑紫郡那珂川町", "那珂川市"),
                CityAlias::new("福岡県", "糟屋郡須恵町", "糟屋郡須惠町"),
            ])
            .with_town_aliases([
                TownAlias::new("東京都", "富ケ谷", "富ヶ谷"),
                TownAlias::new("東京都", "幡ケ谷", "幡ヶ谷"),
                TownAlias::new("東京都", "千駄ケ谷", "千駄ヶ谷"),
            ])
    }

    /// Append city aliases; an existing entry for the same (pref, official) is kept.
    pub fn with_city_aliases(mut self, aliases: impl IntoIterator<Item = CityAlias>) -> Self {
        for alias in aliases {
            self.cities
                .entry(alias.pref.clone())
                .or_default()
                .entry(alias.official.clone())
                .or_insert(alias);
        }
        self
    }

    /// Append town aliases; an existing entry for the same (pref, official) is kept.
    pub fn with_town_aliases(mut self, aliases: impl IntoIterator<Item = TownAlias>) -> Self {
        for alias in aliases {
            self.towns
                .entry(alias.pref.clone())
                .or_default()
                .entry(alias.official.clone())
                .or_insert(alias);
        }
        self
    }

    pub fn resolve_city<'a>(&'a self, pref: &str, city: &'a str) -> ResolvedCity<'a> {
        match self.cities.get(pref).and_then(|m| m.get(city)) {
            Some(alias) => ResolvedCity {
                postal_name: &alias.postal,
                alias: Some(alias),
            },
            None => ResolvedCity {
                postal_name: city,
                alias: None,
            },
        }
    }

    /// Postal spelling of a chome-stripped town name.
    pub fn resolve_town<'a>(&'a self, pref: &str, town: &'a str) -> &'a str {
        self.towns
            .get(pref)
            .and_then(|m| m.get(town))
            .map(|alias| alias.postal.as_str())
            .unwrap_or(town)
    }

    pub fn city_alias_count(&self) -> usize {
        self.cities.values().map(|m| m.len()).sum()
    }

    pub fn town_alias_count(&self) -> usize {
        self.towns.values().map(|m| m.len()).sum()
    }
}
