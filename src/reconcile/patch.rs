//! Hand-maintained address records for places the registry does not list yet.

use hashbrown::HashMap;
use serde::{Deserialize, Deserializer};

use crate::models::{CanonicalAddressRecord, Coordinate};

/// A patch entry as stored in the patch JSON files.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchRecord {
    #[serde(rename = "都道府県コード")]
    pub pref_code: String,
    #[serde(rename = "都道府県名")]
    pub pref_name: String,
    #[serde(rename = "都道府県名カナ", default)]
    pub pref_kana: String,
    #[serde(rename = "都道府県名ローマ字", default)]
    pub pref_romaji: String,
    #[serde(rename = "市区町村コード", default)]
    pub city_code: String,
    #[serde(rename = "市区町村名")]
    pub city_name: String,
    #[serde(rename = "市区町村名カナ", default)]
    pub city_kana: String,
    #[serde(rename = "市区町村名ローマ字", default)]
    pub city_romaji: String,
    #[serde(rename = "大字町丁目名")]
    pub town_name: String,
    #[serde(rename = "大字町丁目名カナ", default)]
    pub town_kana: String,
    #[serde(rename = "大字町丁目名ローマ字", default)]
    pub town_romaji: String,
    #[serde(rename = "小字・通称名", default)]
    pub koaza: String,
    #[serde(rename = "緯度", default, deserialize_with = "lenient_degrees")]
    pub lat: Option<f64>,
    #[serde(rename = "経度", default, deserialize_with = "lenient_degrees")]
    pub lng: Option<f64>,
}

impl PatchRecord {
    pub fn into_canonical(self) -> CanonicalAddressRecord {
        let coordinate = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        };
        CanonicalAddressRecord {
            pref_code: self.pref_code,
            pref_name: self.pref_name,
            pref_kana: self.pref_kana,
            pref_romaji: self.pref_romaji,
            city_code: self.city_code,
            city_name: self.city_name,
            city_kana: self.city_kana,
            city_romaji: self.city_romaji,
            town_name: self.town_name,
            town_kana: self.town_kana,
            town_romaji: self.town_romaji,
            koaza: self.koaza,
            coordinate,
            postal_code: None,
        }
    }
}

/// Coordinates appear as numbers, numeric strings, empty strings or null.
fn lenient_degrees<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Degrees {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Degrees>::deserialize(deserializer)? {
        Some(Degrees::Number(v)) => Some(v),
        Some(Degrees::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Patch records grouped by prefecture code, file order preserved.
#[derive(Debug, Clone, Default)]
pub struct PatchSet {
    by_pref: HashMap<String, Vec<CanonicalAddressRecord>>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = PatchRecord>) -> Self {
        let mut set = Self::new();
        set.extend(records);
        set
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = PatchRecord>) {
        for record in records {
            self.by_pref
                .entry(record.pref_code.clone())
                .or_default()
                .push(record.into_canonical());
        }
    }

    pub fn for_prefecture(&self, pref_code: &str) -> &[CanonicalAddressRecord] {
        self.by_pref
            .get(pref_code)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_pref.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH_JSON: &str = r#"[
        {
            "都道府県コード": "04",
            "都道府県名": "宮城県",
            "都道府県名カナ": "ミヤギケン",
            "都道府県名ローマ字": "MIYAGI KEN",
            "市区町村コード": "04202",
            "市区町村名": "石巻市",
            "市区町村名カナ": "イシノマキシ",
            "市区町村名ローマ字": "ISHINOMAKI SHI",
            "大字町丁目名": "湊西一丁目",
            "大字町丁目名カナ": "ミナトニシ 1",
            "大字町丁目名ローマ字": "MINATONISHI 1",
            "小字・通称名": "",
            "緯度": null,
            "経度": null,
            "参照": "https://example.invalid/place/",
            "更新日": "20210510"
        },
        {
            "都道府県コード": "04",
            "都道府県名": "宮城県",
            "市区町村名": "石巻市",
            "大字町丁目名": "湊西二丁目",
            "緯度": "38.42",
            "経度": 141.3
        }
    ]"#;

    #[test]
    fn test_parse_patch_file() {
        let records: Vec<PatchRecord> = serde_json::from_str(PATCH_JSON).unwrap();
        let set = PatchSet::from_records(records);
        assert_eq!(set.len(), 2);

        let miyagi = set.for_prefecture("04");
        assert_eq!(miyagi[0].town_kana, "ミナトニシ 1");
        assert_eq!(miyagi[0].coordinate, None);
        assert_eq!(miyagi[1].coordinate, Some(Coordinate::new(38.42, 141.3)));
        assert_eq!(miyagi[1].pref_kana, "");
        assert!(set.for_prefecture("13").is_empty());
    }
}
