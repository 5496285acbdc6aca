//! Joins registry rows to postal reference rows.

use hashbrown::HashMap;
use tracing::debug;

use super::alias::AliasTable;
use super::normalize::{strip_chome_suffix, strip_parenthetical};
use crate::models::{AdministrativeRecord, PostalRecord, RawRow, Reading};

/// One postal table indexed by (prefecture, city), table order preserved.
#[derive(Debug, Clone)]
pub struct PostalIndex {
    reading: Reading,
    by_city: HashMap<String, HashMap<String, Vec<PostalRecord>>>,
    len: usize,
}

impl PostalIndex {
    pub fn new(reading: Reading) -> Self {
        Self {
            reading,
            by_city: HashMap::new(),
            len: 0,
        }
    }

    /// Index raw postal rows; rows without prefecture or city are dropped.
    pub fn build<'r>(reading: Reading, rows: impl IntoIterator<Item = &'r RawRow>) -> Self {
        let mut index = Self::new(reading);
        for row in rows {
            if let Some(record) = PostalRecord::from_row(row, reading) {
                index.push(record);
            }
        }
        index
    }

    pub fn push(&mut self, record: PostalRecord) {
        self.by_city
            .entry(record.pref_name.clone())
            .or_default()
            .entry(record.city_name.clone())
            .or_default()
            .push(record);
        self.len += 1;
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    pub fn city_rows(&self, pref: &str, city: &str) -> &[PostalRecord] {
        self.by_city
            .get(pref)
            .and_then(|cities| cities.get(city))
            .map(|rows| rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The kana and romaji postal tables.
#[derive(Debug, Clone)]
pub struct PostalTables {
    pub kana: PostalIndex,
    pub romaji: PostalIndex,
}

impl PostalTables {
    pub fn build<'r>(
        kana_rows: impl IntoIterator<Item = &'r RawRow>,
        romaji_rows: impl IntoIterator<Item = &'r RawRow>,
    ) -> Self {
        Self {
            kana: PostalIndex::build(Reading::Kana, kana_rows),
            romaji: PostalIndex::build(Reading::Romaji, romaji_rows),
        }
    }

    pub fn empty() -> Self {
        Self {
            kana: PostalIndex::new(Reading::Kana),
            romaji: PostalIndex::new(Reading::Romaji),
        }
    }

    pub fn get(&self, reading: Reading) -> &PostalIndex {
        match reading {
            Reading::Kana => &self.kana,
            Reading::Romaji => &self.romaji,
        }
    }
}

/// How a reading was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// A postal row whose town starts with the registry town
    Town,
    /// Only the city matched; town reading is blank
    CityFallback,
    /// No postal row for the (prefecture, city) pair
    NotFound,
}

/// Readings resolved from one postal table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingMatch {
    pub kind: MatchKind,
    pub pref: String,
    pub city: String,
    pub town: String,
    /// Only set when the town matched
    pub postal_code: Option<String>,
}

impl ReadingMatch {
    fn not_found() -> Self {
        Self {
            kind: MatchKind::NotFound,
            pref: String::new(),
            city: String::new(),
            town: String::new(),
            postal_code: None,
        }
    }
}

/// Kana and romaji matches for one registry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMatch {
    pub kana: ReadingMatch,
    pub romaji: ReadingMatch,
}

impl RecordMatch {
    /// Both tables know the city
    pub fn is_hit(&self) -> bool {
        self.kana.kind != MatchKind::NotFound && self.romaji.kind != MatchKind::NotFound
    }

    pub fn has_fallback(&self) -> bool {
        self.kana.kind == MatchKind::CityFallback || self.romaji.kind == MatchKind::CityFallback
    }

    pub fn postal_code(&self) -> Option<&str> {
        self.kana
            .postal_code
            .as_deref()
            .or(self.romaji.postal_code.as_deref())
    }
}

/// Finds postal readings for registry records.
#[derive(Debug, Clone, Copy)]
pub struct RecordMatcher<'a> {
    aliases: &'a AliasTable,
    tables: &'a PostalTables,
}

impl<'a> RecordMatcher<'a> {
    pub fn new(aliases: &'a AliasTable, tables: &'a PostalTables) -> Self {
        Self { aliases, tables }
    }

    pub fn match_record(&self, record: &AdministrativeRecord) -> RecordMatch {
        self.match_names(&record.pref_name, &record.city_name, &record.town_name)
    }

    pub fn match_names(&self, pref: &str, city: &str, town: &str) -> RecordMatch {
        RecordMatch {
            kana: self.match_reading(Reading::Kana, pref, city, town),
            romaji: self.match_reading(Reading::Romaji, pref, city, town),
        }
    }

    /// Find the readings for (pref, city, town) in one postal table.
    ///
    /// The town is matched by prefix after removing its chome suffix. When no
    /// town matches, the first row of the city is used with the town reading
    /// blanked. The postal tables themselves are never modified.
    pub fn match_reading(&self, reading: Reading, pref: &str, city: &str, town: &str) -> ReadingMatch {
        let resolved = self.aliases.resolve_city(pref, city);
        let stripped = strip_chome_suffix(town);
        let search_town = self.aliases.resolve_town(pref, &stripped);

        let rows = self.tables.get(reading).city_rows(pref, resolved.postal_name);

        // A bare chome designator leaves nothing to prefix-match on
        let town_row = match search_town {
            "" => None,
            t => rows.iter().find(|r| r.town_name.starts_with(t)),
        };

        let mut found = match town_row {
            Some(row) => ReadingMatch {
                kind: MatchKind::Town,
                pref: row.pref_reading.clone(),
                city: row.city_reading.clone(),
                town: row.town_reading.clone(),
                postal_code: Some(row.postal_code.clone()).filter(|c| !c.is_empty()),
            },
            None => match rows.first() {
                Some(row) => {
                    debug!(
                        "No {:?} town match for {}{}{}, using city-level reading",
                        reading, pref, city, town
                    );
                    ReadingMatch {
                        kind: MatchKind::CityFallback,
                        pref: row.pref_reading.clone(),
                        city: row.city_reading.clone(),
                        town: String::new(),
                        postal_code: None,
                    }
                }
                None => return ReadingMatch::not_found(),
            },
        };

        if let Some(city_reading) = resolved.reading_override(reading) {
            found.city = city_reading.to_string();
        }

        if !resolved.is_alias() {
            found.town = strip_parenthetical(&found.town);
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postal(pref: &str, city: &str, town: &str, readings: [&str; 3]) -> PostalRecord {
        PostalRecord {
            postal_code: "1000000".to_string(),
            pref_name: pref.to_string(),
            city_name: city.to_string(),
            town_name: town.to_string(),
            pref_reading: readings[0].to_string(),
            city_reading: readings[1].to_string(),
            town_reading: readings[2].to_string(),
        }
    }

    fn tables() -> PostalTables {
        let mut t = PostalTables::empty();
        t.kana.push(postal("北海道", "札幌市中央区", "旭ケ丘", ["ホッカイドウ", "サッポロシチュウオウク", "アサヒガオカ"]));
        t.romaji.push(postal("北海道", "札幌市中央区", "旭ケ丘", ["HOKKAIDO", "SAPPORO SHI CHUO KU", "ASAHIGAOKA"]));
        t.kana.push(postal("東京都", "八丈島八丈町", "大賀郷", ["トウキョウト", "ハチジョウジマハチジョウマチ", "オオカゴウ"]));
        t.romaji.push(postal("東京都", "八丈島八丈町", "大賀郷", ["TOKYO TO", "HACHIJOJIMA HACHIJO MACHI", "OKAGO"]));
        t.kana.push(postal("奈良県", "奈良市", "中町", ["ナラケン", "ナラシ", "ナカマチ(5115-5149、5171、"]));
        t.romaji.push(postal("奈良県", "奈良市", "中町", ["NARA KEN", "NARA SHI", "NAKAMACHI(5115-5149)"]));
        t.kana.push(postal("東京都", "渋谷区", "千駄ヶ谷", ["トウキョウト", "シブヤク", "センダガヤ"]));
        t.romaji.push(postal("東京都", "渋谷区", "千駄ヶ谷", ["TOKYO TO", "SHIBUYA KU", "SENDAGAYA"]));
        t
    }

    #[test]
    fn test_prefix_match_after_chome_strip() {
        let aliases = AliasTable::builtin();
        let tables = tables();
        let matcher = RecordMatcher::new(&aliases, &tables);

        let m = matcher.match_names("北海道", "札幌市中央区", "旭ケ丘一丁目");
        assert!(m.is_hit());
        assert_eq!(m.kana.kind, MatchKind::Town);
        assert_eq!(m.kana.town, "アサヒガオカ");
        assert_eq!(m.romaji.town, "ASAHIGAOKA");
        assert_eq!(m.kana.pref, "ホッカイドウ");
        assert_eq!(m.postal_code(), Some("1000000"));
    }

    #[test]
    fn test_city_alias_override_wins() {
        let aliases = AliasTable::builtin();
        let tables = tables();
        let matcher = RecordMatcher::new(&aliases, &tables);

        let m = matcher.match_names("東京都", "八丈町", "大賀郷");
        assert_eq!(m.kana.kind, MatchKind::Town);
        assert_eq!(m.kana.city, "ハチジョウマチ");
        assert_eq!(m.romaji.city, "HACHIJO MACHI");
        assert_eq!(m.kana.town, "オオカゴウ");
    }

    #[test]
    fn test_city_fallback_blanks_town() {
        let aliases = AliasTable::builtin();
        let tables = tables();
        let matcher = RecordMatcher::new(&aliases, &tables);

        let m = matcher.match_names("東京都", "八丈町", "三根");
        assert_eq!(m.kana.kind, MatchKind::CityFallback);
        assert_eq!(m.kana.town, "");
        assert_eq!(m.romaji.town, "");
        assert_eq!(m.kana.city, "ハチジョウマチ");
        assert!(m.has_fallback());
        assert_eq!(m.postal_code(), None);

        // The table keeps its reading for a later exact match
        let m = matcher.match_names("東京都", "八丈町", "大賀郷");
        assert_eq!(m.kana.town, "オオカゴウ");
    }

    #[test]
    fn test_parenthetical_stripped() {
        let aliases = AliasTable::builtin();
        let tables = tables();
        let matcher = RecordMatcher::new(&aliases, &tables);

        let m = matcher.match_names("奈良県", "奈良市", "中町");
        assert_eq!(m.kana.town, "ナカマチ");
        assert_eq!(m.romaji.town, "NAKAMACHI");
    }

    #[test]
    fn test_town_alias_applied() {
        let aliases = AliasTable::builtin();
        let tables = tables();
        let matcher = RecordMatcher::new(&aliases, &tables);

        let m = matcher.match_names("東京都", "渋谷区", "千駄ケ谷一丁目");
        assert_eq!(m.kana.kind, MatchKind::Town);
        assert_eq!(m.kana.town, "センダガヤ");
        assert_eq!(m.romaji.town, "SENDAGAYA");
    }

    #[test]
    fn test_bare_chome_falls_back_to_city() {
        let aliases = AliasTable::builtin();
        let tables = tables();
        let matcher = RecordMatcher::new(&aliases, &tables);

        let m = matcher.match_names("北海道", "札幌市中央区", "一丁目");
        assert_eq!(m.kana.kind, MatchKind::CityFallback);
        assert_eq!(m.romaji.kind, MatchKind::CityFallback);
        assert_eq!(m.kana.town, "");
        assert_eq!(m.romaji.city, "SAPPORO SHI CHUO KU");
        assert_eq!(m.postal_code(), None);
    }

    #[test]
    fn test_unknown_city_not_found() {
        let aliases = AliasTable::builtin();
        let tables = tables();
        let matcher = RecordMatcher::new(&aliases, &tables);

        let m = matcher.match_names("長野県", "上伊那郡南箕輪村", "（大字なし）");
        assert!(!m.is_hit());
        assert_eq!(m.kana, ReadingMatch::not_found());
        assert_eq!(m.romaji.city, "");
    }
}
