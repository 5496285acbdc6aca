//! Flat 14-column rows.

use std::cmp::Ordering;

use crate::models::CanonicalAddressRecord;

/// Column order of the flat output.
pub const FLAT_HEADER: [&str; 14] = [
    "都道府県コード",
    "都道府県名",
    "都道府県名カナ",
    "都道府県名ローマ字",
    "市区町村コード",
    "市区町村名",
    "市区町村名カナ",
    "市区町村名ローマ字",
    "大字町丁目名",
    "大字町丁目名カナ",
    "大字町丁目名ローマ字",
    "小字・通称名",
    "緯度",
    "経度",
];

/// One output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn text(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    fn number(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }

    /// Text is double-quoted with inner quotes doubled; numbers and empty
    /// cells are written bare.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => format!("\"{}\"", s.replace('"', "\"\"")),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// A record laid out in `FLAT_HEADER` order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow(pub [Cell; 14]);

impl FlatRow {
    pub fn from_record(r: &CanonicalAddressRecord) -> Self {
        let lat = r.coordinate.map(|c| c.lat);
        let lng = r.coordinate.map(|c| c.lng);
        FlatRow([
            Cell::text(&r.pref_code),
            Cell::text(&r.pref_name),
            Cell::text(&r.pref_kana),
            Cell::text(&r.pref_romaji),
            Cell::text(&r.city_code),
            Cell::text(&r.city_name),
            Cell::text(&r.city_kana),
            Cell::text(&r.city_romaji),
            Cell::text(&r.town_name),
            Cell::text(&r.town_kana),
            Cell::text(&r.town_romaji),
            Cell::text(&r.koaza),
            Cell::number(lat),
            Cell::number(lng),
        ])
    }

    pub fn to_csv_line(&self) -> String {
        self.0
            .iter()
            .map(Cell::render)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Header line, every name quoted.
pub fn header_line() -> String {
    FLAT_HEADER
        .iter()
        .map(|name| Cell::Text(name.to_string()).render())
        .collect::<Vec<_>>()
        .join(",")
}

/// Flat rows in the order the records are given.
pub fn flat_rows<'a>(
    records: impl IntoIterator<Item = &'a CanonicalAddressRecord>,
) -> Vec<FlatRow> {
    records.into_iter().map(FlatRow::from_record).collect()
}

/// Stable sort by prefecture code, city code, town kana, town name, koaza.
pub fn sort_records(records: &mut [CanonicalAddressRecord]) {
    records.sort_by(compare_records);
}

fn compare_records(a: &CanonicalAddressRecord, b: &CanonicalAddressRecord) -> Ordering {
    a.pref_code
        .cmp(&b.pref_code)
        .then_with(|| a.city_code.cmp(&b.city_code))
        .then_with(|| a.town_kana.cmp(&b.town_kana))
        .then_with(|| a.town_name.cmp(&b.town_name))
        .then_with(|| a.koaza.cmp(&b.koaza))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    fn record(city_code: &str, town: &str, kana: &str) -> CanonicalAddressRecord {
        CanonicalAddressRecord {
            pref_code: "01".to_string(),
            pref_name: "北海道".to_string(),
            pref_kana: "ホッカイドウ".to_string(),
            pref_romaji: "HOKKAIDO".to_string(),
            city_code: city_code.to_string(),
            city_name: "札幌市中央区".to_string(),
            city_kana: "サッポロシチュウオウク".to_string(),
            city_romaji: "SAPPORO SHI CHUO KU".to_string(),
            town_name: town.to_string(),
            town_kana: kana.to_string(),
            town_romaji: String::new(),
            koaza: String::new(),
            coordinate: Some(Coordinate::new(43.04, 141.3)),
            postal_code: None,
        }
    }

    #[test]
    fn test_csv_line_quoting() {
        let line = FlatRow::from_record(&record("01101", "旭ケ丘一丁目", "アサヒガオカ 1")).to_csv_line();
        assert_eq!(
            line,
            "\"01\",\"北海道\",\"ホッカイドウ\",\"HOKKAIDO\",\"01101\",\"札幌市中央区\",\
             \"サッポロシチュウオウク\",\"SAPPORO SHI CHUO KU\",\"旭ケ丘一丁目\",\"アサヒガオカ 1\",,,43.04,141.3"
        );
    }

    #[test]
    fn test_missing_coordinate_is_empty() {
        let mut r = record("01101", "宮の森", "");
        r.coordinate = None;
        let line = FlatRow::from_record(&r).to_csv_line();
        assert!(line.ends_with(",,,,"));
        assert_eq!(Cell::text("a\"b").render(), "\"a\"\"b\"");
    }

    #[test]
    fn test_header() {
        assert!(header_line().starts_with("\"都道府県コード\",\"都道府県名\""));
        assert!(header_line().ends_with("\"緯度\",\"経度\""));
    }

    #[test]
    fn test_sort_order() {
        let mut records = vec![
            record("01102", "北一条", "キタ1ジョウ"),
            record("01101", "宮の森", ""),
            record("01101", "旭ケ丘一丁目", "アサヒガオカ 1"),
            record("01101", "宮の森", ""),
        ];
        records[3].koaza = "marker".to_string();
        records[1].koaza = String::new();
        sort_records(&mut records);

        let towns: Vec<&str> = records.iter().map(|r| r.town_name.as_str()).collect();
        assert_eq!(towns, vec!["宮の森", "宮の森", "旭ケ丘一丁目", "北一条"]);
        assert_eq!(records[1].koaza, "marker");
    }
}
