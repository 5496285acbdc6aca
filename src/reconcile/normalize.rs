//! Text normalization for Japanese address names.
//!
//! Every function here is total: blank input gives blank output.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Half-width katakana (optionally followed by a voicing mark) to full-width.
const HALF_TO_FULL_KANA: &[(&str, &str)] = &[
    ("ｶﾞ", "ガ"), ("ｷﾞ", "ギ"), ("ｸﾞ", "グ"), ("ｹﾞ", "ゲ"), ("ｺﾞ", "ゴ"),
    ("ｻﾞ", "ザ"), ("ｼﾞ", "ジ"), ("ｽﾞ", "ズ"), ("ｾﾞ", "ゼ"), ("ｿﾞ", "ゾ"),
    ("ﾀﾞ", "ダ"), ("ﾁﾞ", "ヂ"), ("ﾂﾞ", "ヅ"), ("ﾃﾞ", "デ"), ("ﾄﾞ", "ド"),
    ("ﾊﾞ", "バ"), ("ﾋﾞ", "ビ"), ("ﾌﾞ", "ブ"), ("ﾍﾞ", "ベ"), ("ﾎﾞ", "ボ"),
    ("ﾊﾟ", "パ"), ("ﾋﾟ", "ピ"), ("ﾌﾟ", "プ"), ("ﾍﾟ", "ペ"), ("ﾎﾟ", "ポ"),
    ("ｳﾞ", "ヴ"), ("ﾜﾞ", "ヷ"), ("ｦﾞ", "ヺ"),
    ("ｱ", "ア"), ("ｲ", "イ"), ("ｳ", "ウ"), ("ｴ", "エ"), ("ｵ", "オ"),
    ("ｶ", "カ"), ("ｷ", "キ"), ("ｸ", "ク"), ("ｹ", "ケ"), ("ｺ", "コ"),
    ("ｻ", "サ"), ("ｼ", "シ"), ("ｽ", "ス"), ("ｾ", "セ"), ("ｿ", "ソ"),
    ("ﾀ", "タ"), ("ﾁ", "チ"), ("ﾂ", "ツ"), ("ﾃ", "テ"), ("ﾄ", "ト"),
    ("ﾅ", "ナ"), ("ﾆ", "ニ"), ("ﾇ", "ヌ"), ("ﾈ", "ネ"), ("ﾉ", "ノ"),
    ("ﾊ", "ハ"), ("ﾋ", "ヒ"), ("ﾌ", "フ"), ("ﾍ", "ヘ"), ("ﾎ", "ホ"),
    ("ﾏ", "マ"), ("ﾐ", "ミ"), ("ﾑ", "ム"), ("ﾒ", "メ"), ("ﾓ", "モ"),
    ("ﾔ", "ヤ"), ("ﾕ", "ユ"), ("ﾖ", "ヨ"),
    ("ﾗ", "ラ"), ("ﾘ", "リ"), ("ﾙ", "ル"), ("ﾚ", "レ"), ("ﾛ", "ロ"),
    ("ﾜ", "ワ"), ("ｦ", "ヲ"), ("ﾝ", "ン"),
    ("ｧ", "ァ"), ("ｨ", "ィ"), ("ｩ", "ゥ"), ("ｪ", "ェ"), ("ｫ", "ォ"),
    ("ｯ", "ッ"), ("ｬ", "ャ"), ("ｭ", "ュ"), ("ｮ", "ョ"),
    ("｡", "。"), ("､", "、"), ("ｰ", "ー"), ("｢", "「"), ("｣", "」"), ("･", "・"),
];

const DAKUTEN: char = 'ﾞ';
const HANDAKUTEN: char = 'ﾟ';
const IDEOGRAPHIC_SPACE: char = '\u{3000}';

const KANJI_DIGITS: [char; 9] = ['一', '二', '三', '四', '五', '六', '七', '八', '九'];

lazy_static! {
    static ref HALF_TO_FULL: HashMap<&'static str, &'static str> =
        HALF_TO_FULL_KANA.iter().copied().collect();

    /// Trailing chome designator: optional kanji numeral (1-99) then 丁 or 丁目
    static ref CHOME_SUFFIX: Regex =
        Regex::new(r"[二三四五六七八九]?十?[一二三四五六七八九]?丁目?$").unwrap();

    static ref CHOME_NUMBER: Regex =
        Regex::new(r"([二三四五六七八九]?十?[一二三四五六七八九]?)丁目?$").unwrap();
}

/// Convert half-width katakana and punctuation to full-width.
///
/// A base kana followed by a half-width voicing mark folds into the single
/// voiced full-width character. Unmapped characters pass through.
pub fn half_to_full_width_kana(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut buf = [0u8; 8];

    while let Some(c) = chars.next() {
        if let Some(&mark) = chars.peek() {
            if mark == DAKUTEN || mark == HANDAKUTEN {
                let n = c.encode_utf8(&mut buf).len();
                let m = mark.encode_utf8(&mut buf[n..]).len();
                let pair = std::str::from_utf8(&buf[..n + m]).unwrap_or_default();
                if let Some(full) = HALF_TO_FULL.get(pair) {
                    out.push_str(full);
                    chars.next();
                    continue;
                }
            }
        }

        let single = c.encode_utf8(&mut buf);
        match HALF_TO_FULL.get(&*single) {
            Some(full) => out.push_str(full),
            None => out.push(c),
        }
    }

    out
}

/// Remove a trailing chome designator such as "一丁目" or "十二丁目".
pub fn strip_chome_suffix(town: &str) -> String {
    CHOME_SUFFIX.replace(town, "").into_owned()
}

/// Arabic numeral of the chome designator ("旭ケ丘十二丁目" -> "12"), or "".
pub fn extract_chome_number(town: &str) -> String {
    CHOME_NUMBER
        .captures(town)
        .and_then(|caps| caps.get(1))
        .and_then(|m| kanji_to_number(m.as_str()))
        .map(|n| n.to_string())
        .unwrap_or_default()
}

/// Parse a kanji numeral between 1 and 99.
pub fn kanji_to_number(kanji: &str) -> Option<u32> {
    let chars: Vec<char> = kanji.chars().collect();
    let digit = |c: char| {
        KANJI_DIGITS
            .iter()
            .position(|&d| d == c)
            .map(|i| i as u32 + 1)
    };

    match chars.iter().position(|&c| c == '十') {
        None if chars.len() == 1 => digit(chars[0]),
        None => None,
        Some(ten) => {
            let tens = match ten {
                0 => 1,
                1 if chars[0] != '一' => digit(chars[0])?,
                _ => return None,
            };
            let units = match &chars[ten + 1..] {
                [] => 0,
                [u] => digit(*u)?,
                _ => return None,
            };
            Some(tens * 10 + units)
        }
    }
}

/// Kanji numeral for 1-99 ("十二", "二十"); empty outside that range.
pub fn number_to_kanji(n: u32) -> String {
    if !(1..=99).contains(&n) {
        return String::new();
    }
    let (tens, units) = (n / 10, n % 10);
    let mut out = String::new();
    if tens > 1 {
        out.push(KANJI_DIGITS[tens as usize - 1]);
    }
    if tens >= 1 {
        out.push('十');
    }
    if units > 0 {
        out.push(KANJI_DIGITS[units as usize - 1]);
    }
    out
}

/// Drop a parenthesized footnote from the first opening mark onwards.
///
/// Postal town readings embed block ranges like "ナカマチ(5115-5149、5171、",
/// often without the closing mark.
pub fn strip_parenthetical(text: &str) -> String {
    match text.find(|c: char| c == '(' || c == '（') {
        Some(idx) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Remove ideographic spaces and trim.
pub fn squash_ideographic_space(text: &str) -> String {
    text.replace(IDEOGRAPHIC_SPACE, "").trim().to_string()
}

/// Town name without a leading 大字 / 字 qualifier.
pub fn strip_town_qualifier(town: &str) -> &str {
    town.strip_prefix("大字")
        .or_else(|| town.strip_prefix('字'))
        .unwrap_or(town)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_to_full_basic() {
        assert_eq!(half_to_full_width_kana("ｱｻﾋｶﾞｵｶ"), "アサヒガオカ");
        assert_eq!(half_to_full_width_kana("ﾎｯｶｲﾄﾞｳ"), "ホッカイドウ");
        assert_eq!(half_to_full_width_kana("ﾊﾟﾋﾟﾌﾟﾍﾟﾎﾟ"), "パピプペポ");
        assert_eq!(half_to_full_width_kana("ｳﾞｧ"), "ヴァ");
    }

    #[test]
    fn test_half_to_full_passes_through() {
        assert_eq!(half_to_full_width_kana(""), "");
        assert_eq!(half_to_full_width_kana("ABC 123"), "ABC 123");
        assert_eq!(half_to_full_width_kana("ﾅｶﾏﾁ(5115-5149､5171､"), "ナカマチ(5115-5149、5171、");
        // A voicing mark that cannot combine is kept as is
        assert_eq!(half_to_full_width_kana("ｱﾞ"), "アﾞ");
    }

    #[test]
    fn test_strip_chome_suffix() {
        assert_eq!(strip_chome_suffix("旭ケ丘一丁目"), "旭ケ丘");
        assert_eq!(strip_chome_suffix("本町十二丁目"), "本町");
        assert_eq!(strip_chome_suffix("本町二十丁目"), "本町");
        assert_eq!(strip_chome_suffix("本町九十九丁目"), "本町");
        assert_eq!(strip_chome_suffix("篠ノ井塩崎"), "篠ノ井塩崎");
        assert_eq!(strip_chome_suffix(""), "");
    }

    #[test]
    fn test_extract_chome_number() {
        assert_eq!(extract_chome_number("旭ケ丘一丁目"), "1");
        assert_eq!(extract_chome_number("本町十二丁目"), "12");
        assert_eq!(extract_chome_number("本町四十丁目"), "40");
        assert_eq!(extract_chome_number("篠ノ井塩崎"), "");
        assert_eq!(extract_chome_number("横丁"), "");
        assert_eq!(extract_chome_number(""), "");
    }

    #[test]
    fn test_chome_round_trip_1_to_99() {
        for n in 1..=99 {
            let numeral = number_to_kanji(n);
            let town = format!("{}{}丁目", strip_chome_suffix("旭ケ丘"), numeral);
            assert_eq!(extract_chome_number(&town), n.to_string(), "town {}", town);
            assert_eq!(strip_chome_suffix(&town), "旭ケ丘");
            assert_eq!(kanji_to_number(&numeral), Some(n));
        }
    }

    #[test]
    fn test_kanji_to_number_rejects_malformed() {
        assert_eq!(kanji_to_number(""), None);
        assert_eq!(kanji_to_number("二三"), None);
        assert_eq!(kanji_to_number("一十"), None);
        assert_eq!(kanji_to_number("十十"), None);
    }

    #[test]
    fn test_strip_parenthetical() {
        assert_eq!(strip_parenthetical("ナカマチ(5115-5149、5171、"), "ナカマチ");
        assert_eq!(strip_parenthetical("NAKAMACHI(5115-5149)"), "NAKAMACHI");
        assert_eq!(strip_parenthetical("ナカマチ（チョウメ）"), "ナカマチ");
        assert_eq!(strip_parenthetical("ナカマチ"), "ナカマチ");
        assert_eq!(strip_parenthetical(""), "");
    }

    #[test]
    fn test_squash_ideographic_space() {
        assert_eq!(squash_ideographic_space("字士幌　仲通"), "字士幌仲通");
        assert_eq!(squash_ideographic_space(" 札幌市　中央区 "), "札幌市中央区");
    }

    #[test]
    fn test_strip_town_qualifier() {
        assert_eq!(strip_town_qualifier("大字篠ノ井"), "篠ノ井");
        assert_eq!(strip_town_qualifier("字士幌仲通"), "士幌仲通");
        assert_eq!(strip_town_qualifier("篠ノ井"), "篠ノ井");
        assert_eq!(strip_town_qualifier("（大字なし）"), "（大字なし）");
    }
}
