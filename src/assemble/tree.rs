//! Nested prefecture → city → town output.

use hashbrown::HashMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::warn;

use super::residential::{ResidentialItem, TownResidences};
use crate::models::{BlockEntry, CanonicalAddressRecord};
use crate::reconcile::normalize::strip_town_qualifier;

/// A town as listed in a city file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TownEntry {
    pub town: String,
    pub koaza: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    /// Set when the town has a residential-address file
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub residential: bool,
}

impl TownEntry {
    fn from_record(r: &CanonicalAddressRecord) -> Self {
        Self {
            town: r.town_name.clone(),
            koaza: r.koaza.clone(),
            lat: r.coordinate.map(|c| c.lat),
            lng: r.coordinate.map(|c| c.lng),
            zip: r.postal_code.clone(),
            residential: false,
        }
    }

    fn same_town(&self, town: &str) -> bool {
        self.town == town || strip_town_qualifier(&self.town) == strip_town_qualifier(town)
    }
}

/// A block with its coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockItem {
    #[serde(rename = "gaiku")]
    pub block: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CityNode {
    pub name: String,
    pub towns: Vec<TownEntry>,
    town_blocks: Vec<TownBlocks>,
    town_pos: HashMap<String, usize>,
    residences: Vec<(String, Vec<ResidentialItem>)>,
    residence_pos: HashMap<String, usize>,
}

impl CityNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Towns that have blocks, with their blocks, in discovery order.
    pub fn town_blocks(&self) -> impl Iterator<Item = (&str, &[BlockItem])> {
        self.town_blocks
            .iter()
            .map(|t| (t.town.as_str(), t.blocks.as_slice()))
    }

    /// Towns with residential addresses, in attach order.
    pub fn residences(&self) -> impl Iterator<Item = (&str, &[ResidentialItem])> {
        self.residences
            .iter()
            .map(|(town, items)| (town.as_str(), items.as_slice()))
    }

    /// Flag every entry of `town` as residential and keep its items under
    /// the listed town name. Returns false when the city has no such town.
    fn attach_residences(&mut self, town: &str, items: &[ResidentialItem]) -> bool {
        let mut listed: Option<String> = None;
        for entry in self.towns.iter_mut().filter(|t| t.same_town(town)) {
            entry.residential = true;
            listed.get_or_insert_with(|| entry.town.clone());
        }
        let Some(listed) = listed else {
            return false;
        };

        let next = self.residences.len();
        let idx = *self.residence_pos.entry(listed.clone()).or_insert(next);
        if idx == next {
            self.residences.push((listed, Vec::new()));
        }
        self.residences[idx].1.extend_from_slice(items);
        true
    }

    fn push_block(&mut self, entry: &BlockEntry) {
        let next = self.town_blocks.len();
        let idx = *self
            .town_pos
            .entry(entry.town_name.clone())
            .or_insert(next);
        if idx == next {
            self.town_blocks.push(TownBlocks {
                town: entry.town_name.clone(),
                blocks: Vec::new(),
                block_pos: HashMap::new(),
            });
        }
        self.town_blocks[idx].push(entry);
    }
}

#[derive(Debug, Clone)]
struct TownBlocks {
    town: String,
    blocks: Vec<BlockItem>,
    block_pos: HashMap<String, usize>,
}

impl TownBlocks {
    /// A repeated block number takes the later coordinate but keeps its
    /// first position.
    fn push(&mut self, entry: &BlockEntry) {
        match self.block_pos.get(&entry.block_number) {
            Some(&idx) => {
                let item = &mut self.blocks[idx];
                item.lat = entry.coordinate.lat;
                item.lng = entry.coordinate.lng;
            }
            None => {
                self.block_pos
                    .insert(entry.block_number.clone(), self.blocks.len());
                self.blocks.push(BlockItem {
                    block: entry.block_number.clone(),
                    lat: entry.coordinate.lat,
                    lng: entry.coordinate.lng,
                });
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrefectureNode {
    pub name: String,
    /// Two-digit code; empty for prefectures only reached through blocks
    pub code: String,
    pub cities: Vec<CityNode>,
    city_pos: HashMap<String, usize>,
}

impl PrefectureNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn city_mut(&mut self, name: &str) -> &mut CityNode {
        let next = self.cities.len();
        let idx = *self.city_pos.entry(name.to_string()).or_insert(next);
        if idx == next {
            self.cities.push(CityNode::new(name));
        }
        &mut self.cities[idx]
    }
}

/// Prefectures, cities and towns in discovery order.
#[derive(Debug, Clone, Default)]
pub struct AddressTree {
    prefectures: Vec<PrefectureNode>,
    pref_pos: HashMap<String, usize>,
}

impl AddressTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<'a, 'b>(
        records: impl IntoIterator<Item = &'a CanonicalAddressRecord>,
        blocks: impl IntoIterator<Item = &'b BlockEntry>,
    ) -> Self {
        let mut tree = Self::new();
        for record in records {
            tree.add_record(record);
        }
        for block in blocks {
            tree.add_block(block);
        }
        tree
    }

    pub fn add_record(&mut self, record: &CanonicalAddressRecord) {
        let pref = self.prefecture_mut(&record.pref_name);
        if pref.code.is_empty() {
            pref.code = record.pref_code.clone();
        }
        pref.city_mut(&record.city_name)
            .towns
            .push(TownEntry::from_record(record));
    }

    pub fn add_block(&mut self, entry: &BlockEntry) {
        self.prefecture_mut(&entry.pref_name)
            .city_mut(&entry.city_name)
            .push_block(entry);
    }

    /// Hang residential addresses under the towns they belong to.
    ///
    /// The prefecture comes from the local government code, or failing that
    /// from whichever prefecture lists the city. Towns the tree does not
    /// list are skipped.
    pub fn attach_residences(&mut self, residences: &[TownResidences]) -> ResidentialSummary {
        let mut summary = ResidentialSummary::default();
        for town in residences {
            let attached = match self.residential_city_mut(town) {
                Some(city) => city.attach_residences(&town.town_name, &town.items),
                None => false,
            };
            if attached {
                summary.towns += 1;
                summary.items += town.items.len();
            } else {
                warn!(
                    "Skipping residences for unknown town {}{}",
                    town.city_name, town.town_name
                );
                summary
                    .skipped
                    .push(format!("{}{}", town.city_name, town.town_name));
            }
        }
        summary
    }

    fn residential_city_mut(&mut self, town: &TownResidences) -> Option<&mut CityNode> {
        let lists_city = |p: &PrefectureNode| p.city_pos.contains_key(&town.city_name);
        let idx = town
            .pref_code()
            .and_then(|code| {
                self.prefectures
                    .iter()
                    .position(|p| p.code == code && lists_city(p))
            })
            .or_else(|| self.prefectures.iter().position(lists_city))?;

        let pref = &mut self.prefectures[idx];
        let city = *pref.city_pos.get(&town.city_name)?;
        Some(&mut pref.cities[city])
    }

    pub fn prefectures(&self) -> &[PrefectureNode] {
        &self.prefectures
    }

    pub fn city(&self, pref: &str, city: &str) -> Option<&CityNode> {
        let pref = &self.prefectures[*self.pref_pos.get(pref)?];
        Some(&pref.cities[*pref.city_pos.get(city)?])
    }

    /// Prefecture name → city names, for the top-level index file.
    pub fn city_index(&self) -> CityIndex<'_> {
        CityIndex(self)
    }

    fn prefecture_mut(&mut self, name: &str) -> &mut PrefectureNode {
        let next = self.prefectures.len();
        let idx = *self.pref_pos.entry(name.to_string()).or_insert(next);
        if idx == next {
            self.prefectures.push(PrefectureNode::new(name));
        }
        &mut self.prefectures[idx]
    }
}

/// Outcome of attaching residential addresses to the tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResidentialSummary {
    pub towns: usize,
    pub items: usize,
    /// City+town names the tree does not list
    pub skipped: Vec<String>,
}

/// Serializes as `{"北海道": ["札幌市中央区", ...], ...}` in discovery order.
pub struct CityIndex<'a>(&'a AddressTree);

impl Serialize for CityIndex<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let prefectures = &self.0.prefectures;
        let mut map = serializer.serialize_map(Some(prefectures.len()))?;
        for pref in prefectures {
            // Cities only reached through the block tree have no towns
            let cities: Vec<&str> = pref
                .cities
                .iter()
                .filter(|c| !c.towns.is_empty())
                .map(|c| c.name.as_str())
                .collect();
            map.serialize_entry(&pref.name, &cities)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    fn record(pref: &str, city: &str, town: &str) -> CanonicalAddressRecord {
        CanonicalAddressRecord {
            pref_code: String::new(),
            pref_name: pref.to_string(),
            pref_kana: String::new(),
            pref_romaji: String::new(),
            city_code: String::new(),
            city_name: city.to_string(),
            city_kana: String::new(),
            city_romaji: String::new(),
            town_name: town.to_string(),
            town_kana: String::new(),
            town_romaji: String::new(),
            koaza: String::new(),
            coordinate: Some(Coordinate::new(35.0, 139.0)),
            postal_code: None,
        }
    }

    fn block(town: &str, number: &str, lat: f64) -> BlockEntry {
        BlockEntry {
            pref_name: "東京都".to_string(),
            city_name: "千代田区".to_string(),
            town_name: town.to_string(),
            block_number: number.to_string(),
            coordinate: Coordinate::new(lat, 139.7),
        }
    }

    #[test]
    fn test_city_index_in_discovery_order() {
        let records = vec![
            record("東京都", "千代田区", "丸の内一丁目"),
            record("北海道", "札幌市中央区", "旭ケ丘一丁目"),
            record("東京都", "中央区", "銀座一丁目"),
            record("東京都", "千代田区", "丸の内二丁目"),
        ];
        let tree = AddressTree::build(&records, &[] as &[BlockEntry]);

        let json = serde_json::to_string(&tree.city_index()).unwrap();
        assert_eq!(
            json,
            r#"{"東京都":["千代田区","中央区"],"北海道":["札幌市中央区"]}"#
        );
        let chiyoda = tree.city("東京都", "千代田区").unwrap();
        assert_eq!(chiyoda.towns.len(), 2);
        assert_eq!(chiyoda.towns[1].town, "丸の内二丁目");
    }

    #[test]
    fn test_town_entry_json() {
        let mut r = record("東京都", "千代田区", "丸の内一丁目");
        r.postal_code = Some("1000005".to_string());
        let entry = TownEntry::from_record(&r);
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"town":"丸の内一丁目","koaza":"","lat":35.0,"lng":139.0,"zip":"1000005"}"#
        );

        r.postal_code = None;
        r.coordinate = None;
        assert_eq!(
            serde_json::to_string(&TownEntry::from_record(&r)).unwrap(),
            r#"{"town":"丸の内一丁目","koaza":"","lat":null,"lng":null}"#
        );
    }

    #[test]
    fn test_block_tree_last_coordinate_wins() {
        let blocks = vec![
            block("丸の内一丁目", "1", 35.1),
            block("丸の内一丁目", "2", 35.2),
            block("丸の内一丁目", "1", 99.0),
            block("丸の内二丁目", "1", 35.3),
        ];
        let tree = AddressTree::build(&[] as &[CanonicalAddressRecord], &blocks);

        let city = tree.city("東京都", "千代田区").unwrap();
        let towns: Vec<(&str, &[BlockItem])> = city.town_blocks().collect();
        assert_eq!(towns.len(), 2);
        assert_eq!(towns[0].0, "丸の内一丁目");
        assert_eq!(towns[0].1.len(), 2);
        assert_eq!(towns[0].1[0].block, "1");
        assert_eq!(towns[0].1[0].lat, 99.0);
        assert_eq!(towns[0].1[1].block, "2");
        assert_eq!(
            serde_json::to_string(&towns[1].1).unwrap(),
            r#"[{"gaiku":"1","lat":35.3,"lng":139.7}]"#
        );

        // Block-only cities stay out of the city index
        assert_eq!(serde_json::to_string(&tree.city_index()).unwrap(), r#"{"東京都":[]}"#);
    }

    fn residences(lg_code: &str, city: &str, town: &str, gaiku: &str) -> TownResidences {
        TownResidences {
            lg_code: lg_code.to_string(),
            city_name: city.to_string(),
            town_name: town.to_string(),
            items: vec![ResidentialItem {
                gaiku: gaiku.to_string(),
                jyukyo: "1".to_string(),
                lat: Some(43.04),
                lng: None,
            }],
        }
    }

    #[test]
    fn test_attach_residences() {
        let mut hokkaido = record("北海道", "札幌市中央区", "旭ケ丘一丁目");
        hokkaido.pref_code = "01".to_string();
        let mut koaza = hokkaido.clone();
        koaza.koaza = "東".to_string();
        let mut nagano = record("長野県", "長野市", "大字篠ノ井塩崎");
        nagano.pref_code = "20".to_string();
        let mut tree = AddressTree::build(&[hokkaido, koaza, nagano], &[] as &[BlockEntry]);

        let summary = tree.attach_residences(&[
            residences("011011", "札幌市中央区", "旭ケ丘一丁目", "1"),
            residences("011011", "札幌市中央区", "旭ケ丘一丁目", "2"),
            // Pref code unknown to the tree: found through the city name
            residences("992011", "長野市", "篠ノ井塩崎", "5"),
            residences("011011", "札幌市中央区", "宮の森一条", "1"),
        ]);
        assert_eq!(summary.towns, 3);
        assert_eq!(summary.items, 3);
        assert_eq!(summary.skipped, vec!["札幌市中央区宮の森一条".to_string()]);

        let sapporo = tree.city("北海道", "札幌市中央区").unwrap();
        assert!(sapporo.towns.iter().all(|t| t.residential));
        let attached: Vec<(&str, &[ResidentialItem])> = sapporo.residences().collect();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].1.len(), 2);
        assert_eq!(attached[0].1[1].gaiku, "2");

        let nagano = tree.city("長野県", "長野市").unwrap();
        let attached: Vec<(&str, &[ResidentialItem])> = nagano.residences().collect();
        assert_eq!(attached[0].0, "大字篠ノ井塩崎");
        assert_eq!(
            serde_json::to_string(&nagano.towns[0]).unwrap(),
            r#"{"town":"大字篠ノ井塩崎","koaza":"","lat":35.0,"lng":139.0,"residential":true}"#
        );
        assert_eq!(
            serde_json::to_string(attached[0].1).unwrap(),
            r#"[{"gaiku":"5","jyukyo":"1","lat":43.04,"lng":null}]"#
        );
    }
}
