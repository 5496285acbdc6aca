//! Deduplicating merge of town- and block-granularity registry rows.
//!
//! Town rows are merged first and always win: a block row whose key already
//! has a record is skipped.

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use tracing::{debug, warn};

use super::coordinates::CoordinateConsolidator;
use super::matcher::RecordMatcher;
use super::normalize::extract_chome_number;
use super::summary::PartitionSummary;
use crate::models::{
    AdministrativeRecord, BlockEntry, CanonicalAddressRecord, Coordinate, Granularity, RawRow,
    RecordKey,
};

/// Insertion-ordered map from record key to canonical record.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    index: HashMap<RecordKey, usize>,
    records: Vec<CanonicalAddressRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` unless `key` is taken. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, key: RecordKey, record: CanonicalAddressRecord) -> bool {
        self.insert_with(key, || record)
    }

    /// Like `insert_if_absent`, but only builds the record when the key is free.
    pub fn insert_with<F>(&mut self, key: RecordKey, build: F) -> bool
    where
        F: FnOnce() -> CanonicalAddressRecord,
    {
        match self.index.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(self.records.len());
                self.records.push(build());
                true
            }
        }
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &RecordKey) -> Option<&CanonicalAddressRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CanonicalAddressRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<CanonicalAddressRecord> {
        self.records
    }
}

/// Coarse key the block-level coordinates are grouped by (no block number).
type SampleKey = (String, String, String, String);

fn sample_key(record: &AdministrativeRecord) -> SampleKey {
    (
        record.pref_name.clone(),
        record.city_name.clone(),
        record.town_name.clone(),
        record.koaza_name.clone(),
    )
}

/// Merge state for one prefecture.
pub struct MergeEngine<'a> {
    pref_code: String,
    matcher: RecordMatcher<'a>,
    store: RecordStore,
    /// City name -> first city code seen for it
    city_codes: HashMap<String, String>,
    blocks: Vec<BlockEntry>,
    summary: PartitionSummary,
}

impl<'a> MergeEngine<'a> {
    pub fn new(pref_code: &str, matcher: RecordMatcher<'a>) -> Self {
        Self {
            pref_code: pref_code.to_string(),
            matcher,
            store: RecordStore::new(),
            city_codes: HashMap::new(),
            blocks: Vec::new(),
            summary: PartitionSummary::new(pref_code),
        }
    }

    /// Merge town-granularity rows, copying their coordinates through.
    pub fn town_pass(&mut self, rows: &[RawRow]) {
        self.summary.town_rows += rows.len();
        for record in self.parse_rows(rows, Granularity::Town) {
            let coordinate = record.coordinate;
            self.insert(&record, coordinate);
        }
    }

    /// Merge block-granularity rows.
    ///
    /// All coordinates are collected and resolved before the first record is
    /// inserted; each new record gets the representative point of its
    /// (pref, city, town, koaza) group.
    pub fn block_pass(&mut self, rows: &[RawRow]) {
        self.summary.block_rows += rows.len();
        let records = self.parse_rows(rows, Granularity::Block);

        let mut consolidator = CoordinateConsolidator::new();
        for record in &records {
            if let Some(c) = record.coordinate {
                consolidator.add(sample_key(record), c);
            }
        }
        debug!(
            "Consolidating {} block samples into {} groups for {}",
            consolidator.sample_count(),
            consolidator.group_count(),
            self.pref_code
        );
        let representatives = consolidator.resolve();

        for record in records {
            if let (Some(block), Some(c)) = (&record.block_number, record.coordinate) {
                self.blocks.push(BlockEntry {
                    pref_name: record.pref_name.clone(),
                    city_name: record.city_name.clone(),
                    town_name: record.town_name.clone(),
                    block_number: block.clone(),
                    coordinate: c,
                });
            }
            let coordinate = representatives.get(&sample_key(&record)).copied();
            self.insert(&record, coordinate);
        }
    }

    /// Insert hand-maintained records for keys the registry did not cover.
    pub fn apply_patches(&mut self, patches: &[CanonicalAddressRecord]) {
        for patch in patches {
            if self.store.insert_if_absent(patch.record_key(), patch.clone()) {
                self.summary.patched += 1;
            } else {
                debug!("Patch for {} already covered by registry", patch.record_key());
            }
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn summary(&self) -> &PartitionSummary {
        &self.summary
    }

    pub fn finish(mut self) -> (Vec<CanonicalAddressRecord>, Vec<BlockEntry>, PartitionSummary) {
        self.summary.records = self.store.len();
        (self.store.into_records(), self.blocks, self.summary)
    }

    /// Parse rows, dropping invalid ones and filling in missing codes.
    fn parse_rows(&mut self, rows: &[RawRow], granularity: Granularity) -> Vec<AdministrativeRecord> {
        let mut records = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let mut record = match AdministrativeRecord::from_row(row, granularity) {
                Ok(r) => r,
                Err(e) => {
                    warn!(
                        "Skipping {} row {} of prefecture {}: {}",
                        granularity,
                        i + 1,
                        self.pref_code,
                        e
                    );
                    self.summary.rejected_rows += 1;
                    continue;
                }
            };

            if record.pref_code.is_empty() {
                record.pref_code = self.pref_code.clone();
            }
            if record.city_code.is_empty() {
                if let Some(code) = self.city_codes.get(&record.city_name) {
                    record.city_code = code.clone();
                }
            } else {
                self.city_codes
                    .entry(record.city_name.clone())
                    .or_insert_with(|| record.city_code.clone());
            }
            records.push(record);
        }
        records
    }

    fn insert(&mut self, record: &AdministrativeRecord, coordinate: Option<Coordinate>) {
        let matcher = self.matcher;
        let summary = &mut self.summary;
        let inserted = self.store.insert_with(record.record_key(), || {
            build_record(&matcher, summary, record, coordinate)
        });
        if !inserted {
            self.summary.duplicates += 1;
        }
    }
}

fn build_record(
    matcher: &RecordMatcher<'_>,
    summary: &mut PartitionSummary,
    record: &AdministrativeRecord,
    coordinate: Option<Coordinate>,
) -> CanonicalAddressRecord {
    let matched = matcher.match_record(record);
    if matched.is_hit() {
        summary.record_hit();
    } else {
        summary.record_miss(&record.pref_name, &record.city_name);
    }
    if matched.has_fallback() {
        summary.town_fallbacks += 1;
    }

    let chome = extract_chome_number(&record.town_name);

    CanonicalAddressRecord {
        pref_code: record.pref_code.clone(),
        pref_name: record.pref_name.clone(),
        pref_kana: matched.kana.pref.clone(),
        pref_romaji: matched.romaji.pref.clone(),
        city_code: record.city_code.clone(),
        city_name: record.city_name.clone(),
        city_kana: matched.kana.city.clone(),
        city_romaji: matched.romaji.city.clone(),
        town_name: record.town_name.clone(),
        town_kana: with_chome(&matched.kana.town, &chome),
        town_romaji: with_chome(&matched.romaji.town, &chome),
        koaza: record.koaza_name.clone(),
        coordinate,
        postal_code: matched.postal_code().map(str::to_string),
    }
}

/// "アサヒガオカ" + "1" -> "アサヒガオカ 1"; a blank reading stays blank.
fn with_chome(reading: &str, chome: &str) -> String {
    if reading.is_empty() || chome.is_empty() {
        reading.to_string()
    } else {
        format!("{} {}", reading, chome)
    }
}
