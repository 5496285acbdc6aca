//! Per-partition counters.

use hashbrown::HashSet;

/// What happened while reconciling one prefecture.
#[derive(Debug, Clone, Default)]
pub struct PartitionSummary {
    pub pref_code: String,
    pub town_rows: usize,
    pub block_rows: usize,
    /// Rows dropped for a missing identity field
    pub rejected_rows: usize,
    /// Canonical records emitted
    pub records: usize,
    /// Rows whose key already had a record
    pub duplicates: usize,
    /// Records that came from patches
    pub patched: usize,
    /// Records whose city was found in both postal tables
    pub hit: usize,
    pub nohit: usize,
    /// Records matched at city level only (blank town reading)
    pub town_fallbacks: usize,
    /// Unmatched prefecture+city pairs, in discovery order
    pub unmatched: Vec<String>,
    unmatched_seen: HashSet<String>,
}

impl PartitionSummary {
    pub fn new(pref_code: &str) -> Self {
        Self {
            pref_code: pref_code.to_string(),
            ..Self::default()
        }
    }

    pub fn record_hit(&mut self) {
        self.hit += 1;
    }

    pub fn record_miss(&mut self, pref: &str, city: &str) {
        self.nohit += 1;
        let pair = format!("{}{}", pref, city);
        if self.unmatched_seen.insert(pair.clone()) {
            self.unmatched.push(pair);
        }
    }
}
