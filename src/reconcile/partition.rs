//! Reconciliation of one prefecture, and of many in parallel.

use rayon::prelude::*;
use tracing::{info, warn};

use super::alias::AliasTable;
use super::matcher::{PostalTables, RecordMatcher};
use super::merge::MergeEngine;
use super::patch::PatchSet;
use super::summary::PartitionSummary;
use crate::error::PartitionError;
use crate::models::{BlockEntry, CanonicalAddressRecord, Granularity, RawRow};

/// Registry rows for one prefecture.
#[derive(Debug, Clone, Default)]
pub struct PrefectureInput {
    pub pref_code: String,
    pub town_rows: Vec<RawRow>,
    pub block_rows: Vec<RawRow>,
}

impl PrefectureInput {
    pub fn new(pref_code: &str, town_rows: Vec<RawRow>, block_rows: Vec<RawRow>) -> Self {
        Self {
            pref_code: pref_code.to_string(),
            town_rows,
            block_rows,
        }
    }
}

/// Everything one prefecture produced.
#[derive(Debug, Clone)]
pub struct PartitionOutput {
    pub pref_code: String,
    /// Canonical records in discovery order
    pub records: Vec<CanonicalAddressRecord>,
    pub blocks: Vec<BlockEntry>,
    pub summary: PartitionSummary,
}

/// Shared read-only state for reconciling prefectures.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    aliases: &'a AliasTable,
    postal: &'a PostalTables,
    patches: Option<&'a PatchSet>,
}

impl<'a> Reconciler<'a> {
    pub fn new(aliases: &'a AliasTable, postal: &'a PostalTables) -> Self {
        Self {
            aliases,
            postal,
            patches: None,
        }
    }

    pub fn with_patches(mut self, patches: &'a PatchSet) -> Self {
        self.patches = Some(patches);
        self
    }

    /// Merge one prefecture: town pass, then block pass, then patches.
    pub fn reconcile_prefecture(
        &self,
        input: &PrefectureInput,
    ) -> Result<PartitionOutput, PartitionError> {
        let pref_code = input.pref_code.as_str();
        if input.town_rows.is_empty() && input.block_rows.is_empty() {
            return Err(PartitionError::source_unavailable(
                pref_code,
                "no registry rows",
            ));
        }
        check_columns(pref_code, &input.town_rows, Granularity::Town)?;
        check_columns(pref_code, &input.block_rows, Granularity::Block)?;

        let matcher = RecordMatcher::new(self.aliases, self.postal);
        let mut engine = MergeEngine::new(pref_code, matcher);
        engine.town_pass(&input.town_rows);
        engine.block_pass(&input.block_rows);
        if let Some(patches) = self.patches {
            engine.apply_patches(patches.for_prefecture(pref_code));
        }

        let (records, blocks, summary) = engine.finish();
        info!(
            "Prefecture {}: {} records ({} town rows, {} block rows, {} duplicates, {} patched), hit {} / nohit {}",
            pref_code,
            summary.records,
            summary.town_rows,
            summary.block_rows,
            summary.duplicates,
            summary.patched,
            summary.hit,
            summary.nohit
        );
        if !summary.unmatched.is_empty() {
            warn!(
                "Prefecture {}: no postal readings for {}",
                pref_code,
                summary.unmatched.join(", ")
            );
        }

        Ok(PartitionOutput {
            pref_code: pref_code.to_string(),
            records,
            blocks,
            summary,
        })
    }

    /// Reconcile every prefecture in parallel.
    ///
    /// `load` fetches a prefecture's rows; a load failure only fails that
    /// prefecture. `on_done` is called as each partition finishes. Outcomes
    /// come back in the order of `pref_codes`.
    pub fn reconcile_all<L, D>(&self, pref_codes: &[String], load: L, on_done: D) -> RunReport
    where
        L: Fn(&str) -> Result<PrefectureInput, PartitionError> + Sync,
        D: Fn(&PartitionOutcome) + Sync,
    {
        let outcomes = pref_codes
            .par_iter()
            .map(|code| {
                let result = load(code).and_then(|input| self.reconcile_prefecture(&input));
                if let Err(e) = &result {
                    warn!("Prefecture {} failed: {}", code, e);
                }
                let outcome = PartitionOutcome {
                    pref_code: code.clone(),
                    result,
                };
                on_done(&outcome);
                outcome
            })
            .collect();

        RunReport { outcomes }
    }
}

/// A source whose first row lacks an identity column is not a registry file.
fn check_columns(
    pref_code: &str,
    rows: &[RawRow],
    granularity: Granularity,
) -> Result<(), PartitionError> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    for column in granularity.identity_columns() {
        if !first.contains_key(column) {
            return Err(PartitionError::source_unavailable(
                pref_code,
                format!("{} rows have no '{}' column", granularity, column),
            ));
        }
    }
    Ok(())
}

/// Result for one prefecture.
#[derive(Debug, Clone)]
pub struct PartitionOutcome {
    pub pref_code: String,
    pub result: Result<PartitionOutput, PartitionError>,
}

/// Outcome of a whole run, in prefecture-code order.
#[derive(Debug, Clone)]
pub struct RunReport {
    outcomes: Vec<PartitionOutcome>,
}

impl RunReport {
    pub fn outcomes(&self) -> &[PartitionOutcome] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &PartitionOutput> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &PartitionError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.pref_code.as_str(), e)))
    }

    /// True when there was work and none of it succeeded.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded().next().is_none()
    }

    /// All canonical records, prefecture by prefecture.
    pub fn records(&self) -> impl Iterator<Item = &CanonicalAddressRecord> {
        self.succeeded().flat_map(|p| p.records.iter())
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BlockEntry> {
        self.succeeded().flat_map(|p| p.blocks.iter())
    }

    pub fn totals(&self) -> RunTotals {
        let mut totals = RunTotals::default();
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(p) => {
                    totals.partitions_ok += 1;
                    totals.records += p.summary.records;
                    totals.rejected_rows += p.summary.rejected_rows;
                    totals.hit += p.summary.hit;
                    totals.nohit += p.summary.nohit;
                    totals.town_fallbacks += p.summary.town_fallbacks;
                    totals.patched += p.summary.patched;
                    totals.unmatched.extend(p.summary.unmatched.iter().cloned());
                }
                Err(e) => totals.failed.push(FailedPartition {
                    pref_code: outcome.pref_code.clone(),
                    error: e.to_string(),
                }),
            }
        }
        totals
    }
}

/// Aggregated counters for a run.
#[derive(Debug, Clone, Default)]
pub struct RunTotals {
    pub partitions_ok: usize,
    pub records: usize,
    pub rejected_rows: usize,
    pub hit: usize,
    pub nohit: usize,
    pub town_fallbacks: usize,
    pub patched: usize,
    pub unmatched: Vec<String>,
    pub failed: Vec<FailedPartition>,
}

#[derive(Debug, Clone)]
pub struct FailedPartition {
    pub pref_code: String,
    pub error: String,
}
