//! Matching registry rows to postal readings and merging them per prefecture.

pub mod alias;
pub mod coordinates;
pub mod matcher;
pub mod merge;
pub mod normalize;
pub mod partition;
pub mod patch;
pub mod summary;

pub use alias::{AliasTable, CityAlias, TownAlias};
pub use coordinates::{representative, CoordinateConsolidator};
pub use matcher::{MatchKind, PostalIndex, PostalTables, RecordMatch, RecordMatcher};
pub use merge::{MergeEngine, RecordStore};
pub use partition::{
    PartitionOutcome, PartitionOutput, PrefectureInput, Reconciler, RunReport, RunTotals,
};
pub use patch::{PatchRecord, PatchSet};
pub use summary::PartitionSummary;
