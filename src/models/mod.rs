//! Core data models for the address reconciliation pipeline.

pub mod address;
pub mod postal;

use std::collections::HashMap;

pub use address::{
    AdministrativeRecord, BlockEntry, CanonicalAddressRecord, Coordinate, Granularity, RecordKey,
};
pub use postal::{PostalRecord, Reading};

/// One decoded input row: source field name to raw value.
pub type RawRow = HashMap<String, String>;

/// Fetch a field from a raw row, trimmed; missing fields read as empty.
pub(crate) fn field<'a>(row: &'a RawRow, name: &str) -> &'a str {
    row.get(name).map(|v| v.trim()).unwrap_or("")
}
