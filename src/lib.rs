//! Banchi - Japanese address reconciliation
//!
//! Joins the national address registry (town and block granularity) with
//! the postal-code kana and romaji tables, deduplicates the result per
//! prefecture and shapes it into flat and hierarchical outputs. The
//! `banchi-build` binary does the file I/O around this library.

pub mod assemble;
pub mod error;
pub mod models;
pub mod reconcile;

pub use error::{PartitionError, ResidentialError, RowError};
pub use models::{CanonicalAddressRecord, Coordinate, RecordKey};
pub use reconcile::{AliasTable, PostalTables, Reconciler, RunReport};
