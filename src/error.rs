//! Error types for the reconciliation core.

use thiserror::Error;

/// A single registry row that cannot take part in the merge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// One of the identity fields (prefecture, city, town) is missing or blank.
    #[error("missing identity field '{field}'")]
    MissingField { field: &'static str },
}

/// Failure scoped to one prefecture partition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    /// The prefecture's registry data is missing or unreadable.
    #[error("source unavailable for prefecture {pref_code}: {reason}")]
    SourceUnavailable { pref_code: String, reason: String },
}

impl PartitionError {
    pub fn source_unavailable(pref_code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            pref_code: pref_code.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reading one city's residential-address files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResidentialError {
    /// A position row uses a coordinate system other than JGD2011 lat/lng.
    #[error("unexpected coordinate reference system '{crs}' for {key}")]
    UnexpectedCrs { crs: String, key: String },
}
