//! Shapes canonical records into the flat and hierarchical outputs.

pub mod flat;
pub mod residential;
pub mod tree;

pub use flat::{flat_rows, header_line, sort_records, Cell, FlatRow, FLAT_HEADER};
pub use residential::{join_residences, ResidentialItem, TownResidences};
pub use tree::{
    AddressTree, BlockItem, CityIndex, CityNode, PrefectureNode, ResidentialSummary, TownEntry,
};
