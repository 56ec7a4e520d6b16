//! Output formats
//!
//! Writers for converted feature maps.

pub mod table;

pub use table::{convert_to_table, format_feature_line, write_feature_map, RootRequest, TableStats, HEADER};
