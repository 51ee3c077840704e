pub mod cf_time;
pub mod date_parser;
pub mod granule;
pub mod source_reader;

pub use date_parser::DateFormat;
pub use granule::{find_alias, find_containing, Axis, GriddedDataset, Lookup, MemoryDataset, NetcdfGranule};
pub use source_reader::SourceReader;
