//! Textual encodings for history files.
//!
//! Two encodings live here:
//!
//! - **Column keys**: classification field columns carry a `kind:name`
//!   identity so a header cell can be matched against a changing schema.
//! - **CSV tables**: per-case history files are plain CSV with quoting for
//!   freetext content.

mod column;
mod csv;

#[cfg(test)]
mod tests;

pub use column::ColumnKey;
pub use csv::CsvTable;
