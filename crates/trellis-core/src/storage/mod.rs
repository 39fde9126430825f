//! Storage formats: the native `.trl` sheet format and CSV.

pub mod csv;
pub mod parser;
pub mod writer;

pub use csv::{csv_content, parse_csv_content, write_csv};
pub use parser::{parse_sheet, parse_sheet_content};
pub use writer::{write_sheet, write_sheet_content};
