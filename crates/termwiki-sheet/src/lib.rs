//! Spreadsheet exchange: one row per term form, grouped by `concept_id`.
//!
//! ```text
//! concept_id,language,text,status[,source][,<metadata>...]
//! ```

mod read;
mod write;

pub use read::{read_sheet, SheetParser};
pub use write::{write_sheet, SheetSerializer};

pub const FIXED_COLUMNS: [&str; 4] = ["concept_id", "language", "text", "status"];
pub const SOURCE_COLUMN: &str = "source";
