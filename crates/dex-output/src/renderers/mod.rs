//! Bundled renderers.

mod csv;
mod json;
mod notes;
mod reader;
mod tdsx;
pub mod workbook;
mod xlsx;

pub use self::csv::CsvRenderer;
pub use json::JsonRenderer;
pub use notes::{NOTES_SHEET, notes_sheet, set_row_count};
pub use tdsx::{TdsxRenderer, write_tds};
pub use xlsx::{DATA_SHEET, InfoRenderer, PIVOT_SHEET, XlsxRenderer};
