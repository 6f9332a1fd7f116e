//! predictor-ingest: CSV sheet I/O, dated sheets and history file maintenance.

pub mod cells;
pub mod history;
pub mod sheets;
pub mod table;

pub use cells::{parse_cell, parse_date};
pub use history::{initialize_history, save_history};
pub use sheets::{dated_sheets, sheet_date, DatedSheet};
pub use table::{read_table, read_table_from_reader, write_rows, write_table, write_table_path};
