pub mod export;
pub mod table;

pub use export::{OutputFormat, records_to_csv, records_to_json};
pub use table::TableDisplay;
