// Adapters layer: concrete implementations for external systems (Google APIs, CSV exports).

pub mod auth;
pub mod csv_source;
pub mod sheets;

pub use csv_source::CsvDirectorySource;
pub use sheets::{GoogleSheetsSource, SpreadsheetRef};
