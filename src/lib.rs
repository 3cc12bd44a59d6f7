pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::{CsvDirectorySource, GoogleSheetsSource};
pub use config::{cli::LocalStorage, ParConfig, SourceType};
pub use core::{etl::ReportEngine, pipeline::ParPipeline};
pub use utils::error::{EtlError, Result};
