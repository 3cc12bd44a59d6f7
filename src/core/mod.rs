pub mod bibliography;
pub mod etl;
pub mod latex;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod sections;

pub use crate::domain::model::{ReportOutput, TableSet};
pub use crate::domain::ports::{Pipeline, Storage, TableSource};
pub use crate::utils::error::Result;
