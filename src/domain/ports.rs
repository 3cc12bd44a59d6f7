use crate::domain::model::{ReportOutput, Table, TableSet};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Where the report tables come from.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// `Ok(None)` when the sheet does not exist.
    async fn fetch_table(&self, name: &str) -> Result<Option<Table>>;

    fn describe(&self) -> String;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<TableSet>;
    async fn transform(&self, data: TableSet) -> Result<ReportOutput>;
    async fn load(&self, result: ReportOutput) -> Result<String>;
}
