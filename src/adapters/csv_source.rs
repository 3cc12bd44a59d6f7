use crate::domain::model::Table;
use crate::domain::ports::TableSource;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads `<dir>/<table>.csv` exports of the workbook.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }
}

#[async_trait]
impl TableSource for CsvDirectorySource {
    async fn fetch_table(&self, name: &str) -> Result<Option<Table>> {
        let path = self.table_path(name);
        if !path.exists() {
            tracing::debug!("No CSV export at {}", path.display());
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;

        let mut cells = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            // Excel 匯出的 UTF-8 BOM
            if cells.is_empty() {
                if let Some(first) = row.first_mut() {
                    *first = first.trim_start_matches('\u{feff}').to_string();
                }
            }
            cells.push(row);
        }

        tracing::debug!("Read {} lines from {}", cells.len(), path.display());
        Ok(Some(Table::from_cells(name, cells)))
    }

    fn describe(&self) -> String {
        format!("CSV exports in {}", self.dir.display())
    }
}
