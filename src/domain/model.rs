use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One data row of a sheet, keyed by upper-cased header name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub data: HashMap<String, String>,
}

impl Row {
    /// 取得欄位內容，缺少時回傳空字串
    pub fn get(&self, column: &str) -> &str {
        self.data
            .get(&normalize_header(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn optional(&self, column: &str) -> Option<&str> {
        let value = self.get(column).trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// `index` is the 0-based data row index; errors report the 1-based sheet row.
    pub fn required(&self, table: &str, index: usize, column: &str) -> Result<&str> {
        self.optional(column).ok_or_else(|| EtlError::InvalidCell {
            table: table.to_string(),
            row: sheet_row(index),
            column: normalize_header(column),
            value: String::new(),
            reason: "value is required".to_string(),
        })
    }
}

/// Sheet row number for a data row: the header occupies row 1.
pub fn sheet_row(index: usize) -> usize {
    index + 2
}

pub fn normalize_header(header: &str) -> String {
    header.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// 由原始儲存格建立表格：第一列為標題列
    pub fn from_cells(name: &str, cells: Vec<Vec<String>>) -> Self {
        let mut lines = cells.into_iter();
        let headers: Vec<String> = lines
            .next()
            .unwrap_or_default()
            .iter()
            .map(|h| normalize_header(h))
            .collect();

        let rows = lines
            .filter(|line| line.iter().any(|cell| !cell.trim().is_empty()))
            .map(|line| {
                let mut data = HashMap::new();
                for (i, header) in headers.iter().enumerate() {
                    if header.is_empty() {
                        continue;
                    }
                    let value = line.get(i).cloned().unwrap_or_default();
                    data.entry(header.clone()).or_insert(value);
                }
                Row { data }
            })
            .collect();

        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        let wanted = normalize_header(column);
        self.headers.iter().any(|h| *h == wanted)
    }

    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        for column in columns {
            if !self.has_column(column) {
                return Err(EtlError::MissingColumn {
                    table: self.name.clone(),
                    column: normalize_header(column),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All tables fetched in one run, keyed by sheet name.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    tables: HashMap<String, Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Table> {
        self.get(name).ok_or_else(|| EtlError::MissingTable {
            table: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Table::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BibFile {
    pub filename: String,
    pub content: String,
    pub entries: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSummary {
    pub offerings: usize,
    pub developments: usize,
    pub current_advisees: usize,
    pub graduated_advisees: usize,
    pub publications: usize,
    pub dangling_references: usize,
}

#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub tex: String,
    pub bibliographies: Vec<BibFile>,
    pub summary: ReportSummary,
}
