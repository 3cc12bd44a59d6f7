use crate::config::toml_config::ParConfig;
use crate::core::records::ReportData;
use crate::core::report::build_report;
use crate::domain::model::{ReportOutput, TableSet};
use crate::domain::ports::{Pipeline, Storage, TableSource};
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Extract the workbook tables, render the PAR and write it out.
pub struct ParPipeline<S: Storage, T: TableSource> {
    storage: S,
    source: T,
    config: ParConfig,
}

impl<S: Storage, T: TableSource> ParPipeline<S, T> {
    pub fn new(storage: S, source: T, config: ParConfig) -> Self {
        Self {
            storage,
            source,
            config,
        }
    }

    fn bundle(&self, result: &ReportOutput) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        zip.start_file(self.config.report.tex_filename.as_str(), SimpleFileOptions::default())?;
        zip.write_all(result.tex.as_bytes())?;

        for bib in &result.bibliographies {
            zip.start_file(bib.filename.as_str(), SimpleFileOptions::default())?;
            zip.write_all(bib.content.as_bytes())?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

#[async_trait::async_trait]
impl<S: Storage, T: TableSource> Pipeline for ParPipeline<S, T> {
    async fn extract(&self) -> Result<TableSet> {
        let names = &self.config.tables;
        let mut tables = TableSet::new();

        tracing::info!("🚀 Reading tables from {}", self.source.describe());

        for name in names.required() {
            let table = self
                .source
                .fetch_table(name)
                .await?
                .ok_or_else(|| EtlError::MissingTable {
                    table: name.to_string(),
                })?;
            tracing::debug!("Table {}: {} rows", name, table.len());
            tables.insert(table);
        }

        if self.config.sections.publications {
            for name in names.optional() {
                match self.source.fetch_table(name).await? {
                    Some(table) => {
                        tracing::debug!("Table {}: {} rows", name, table.len());
                        tables.insert(table);
                    }
                    None => tracing::info!("📋 No '{}' sheet, skipping publications", name),
                }
            }
        }

        Ok(tables)
    }

    async fn transform(&self, data: TableSet) -> Result<ReportOutput> {
        let report = ReportData::from_tables(&data, &self.config.tables)?;
        let output = build_report(&report, &self.config);

        if output.summary.dangling_references > 0 {
            tracing::warn!(
                "⚠️ {} cross-table references could not be resolved",
                output.summary.dangling_references
            );
        }

        Ok(output)
    }

    async fn load(&self, result: ReportOutput) -> Result<String> {
        let tex_filename = &self.config.report.tex_filename;
        self.storage
            .write_file(tex_filename, result.tex.as_bytes())
            .await?;

        for bib in &result.bibliographies {
            tracing::debug!("Writing {} ({} entries)", bib.filename, bib.entries);
            self.storage
                .write_file(&bib.filename, bib.content.as_bytes())
                .await?;
        }

        if self.config.bundle.enabled {
            let zip_data = self.bundle(&result)?;
            tracing::debug!("Writing bundle ({} bytes)", zip_data.len());
            self.storage
                .write_file(&self.config.bundle.filename, &zip_data)
                .await?;
        }

        Ok(self.config.tex_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Table;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }

        async fn file_names(&self) -> Vec<String> {
            let files = self.files.lock().await;
            let mut names: Vec<String> = files.keys().cloned().collect();
            names.sort();
            names
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockSource {
        tables: HashMap<String, Vec<Vec<String>>>,
    }

    impl MockSource {
        fn new() -> Self {
            Self {
                tables: HashMap::new(),
            }
        }

        fn with(mut self, name: &str, rows: &[&[&str]]) -> Self {
            let cells = rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect();
            self.tables.insert(name.to_string(), cells);
            self
        }
    }

    #[async_trait]
    impl TableSource for MockSource {
        async fn fetch_table(&self, name: &str) -> Result<Option<Table>> {
            Ok(self
                .tables
                .get(name)
                .map(|cells| Table::from_cells(name, cells.clone())))
        }

        fn describe(&self) -> String {
            "mock workbook".to_string()
        }
    }

    fn workbook() -> MockSource {
        MockSource::new()
            .with(
                "CourseInfo",
                &[
                    &["COURSEID", "TITLE", "PREPSTATUS"],
                    &["NE 408", "Nuclear Engineering Design", "REPEAT"],
                    &["NE 506", "Monte Carlo Radiation Transport", "PREP"],
                ],
            )
            .with(
                "CourseHistory",
                &[
                    &["YEAR", "SEMESTER", "COURSEID", "STUDENTS", "ROLE"],
                    &["2017", "Spring", "NE 408", "25", "Instructor"],
                    &["2017", "Fall", "NE 506", "12", "Instructor"],
                ],
            )
            .with(
                "CourseDevelopment",
                &[&["YEAR", "COURSEID", "DESCRIPTION"], &["2017", "NE 506", "New labs"]],
            )
            .with(
                "AdviseeList",
                &[
                    &["NAME", "DEGREE", "STATUS", "START", "END", "EMPLOYER"],
                    &["Ada Lovelace", "PhD", "GRADUATED", "2013", "2017", "ANL"],
                ],
            )
            .with(
                "EmployerList",
                &[&["EMPLOYER", "NAME", "LOCATION"], &["ANL", "Argonne", "Lemont, IL"]],
            )
            .with(
                "Publications",
                &[
                    &["KEY", "CATEGORY", "ENTRYTYPE", "AUTHORS", "TITLE", "VENUE", "YEAR"],
                    &["w17", "JOURNAL", "article", "Wilson", "DAGMC", "Nucl. Tech.", "2017"],
                ],
            )
    }

    fn config() -> ParConfig {
        let mut config = ParConfig::default();
        config.report.year = 2017;
        config.report.output_dir = "test_output".to_string();
        config
    }

    #[tokio::test]
    async fn test_extract_reads_all_tables() {
        let pipeline = ParPipeline::new(MockStorage::new(), workbook(), config());
        let tables = pipeline.extract().await.unwrap();

        assert_eq!(tables.len(), 6);
        assert_eq!(tables.require("CourseHistory").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_extract_missing_required_table() {
        let mut source = workbook();
        source.tables.remove("EmployerList");
        let pipeline = ParPipeline::new(MockStorage::new(), source, config());

        match pipeline.extract().await {
            Err(EtlError::MissingTable { table }) => assert_eq!(table, "EmployerList"),
            other => panic!("unexpected result: {:?}", other.map(|t| t.len())),
        }
    }

    #[tokio::test]
    async fn test_extract_without_publications_sheet() {
        let mut source = workbook();
        source.tables.remove("Publications");
        let pipeline = ParPipeline::new(MockStorage::new(), source, config());

        let tables = pipeline.extract().await.unwrap();
        assert_eq!(tables.len(), 5);

        let output = pipeline.transform(tables).await.unwrap();
        assert!(!output.tex.contains("\\section{Publications}"));
        assert!(output.bibliographies.is_empty());
    }

    #[tokio::test]
    async fn test_transform_joins_tables() {
        let pipeline = ParPipeline::new(MockStorage::new(), workbook(), config());
        let tables = pipeline.extract().await.unwrap();
        let output = pipeline.transform(tables).await.unwrap();

        assert!(output
            .tex
            .contains("\\multirow{1}{*}{Spring} & NE 408 & 25 & Instructor"));
        assert!(output
            .tex
            .contains("\\item \\textbf{NE 506}: Monte Carlo Radiation Transport -- New labs"));
        assert!(output
            .tex
            .contains("Ada Lovelace & PhD & -- & Argonne, Lemont, IL"));
        assert!(output.tex.contains("\\bibliographyjournal{par_journal}"));
        assert_eq!(output.summary.graduated_advisees, 1);
        assert_eq!(output.summary.dangling_references, 0);
    }

    #[tokio::test]
    async fn test_load_writes_tex_and_bib_files() {
        let storage = MockStorage::new();
        let pipeline = ParPipeline::new(storage.clone(), workbook(), config());

        let tables = pipeline.extract().await.unwrap();
        let output = pipeline.transform(tables).await.unwrap();
        let tex_path = pipeline.load(output).await.unwrap();

        assert_eq!(tex_path, "test_output/par.tex");
        assert_eq!(storage.file_names().await, vec!["par.tex", "par_journal.bib"]);

        let bib = String::from_utf8(storage.get_file("par_journal.bib").await.unwrap()).unwrap();
        assert!(bib.starts_with("@article{w17,\n"));
    }

    #[tokio::test]
    async fn test_load_with_bundle() {
        let storage = MockStorage::new();
        let mut config = config();
        config.bundle.enabled = true;
        let pipeline = ParPipeline::new(storage.clone(), workbook(), config);

        let tables = pipeline.extract().await.unwrap();
        let output = pipeline.transform(tables).await.unwrap();
        pipeline.load(output).await.unwrap();

        let zip_data = storage.get_file("par_bundle.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();

        let mut file_names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        file_names.sort();
        assert_eq!(file_names, vec!["par.tex", "par_journal.bib"]);

        let mut tex = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("par.tex").unwrap(), &mut tex).unwrap();
        assert!(tex.ends_with("\\end{document}\n"));
    }
}
