use par_build::{
    CsvDirectorySource, EtlError, LocalStorage, ParConfig, ParPipeline, ReportEngine, SourceType,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/par_data")
}

fn csv_config(data_dir: &Path, output_dir: &Path) -> ParConfig {
    let mut config = ParConfig::default();
    config.report.year = 2017;
    config.report.output_dir = output_dir.to_str().unwrap().to_string();
    config.source.r#type = SourceType::Csv;
    config.source.csv_dir = data_dir.to_str().unwrap().to_string();
    config
}

async fn run(config: ParConfig) -> par_build::Result<String> {
    let storage = LocalStorage::new(config.output_path().to_string());
    let source = CsvDirectorySource::new(&config.source.csv_dir);
    let pipeline = ParPipeline::new(storage, source, config);
    ReportEngine::new(pipeline).run().await
}

#[tokio::test]
async fn test_end_to_end_report_from_csv_exports() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config = csv_config(&fixture_dir(), temp_dir.path());

    let tex_path = run(config).await?;
    assert!(tex_path.ends_with("/par.tex"));

    let tex = std::fs::read_to_string(temp_dir.path().join("par.tex"))?;

    assert!(tex.starts_with("\\documentclass{article}\n\n\\usepackage{ep_par}\n\\usepackage{multibib}\n"));
    assert!(tex.contains("\\newcites{journal}{Journal Articles}\n\\newcites{conference}{Conference Papers}\n"));
    assert!(tex.contains("\\newcommand{\\paryear}{2017}\n"));

    // Course list only shows the report year.
    assert!(tex.contains(
        "\\multirow{2}{*}{Spring} & NE 408 & 25 & Instructor \\\\ \\cline{2-4}\n & NE 506 & 12 & Instructor \\\\ \\hline\\hline\n"
    ));
    assert!(tex.contains("Summer & \\multicolumn{3}{|c|}{\\emph{none}} \\\\ \\hline\\hline\n"));
    assert!(tex.contains("\\multirow{1}{*}{Fall} & NE 155 & 80 & Co-instructor \\\\ \\hline\\hline\n"));
    assert!(!tex.contains(" & 22 & "));

    assert!(tex.contains("Courses I am prepared to teach: NE 506\\\\\n"));
    assert!(tex.contains("Courses I have taught and could teach again: NE 408, NE 155\\\\\n"));
    assert!(tex.contains("Courses I am interested in but not prepared to teach: EP 271\\\\\n"));

    assert!(tex.contains(
        "\\item \\textbf{NE 506}: Monte Carlo Radiation Transport -- Rewrote the variance reduction labs\n"
    ));
    assert!(!tex.contains("New design project"));

    let turing = tex.find("Alan Turing & PhD & 2014 & --").unwrap();
    let hopper = tex.find("Grace Hopper & MS & 2016 & D. Henderson").unwrap();
    assert!(turing < hopper);
    assert!(tex.contains(
        "Ada Lovelace & PhD & Shielding \\& Activation Analysis & Argonne National Laboratory, Lemont, IL \\\\ \\hline\n"
    ));
    assert!(!tex.contains("Old Graduate"));

    assert!(tex.contains("\\bibliographyjournal{par_journal}\n"));
    assert!(tex.contains("\\bibliographyconference{par_conference}\n"));
    assert!(tex.ends_with("\\end{document}\n"));

    let journal = std::fs::read_to_string(temp_dir.path().join("par_journal.bib"))?;
    assert!(journal.contains("@article{wilson2017,\n"));
    assert!(journal.contains("  title = {{{DAGMC} Shielding Workflows}},\n"));
    assert!(journal.contains("  pages = {1--12},\n"));

    let conference = std::fs::read_to_string(temp_dir.path().join("par_conference.bib"))?;
    assert!(conference.contains("@inproceedings{conference20171,\n"));
    assert!(conference.contains("  booktitle = {M\\&C 2017},\n"));

    assert!(!temp_dir.path().join("par_bundle.zip").exists());
    Ok(())
}

#[tokio::test]
async fn test_bundle_contains_generated_files() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = csv_config(&fixture_dir(), temp_dir.path());
    config.bundle.enabled = true;

    run(config).await?;

    let zip_data = std::fs::read(temp_dir.path().join("par_bundle.zip"))?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;

    let mut file_names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    file_names.sort();
    assert_eq!(file_names, vec!["par.tex", "par_conference.bib", "par_journal.bib"]);

    let on_disk = std::fs::read_to_string(temp_dir.path().join("par.tex"))?;
    let mut zipped = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("par.tex")?, &mut zipped)?;
    assert_eq!(zipped, on_disk);
    Ok(())
}

#[tokio::test]
async fn test_missing_required_table_fails() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let output_dir = TempDir::new()?;
    for name in ["CourseInfo", "CourseHistory", "CourseDevelopment", "AdviseeList"] {
        let file = format!("{}.csv", name);
        std::fs::copy(fixture_dir().join(&file), data_dir.path().join(&file))?;
    }

    let result = run(csv_config(data_dir.path(), output_dir.path())).await;

    match result {
        Err(EtlError::MissingTable { table }) => assert_eq!(table, "EmployerList"),
        other => panic!("expected MissingTable, got {:?}", other),
    }
    assert!(!output_dir.path().join("par.tex").exists());
    Ok(())
}

#[tokio::test]
async fn test_invalid_semester_reports_sheet_row() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let output_dir = TempDir::new()?;
    for entry in std::fs::read_dir(fixture_dir())? {
        let entry = entry?;
        std::fs::copy(entry.path(), data_dir.path().join(entry.file_name()))?;
    }
    std::fs::write(
        data_dir.path().join("CourseHistory.csv"),
        "YEAR,SEMESTER,COURSEID,STUDENTS,ROLE\n2017,Spring,NE 408,25,Instructor\n2017,Winter,NE 506,12,Instructor\n",
    )?;

    let result = run(csv_config(data_dir.path(), output_dir.path())).await;

    match result {
        Err(EtlError::InvalidCell {
            table, row, column, value, ..
        }) => {
            assert_eq!(table, "CourseHistory");
            assert_eq!(row, 3);
            assert_eq!(column, "SEMESTER");
            assert_eq!(value, "Winter");
        }
        other => panic!("expected InvalidCell, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_without_publications_sheet() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let output_dir = TempDir::new()?;
    for entry in std::fs::read_dir(fixture_dir())? {
        let entry = entry?;
        if entry.file_name() != "Publications.csv" {
            std::fs::copy(entry.path(), data_dir.path().join(entry.file_name()))?;
        }
    }

    run(csv_config(data_dir.path(), output_dir.path())).await?;

    let tex = std::fs::read_to_string(output_dir.path().join("par.tex"))?;
    assert!(!tex.contains("multibib"));
    assert!(!tex.contains("\\section{Publications}"));
    assert!(tex.contains("\\section{Graduate Advising}"));

    let bib_files = std::fs::read_dir(output_dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "bib"))
        .count();
    assert_eq!(bib_files, 0);
    Ok(())
}

#[test]
fn test_config_file_drives_the_run() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("par-config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[report]
year = 2017
person = "Jane Q.\\ Public"
output_dir = "{}"

[source]
type = "csv"
csv_dir = "{}"

[sections]
publications = false
"#,
            temp_dir.path().join("out").display(),
            fixture_dir().display()
        ),
    )?;

    let config = ParConfig::from_file(&config_path)?;
    let tex_path = tokio_test::block_on(run(config))?;

    let tex = std::fs::read_to_string(tex_path)?;
    assert!(tex.contains("\\newcommand{\\parperson}{Jane Q.\\ Public}\n"));
    assert!(!tex.contains("\\section{Publications}"));
    assert!(!temp_dir.path().join("out/par_journal.bib").exists());
    Ok(())
}
