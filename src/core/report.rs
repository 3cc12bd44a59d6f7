use crate::config::toml_config::ParConfig;
use crate::core::bibliography::{self, Partition};
use crate::core::latex::{escape, section_separator};
use crate::core::records::{AdviseeStatus, Publication, ReportData};
use crate::core::sections;
use crate::domain::model::{BibFile, ReportOutput, ReportSummary};

fn preamble(config: &ParConfig, partitions: &[Partition<'_>]) -> String {
    let mut out = String::from("\\documentclass{article}\n\n");
    out.push_str(&format!("\\usepackage{{{}}}\n", config.report.style_package));
    if !partitions.is_empty() {
        out.push_str("\\usepackage{multibib}\n");
        for partition in partitions {
            out.push_str(&format!(
                "\\newcites{{{}}}{{{}}}\n",
                partition.tag,
                escape(&partition.label)
            ));
        }
    }
    out.push('\n');
    out.push_str(&format!("\\newcommand{{\\paryear}}{{{}}}\n", config.report.year));
    out.push_str(&format!("\\newcommand{{\\parperson}}{{{}}}\n", config.report.person));
    out.push_str("\\begin{document}\n\n\\partitle\n\n");
    out
}

fn selected_publications(data: &ReportData, config: &ParConfig) -> Vec<Publication> {
    let publications = match &data.publications {
        Some(publications) if config.sections.publications => publications,
        _ => return Vec::new(),
    };

    publications
        .iter()
        .filter(|p| !config.publications.current_year_only || p.year == Some(config.report.year))
        .cloned()
        .collect()
}

/// Render the whole report from parsed workbook data.
pub fn build_report(data: &ReportData, config: &ParConfig) -> ReportOutput {
    let year = config.report.year;
    let toggles = &config.sections;
    let courses = data.course_lookup();
    let employers = data.employer_lookup();

    let publications = selected_publications(data, config);
    let partitions = bibliography::partition(&publications);

    let mut body: Vec<(&str, String)> = Vec::new();
    if toggles.course_list {
        body.push(("Course List", sections::render_course_list(&data.offerings, year)));
    }
    if toggles.future_courses {
        body.push(("Course Prep", sections::render_future_courses(&data.courses)));
    }
    if toggles.course_development {
        body.push((
            "Course Development",
            sections::render_course_development(&data.developments, &courses, year),
        ));
    }
    if toggles.advising {
        body.push(("Advising", sections::render_advising(&data.advisees, &employers, year)));
    }
    if toggles.publications && data.publications.is_some() {
        body.push((
            "Publications",
            sections::render_publications(
                &partitions,
                &config.report.bib_prefix,
                &config.report.bib_style,
            ),
        ));
    }

    let mut tex = preamble(config, &partitions);
    for (title, section) in body {
        tex.push_str(&section_separator(title));
        tex.push('\n');
        tex.push_str(&section);
    }
    tex.push_str("\\end{document}\n");

    let bibliographies = partitions
        .iter()
        .map(|partition| BibFile {
            filename: format!("{}.bib", partition.bib_stem(&config.report.bib_prefix)),
            content: bibliography::render_partition(partition),
            entries: partition.entries.len(),
        })
        .collect();

    let summary = ReportSummary {
        offerings: data.offerings_in(year).count(),
        developments: data.developments_in(year).count(),
        current_advisees: data
            .advisees
            .iter()
            .filter(|a| a.status == AdviseeStatus::Current)
            .count(),
        graduated_advisees: data.graduated_in(year).count(),
        publications: publications.len(),
        dangling_references: data.check_references(year),
    };

    ReportOutput {
        tex,
        bibliographies,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::{CourseInfo, CourseOffering, PrepStatus, Semester};

    fn sample_data() -> ReportData {
        ReportData {
            courses: vec![CourseInfo {
                course_id: "NE 408".to_string(),
                title: Some("Nuclear Engineering Design".to_string()),
                prep_status: Some(PrepStatus::Repeat),
            }],
            offerings: vec![CourseOffering {
                year: 2017,
                semester: Semester::Fall,
                course_id: "NE 408".to_string(),
                students: 30,
                role: "Instructor".to_string(),
            }],
            ..Default::default()
        }
    }

    fn config_for(year: i32) -> ParConfig {
        let mut config = ParConfig::default();
        config.report.year = year;
        config
    }

    #[test]
    fn test_document_skeleton() {
        let output = build_report(&sample_data(), &config_for(2017));

        assert!(output.tex.starts_with(
            "\\documentclass{article}\n\n\\usepackage{ep_par}\n\n\
\\newcommand{\\paryear}{2017}\n\
\\newcommand{\\parperson}{Paul P.\\ H.\\ Wilson}\n\
\\begin{document}\n\n\\partitle\n\n\n\n%%\n%% Course List\n\\section{List of Courses Taught}\n"
        ));
        assert!(output.tex.ends_with(" \\end{centering}\n\\end{document}\n"));
        assert!(output.tex.contains("\n\n%%\n%% Course Prep\n\\section{List of Courses for Future}\n"));
        assert!(!output.tex.contains("multibib"));
        assert!(!output.tex.contains("Publications"));
        assert!(output.bibliographies.is_empty());
        assert_eq!(output.summary.offerings, 1);
    }

    #[test]
    fn test_section_toggles() {
        let mut config = config_for(2017);
        config.sections.course_list = false;
        config.sections.advising = false;

        let output = build_report(&sample_data(), &config);
        assert!(!output.tex.contains("List of Courses Taught"));
        assert!(!output.tex.contains("Graduate Advising"));
        assert!(output.tex.contains("Course Development"));
    }

    #[test]
    fn test_publication_partitions() {
        let mut data = sample_data();
        let publication = |category: &str, year: i32| Publication {
            key: None,
            category: category.to_string(),
            entry_type: "article".to_string(),
            authors: "Wilson".to_string(),
            title: "Title".to_string(),
            venue: None,
            year: Some(year),
            volume: None,
            pages: None,
            doi: None,
            note: None,
        };
        data.publications = Some(vec![
            publication("JOURNAL", 2017),
            publication("CONFERENCE", 2016),
            publication("JOURNAL", 2015),
        ]);

        let output = build_report(&data, &config_for(2017));
        assert!(output.tex.contains(
            "\\usepackage{multibib}\n\\newcites{journal}{Journal Articles}\n\\newcites{conference}{Conference Papers}\n\n"
        ));
        assert_eq!(output.bibliographies.len(), 2);
        assert_eq!(output.bibliographies[0].filename, "par_journal.bib");
        assert_eq!(output.bibliographies[0].entries, 2);
        assert_eq!(output.summary.publications, 3);

        let mut config = config_for(2017);
        config.publications.current_year_only = true;
        let output = build_report(&data, &config);
        assert_eq!(output.bibliographies.len(), 1);
        assert_eq!(output.bibliographies[0].entries, 1);
        assert!(!output.tex.contains("\\newcites{conference}"));
    }
}
