use crate::core::bibliography::Partition;
use crate::core::latex::{
    bold, emph, escape, header_row, none_row, DOUBLE_RULE, PART_RULE, SINGLE_RULE,
};
use crate::core::records::{
    Advisee, AdviseeStatus, CourseDevelopment, CourseInfo, CourseOffering, Employer, PrepStatus,
    Semester,
};
use std::collections::HashMap;

const TABLE_FOOTER: &str = "\\end{tabular}\n \\end{centering}\n";

fn table_header(spec: &str, columns: &[&str]) -> String {
    format!(
        "\\begin{{centering}}\n\\begin{{tabular}}{{{}}}\\hline\n{}\n",
        spec,
        header_row(columns)
    )
}

/// Courses taught in `year`, one block of rows per semester.
pub fn render_course_list(offerings: &[CourseOffering], year: i32) -> String {
    let mut out = String::from("\\section{List of Courses Taught}\n");
    out.push_str(&table_header(
        "|l|l|c|l|",
        &["Semester", "Course", "\\# of Students", "Role"],
    ));

    for semester in Semester::ALL {
        let rows: Vec<String> = offerings
            .iter()
            .filter(|o| o.year == year && o.semester == semester)
            .map(|o| {
                format!(
                    "{} & {} & {}",
                    escape(&o.course_id),
                    o.students,
                    escape(&o.role)
                )
            })
            .collect();

        if rows.is_empty() {
            out.push_str(&format!("{} & {}{}\n", semester, none_row(3), DOUBLE_RULE));
        } else {
            out.push_str(&format!(
                "\\multirow{{{}}}{{*}}{{{}}} & {}{}\n",
                rows.len(),
                semester,
                rows.join(&format!("{}\n & ", PART_RULE)),
                DOUBLE_RULE
            ));
        }
    }

    out.push_str(TABLE_FOOTER);
    out
}

pub fn render_future_courses(courses: &[CourseInfo]) -> String {
    let mut out = String::from("\\section{List of Courses for Future}\n\n");
    for status in PrepStatus::ALL {
        let ids: Vec<String> = courses
            .iter()
            .filter(|c| c.prep_status == Some(status))
            .map(|c| escape(&c.course_id))
            .collect();
        out.push_str(&format!("{}: {}\\\\\n", status.label(), ids.join(", ")));
    }
    out
}

pub fn render_course_development(
    developments: &[CourseDevelopment],
    courses: &HashMap<&str, &CourseInfo>,
    year: i32,
) -> String {
    let mut out = String::from("\\section{Course Development}\n");
    let items: Vec<&CourseDevelopment> = developments.iter().filter(|d| d.year == year).collect();

    if items.is_empty() {
        out.push_str(&emph("none"));
        out.push('\n');
        return out;
    }

    out.push_str("\\begin{itemize}\n");
    for item in items {
        let title = courses
            .get(item.course_id.as_str())
            .and_then(|c| c.title.as_deref());

        let mut line = format!("\\item {}", bold(&escape(&item.course_id)));
        if let Some(title) = title {
            line.push_str(&format!(": {}", escape(title)));
        }
        if !item.description.is_empty() {
            line.push_str(&format!(" -- {}", escape(&item.description)));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str("\\end{itemize}\n");
    out
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "--".to_string())
}

fn employer_text(code: Option<&str>, employers: &HashMap<&str, &Employer>) -> Option<String> {
    let code = code?;
    Some(match employers.get(code) {
        Some(employer) => escape(&employer.display_name()),
        // 找不到代碼時直接輸出原始代碼
        None => escape(code),
    })
}

fn table_rows(rows: Vec<String>, span: usize) -> String {
    if rows.is_empty() {
        return format!("{}{}\n", none_row(span), SINGLE_RULE);
    }
    rows.into_iter()
        .map(|row| format!("{}{}\n", row, SINGLE_RULE))
        .collect()
}

pub fn render_advising(
    advisees: &[Advisee],
    employers: &HashMap<&str, &Employer>,
    year: i32,
) -> String {
    let mut out = String::from("\\section{Graduate Advising}\n");

    let mut current: Vec<&Advisee> = advisees
        .iter()
        .filter(|a| a.status == AdviseeStatus::Current)
        .collect();
    current.sort_by(|a, b| {
        a.start
            .unwrap_or(i32::MAX)
            .cmp(&b.start.unwrap_or(i32::MAX))
            .then_with(|| a.name.cmp(&b.name))
    });

    out.push_str("\\subsection{Current Advisees}\n");
    out.push_str(&table_header(
        "|l|l|c|l|",
        &["Name", "Degree", "Start", "Co-advisor"],
    ));
    let rows = current
        .iter()
        .map(|a| {
            format!(
                "{} & {} & {} & {}",
                escape(&a.name),
                escape(&a.degree),
                or_dash(a.start.map(|s| s.to_string())),
                or_dash(a.coadvisor.as_deref().map(escape))
            )
        })
        .collect();
    out.push_str(&table_rows(rows, 4));
    out.push_str(TABLE_FOOTER);

    out.push_str("\\subsection{Graduated Advisees}\n");
    out.push_str(&table_header(
        "|l|l|l|l|",
        &["Name", "Degree", "Thesis", "Employer"],
    ));
    let rows = advisees
        .iter()
        .filter(|a| a.status == AdviseeStatus::Graduated && a.end == Some(year))
        .map(|a| {
            format!(
                "{} & {} & {} & {}",
                escape(&a.name),
                escape(&a.degree),
                or_dash(a.thesis.as_deref().map(escape)),
                or_dash(employer_text(a.employer.as_deref(), employers))
            )
        })
        .collect();
    out.push_str(&table_rows(rows, 4));
    out.push_str(TABLE_FOOTER);

    out
}

pub fn render_publications(partitions: &[Partition<'_>], bib_prefix: &str, bib_style: &str) -> String {
    let mut out = String::from("\\section{Publications}\n");
    if partitions.is_empty() {
        out.push_str(&emph("none"));
        out.push('\n');
        return out;
    }

    for partition in partitions {
        let tag = &partition.tag;
        out.push_str(&format!("\\subsection*{{{}}}\n", escape(&partition.label)));
        out.push_str(&format!("\\nocite{}{{*}}\n", tag));
        out.push_str(&format!("\\bibliographystyle{}{{{}}}\n", tag, bib_style));
        out.push_str(&format!(
            "\\bibliography{}{{{}}}\n",
            tag,
            partition.bib_stem(bib_prefix)
        ));
    }
    out
}
