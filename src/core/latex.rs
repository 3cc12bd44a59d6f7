//! LaTeX text helpers shared by the section renderers.

pub const SINGLE_RULE: &str = " \\\\ \\hline";
pub const PART_RULE: &str = " \\\\ \\cline{2-4}";
pub const DOUBLE_RULE: &str = " \\\\ \\hline\\hline";

/// Escape spreadsheet text for use in LaTeX body text.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}

pub fn section_separator(title: &str) -> String {
    format!("\n\n%%\n%% {}", title)
}

pub fn bold(text: &str) -> String {
    format!("\\textbf{{{}}}", text)
}

pub fn emph(text: &str) -> String {
    format!("\\emph{{{}}}", text)
}

/// Header row of a ruled table, closed with a double rule.
pub fn header_row(columns: &[&str]) -> String {
    let cells: Vec<String> = columns.iter().map(|c| bold(c)).collect();
    format!("{}{}", cells.join(" & "), DOUBLE_RULE)
}

/// Full-width `none` row for an empty table with `span` columns.
pub fn none_row(span: usize) -> String {
    format!("\\multicolumn{{{}}}{{|c|}}{{{}}}", span, emph("none"))
}
