//! Typed views of the workbook tables and the lookups that join them.

use crate::config::toml_config::TableNames;
use crate::domain::model::{sheet_row, Row, Table, TableSet};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Semester {
    Spring,
    Summer,
    Fall,
}

impl Semester {
    /// Report order.
    pub const ALL: [Semester; 3] = [Semester::Spring, Semester::Summer, Semester::Fall];

    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::Spring => "Spring",
            Semester::Summer => "Summer",
            Semester::Fall => "Fall",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Semester {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spring" => Ok(Semester::Spring),
            "summer" => Ok(Semester::Summer),
            "fall" => Ok(Semester::Fall),
            _ => Err("expected Spring, Summer or Fall".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrepStatus {
    Prep,
    Repeat,
    Interest,
}

impl PrepStatus {
    pub const ALL: [PrepStatus; 3] = [PrepStatus::Prep, PrepStatus::Repeat, PrepStatus::Interest];

    pub fn label(&self) -> &'static str {
        match self {
            PrepStatus::Prep => "Courses I am prepared to teach",
            PrepStatus::Repeat => "Courses I have taught and could teach again",
            PrepStatus::Interest => "Courses I am interested in but not prepared to teach",
        }
    }
}

impl FromStr for PrepStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PREP" => Ok(PrepStatus::Prep),
            "REPEAT" => Ok(PrepStatus::Repeat),
            "INTEREST" => Ok(PrepStatus::Interest),
            _ => Err("expected PREP, REPEAT or INTEREST".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviseeStatus {
    Current,
    Graduated,
    Left,
}

impl FromStr for AdviseeStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CURRENT" => Ok(AdviseeStatus::Current),
            "GRADUATED" => Ok(AdviseeStatus::Graduated),
            "LEFT" => Ok(AdviseeStatus::Left),
            _ => Err("expected CURRENT, GRADUATED or LEFT".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseInfo {
    pub course_id: String,
    pub title: Option<String>,
    pub prep_status: Option<PrepStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseOffering {
    pub year: i32,
    pub semester: Semester,
    pub course_id: String,
    pub students: u32,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseDevelopment {
    pub year: i32,
    pub course_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Advisee {
    pub name: String,
    pub degree: String,
    pub status: AdviseeStatus,
    pub start: Option<i32>,
    pub end: Option<i32>,
    pub employer: Option<String>,
    pub coadvisor: Option<String>,
    pub thesis: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Employer {
    pub code: String,
    pub name: String,
    pub location: Option<String>,
}

impl Employer {
    pub fn display_name(&self) -> String {
        match &self.location {
            Some(location) => format!("{}, {}", self.name, location),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub key: Option<String>,
    pub category: String,
    pub entry_type: String,
    pub authors: String,
    pub title: String,
    pub venue: Option<String>,
    pub year: Option<i32>,
    pub volume: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub note: Option<String>,
}

fn invalid(table: &str, index: usize, column: &str, value: &str, reason: &str) -> EtlError {
    EtlError::InvalidCell {
        table: table.to_string(),
        row: sheet_row(index),
        column: column.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_required<T: FromStr>(row: &Row, table: &str, index: usize, column: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    let value = row.required(table, index, column)?;
    value
        .parse::<T>()
        .map_err(|e| invalid(table, index, column, value, &e.to_string()))
}

fn parse_optional<T: FromStr>(
    row: &Row,
    table: &str,
    index: usize,
    column: &str,
) -> Result<Option<T>>
where
    T::Err: fmt::Display,
{
    match row.optional(column) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(table, index, column, value, &e.to_string())),
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

pub fn parse_course_info(table: &Table) -> Result<Vec<CourseInfo>> {
    table.require_columns(&["COURSEID", "PREPSTATUS"])?;

    let mut courses = Vec::with_capacity(table.len());
    for (index, row) in table.rows.iter().enumerate() {
        let prep_status = match row.optional("PREPSTATUS") {
            None => None,
            Some(value) => match value.parse::<PrepStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    tracing::warn!(
                        "⚠️ {} row {}: unknown PREPSTATUS '{}', course not listed",
                        table.name,
                        sheet_row(index),
                        value
                    );
                    None
                }
            },
        };

        courses.push(CourseInfo {
            course_id: row.required(&table.name, index, "COURSEID")?.to_string(),
            title: owned(row.optional("TITLE")),
            prep_status,
        });
    }
    Ok(courses)
}

pub fn parse_course_history(table: &Table) -> Result<Vec<CourseOffering>> {
    table.require_columns(&["YEAR", "SEMESTER", "COURSEID", "STUDENTS", "ROLE"])?;

    let mut offerings = Vec::with_capacity(table.len());
    for (index, row) in table.rows.iter().enumerate() {
        offerings.push(CourseOffering {
            year: parse_required(row, &table.name, index, "YEAR")?,
            semester: parse_required(row, &table.name, index, "SEMESTER")?,
            course_id: row.required(&table.name, index, "COURSEID")?.to_string(),
            students: parse_optional(row, &table.name, index, "STUDENTS")?.unwrap_or(0),
            role: row.get("ROLE").trim().to_string(),
        });
    }
    Ok(offerings)
}

pub fn parse_course_development(table: &Table) -> Result<Vec<CourseDevelopment>> {
    table.require_columns(&["YEAR", "COURSEID", "DESCRIPTION"])?;

    let mut developments = Vec::with_capacity(table.len());
    for (index, row) in table.rows.iter().enumerate() {
        developments.push(CourseDevelopment {
            year: parse_required(row, &table.name, index, "YEAR")?,
            course_id: row.required(&table.name, index, "COURSEID")?.to_string(),
            description: row.get("DESCRIPTION").trim().to_string(),
        });
    }
    Ok(developments)
}

pub fn parse_advisees(table: &Table) -> Result<Vec<Advisee>> {
    table.require_columns(&["NAME", "DEGREE", "STATUS", "START", "END", "EMPLOYER"])?;

    let mut advisees = Vec::with_capacity(table.len());
    for (index, row) in table.rows.iter().enumerate() {
        advisees.push(Advisee {
            name: row.required(&table.name, index, "NAME")?.to_string(),
            degree: row.get("DEGREE").trim().to_string(),
            status: parse_required(row, &table.name, index, "STATUS")?,
            start: parse_optional(row, &table.name, index, "START")?,
            end: parse_optional(row, &table.name, index, "END")?,
            employer: owned(row.optional("EMPLOYER")),
            coadvisor: owned(row.optional("COADVISOR")),
            thesis: owned(row.optional("THESIS")),
        });
    }
    Ok(advisees)
}

pub fn parse_employers(table: &Table) -> Result<Vec<Employer>> {
    table.require_columns(&["EMPLOYER", "NAME"])?;

    let mut employers = Vec::with_capacity(table.len());
    for (index, row) in table.rows.iter().enumerate() {
        employers.push(Employer {
            code: row.required(&table.name, index, "EMPLOYER")?.to_string(),
            name: row.required(&table.name, index, "NAME")?.to_string(),
            location: owned(row.optional("LOCATION")),
        });
    }
    Ok(employers)
}

pub fn parse_publications(table: &Table) -> Result<Vec<Publication>> {
    table.require_columns(&["CATEGORY", "AUTHORS", "TITLE", "YEAR"])?;

    let mut publications = Vec::with_capacity(table.len());
    for (index, row) in table.rows.iter().enumerate() {
        publications.push(Publication {
            key: owned(row.optional("KEY")),
            category: row
                .optional("CATEGORY")
                .map(str::to_uppercase)
                .unwrap_or_else(|| "OTHER".to_string()),
            entry_type: row
                .optional("ENTRYTYPE")
                .map(str::to_lowercase)
                .unwrap_or_else(|| "misc".to_string()),
            authors: row.get("AUTHORS").trim().to_string(),
            title: row.required(&table.name, index, "TITLE")?.to_string(),
            venue: owned(row.optional("VENUE")),
            year: parse_optional(row, &table.name, index, "YEAR")?,
            volume: owned(row.optional("VOLUME")),
            pages: owned(row.optional("PAGES")),
            doi: owned(row.optional("DOI")),
            note: owned(row.optional("NOTE")),
        });
    }
    Ok(publications)
}

/// Index rows by identifier; on duplicates the first row wins.
pub fn build_lookup<'a, T>(
    table: &str,
    items: &'a [T],
    key: impl Fn(&'a T) -> &'a str,
) -> HashMap<&'a str, &'a T> {
    let mut lookup = HashMap::with_capacity(items.len());
    for item in items {
        let id = key(item);
        if lookup.contains_key(id) {
            tracing::warn!("⚠️ Duplicate key '{}' in {}, keeping the first row", id, table);
            continue;
        }
        lookup.insert(id, item);
    }
    lookup
}

/// Everything the report needs, parsed from one snapshot of the workbook.
#[derive(Debug, Clone, Default)]
pub struct ReportData {
    pub courses: Vec<CourseInfo>,
    pub offerings: Vec<CourseOffering>,
    pub developments: Vec<CourseDevelopment>,
    pub advisees: Vec<Advisee>,
    pub employers: Vec<Employer>,
    /// `None` when the workbook has no publications sheet.
    pub publications: Option<Vec<Publication>>,
}

impl ReportData {
    pub fn from_tables(tables: &TableSet, names: &TableNames) -> Result<Self> {
        let courses = parse_course_info(tables.require(&names.course_info)?)?;
        let offerings = parse_course_history(tables.require(&names.course_history)?)?;
        let developments = parse_course_development(tables.require(&names.course_development)?)?;
        let advisees = parse_advisees(tables.require(&names.advisees)?)?;
        let employers = parse_employers(tables.require(&names.employers)?)?;

        let publications = match tables.get(&names.publications) {
            Some(table) => Some(parse_publications(table)?),
            None => None,
        };

        Ok(Self {
            courses,
            offerings,
            developments,
            advisees,
            employers,
            publications,
        })
    }

    pub fn course_lookup(&self) -> HashMap<&str, &CourseInfo> {
        build_lookup("CourseInfo", &self.courses, |c| c.course_id.as_str())
    }

    pub fn employer_lookup(&self) -> HashMap<&str, &Employer> {
        build_lookup("EmployerList", &self.employers, |e| e.code.as_str())
    }

    pub fn offerings_in(&self, year: i32) -> impl Iterator<Item = &CourseOffering> {
        self.offerings.iter().filter(move |o| o.year == year)
    }

    pub fn developments_in(&self, year: i32) -> impl Iterator<Item = &CourseDevelopment> {
        self.developments.iter().filter(move |d| d.year == year)
    }

    pub fn graduated_in(&self, year: i32) -> impl Iterator<Item = &Advisee> {
        self.advisees
            .iter()
            .filter(move |a| a.status == AdviseeStatus::Graduated && a.end == Some(year))
    }

    /// 檢查跨表參照，對找不到的代碼發出警告並回傳數量
    pub fn check_references(&self, year: i32) -> usize {
        let courses = self.course_lookup();
        let employers = self.employer_lookup();
        let mut dangling = 0;

        for offering in self.offerings_in(year) {
            if !courses.contains_key(offering.course_id.as_str()) {
                tracing::warn!(
                    "⚠️ Course {} ({} {}) is not in CourseInfo",
                    offering.course_id,
                    offering.semester,
                    offering.year
                );
                dangling += 1;
            }
        }

        for development in self.developments_in(year) {
            if !courses.contains_key(development.course_id.as_str()) {
                tracing::warn!(
                    "⚠️ Developed course {} is not in CourseInfo",
                    development.course_id
                );
                dangling += 1;
            }
        }

        for advisee in &self.advisees {
            if let Some(code) = &advisee.employer {
                if !employers.contains_key(code.as_str()) {
                    tracing::warn!(
                        "⚠️ Employer code {} for {} is not in EmployerList",
                        code,
                        advisee.name
                    );
                    dangling += 1;
                }
            }
        }

        dangling
    }
}
