//! Splits publications into multibib partitions and writes each one as BibTeX.

use crate::core::records::Publication;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Partition<'a> {
    /// Letters only, usable as a `\newcites` suffix.
    pub tag: String,
    pub label: String,
    pub entries: Vec<&'a Publication>,
}

impl Partition<'_> {
    pub fn bib_stem(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.tag)
    }
}

/// Tags that would make `\newcites` redefine an existing command,
/// e.g. `style` turns `\bibliography<tag>` into `\bibliographystyle`.
const RESERVED_TAGS: [&str; 5] = ["style", "p", "t", "author", "year"];

pub fn partition_tag(category: &str) -> String {
    let tag: String = category
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if tag.is_empty() {
        "other".to_string()
    } else if RESERVED_TAGS.contains(&tag.as_str()) {
        format!("{}pubs", tag)
    } else {
        tag
    }
}

pub fn partition_label(category: &str) -> String {
    match category.trim().to_uppercase().as_str() {
        "JOURNAL" => "Journal Articles".to_string(),
        "CONFERENCE" => "Conference Papers".to_string(),
        "REPORT" => "Technical Reports".to_string(),
        other => title_case(other),
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group by partition tag, keeping first-appearance order of partitions and entries.
pub fn partition(publications: &[Publication]) -> Vec<Partition<'_>> {
    let mut partitions: Vec<Partition<'_>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for publication in publications {
        let tag = partition_tag(&publication.category);
        let position = *positions.entry(tag.clone()).or_insert_with(|| {
            partitions.push(Partition {
                tag,
                label: partition_label(&publication.category),
                entries: Vec::new(),
            });
            partitions.len() - 1
        });
        partitions[position].entries.push(publication);
    }

    partitions
}

fn venue_field(entry_type: &str) -> &'static str {
    match entry_type {
        "article" => "journal",
        "inproceedings" | "incollection" => "booktitle",
        "techreport" => "institution",
        "phdthesis" | "mastersthesis" => "school",
        _ => "howpublished",
    }
}

fn braces_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Field value safe to wrap in braces.
pub fn bib_value(text: &str) -> String {
    let text = text.trim();
    let mut out = String::with_capacity(text.len());
    let keep_braces = braces_balanced(text);
    let mut previous = None;

    for c in text.chars() {
        match c {
            '{' | '}' if !keep_braces => {}
            '&' | '%' | '#' if previous != Some('\\') => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
        previous = Some(c);
    }
    out
}

fn explicit_key(publication: &Publication) -> Option<String> {
    publication
        .key
        .as_ref()
        .map(|key| key.chars().filter(|c| !c.is_whitespace() && *c != ',').collect())
}

/// `<tag><year|nd><n>`, taking the first ordinal not already in `used`.
fn generated_key(publication: &Publication, tag: &str, used: &HashSet<String>) -> String {
    let year = publication
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "nd".to_string());
    let mut ordinal = 1;
    loop {
        let key = format!("{}{}{}", tag, year, ordinal);
        if !used.contains(&key) {
            return key;
        }
        ordinal += 1;
    }
}

pub fn render_entry(publication: &Publication, key: &str) -> String {
    let mut fields: Vec<(&str, String)> = vec![
        ("author", bib_value(&publication.authors)),
        ("title", format!("{{{}}}", bib_value(&publication.title))),
    ];
    if let Some(venue) = &publication.venue {
        fields.push((venue_field(&publication.entry_type), bib_value(venue)));
    }
    if let Some(year) = publication.year {
        fields.push(("year", year.to_string()));
    }

    let optional = [
        ("volume", &publication.volume),
        ("pages", &publication.pages),
        ("doi", &publication.doi),
        ("note", &publication.note),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            fields.push((name, bib_value(value)));
        }
    }

    let mut out = format!("@{}{{{},\n", publication.entry_type, key);
    for (name, value) in fields {
        if name == "author" && value.is_empty() {
            continue;
        }
        out.push_str(&format!("  {} = {{{}}},\n", name, value));
    }
    out.push_str("}\n");
    out
}

pub fn render_partition(partition: &Partition<'_>) -> String {
    // 先收集明確指定的 key，產生的 key 不可與之重複
    let mut used: HashSet<String> = HashSet::new();
    for key in partition.entries.iter().filter_map(|p| explicit_key(p)) {
        if !used.insert(key.clone()) {
            tracing::warn!(
                "⚠️ Duplicate citation key '{}' in {}, BibTeX keeps only the first entry",
                key,
                partition.label
            );
        }
    }

    let entries: Vec<String> = partition
        .entries
        .iter()
        .map(|publication| {
            let key = match explicit_key(publication) {
                Some(key) => key,
                None => {
                    let key = generated_key(publication, &partition.tag, &used);
                    used.insert(key.clone());
                    key
                }
            };
            render_entry(publication, &key)
        })
        .collect();
    entries.join("\n")
}
