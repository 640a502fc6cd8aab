//! BibTeX import and export
//!
//! The entry type, title, author and year map onto a paper's fixed columns,
//! the `file` field onto its file name, and everything else becomes a field.
//! The entry key is kept as the `citekey` field so exports reuse it.

use biblatex::{Bibliography, ChunksExt, PermissiveType};
use thiserror::Error;
use tracing::{info, warn};

use crate::form::STANDARD_TYPES;
use crate::models::paper::Paper;
use crate::storage::{Database, DatabaseError, PaperRepo};

/// Field that carries the entry key.
pub const CITEKEY_FIELD: &str = "citekey";

#[derive(Debug, Error)]
pub enum BibtexError {
    #[error("Failed to parse BibTeX: {0}")]
    Parse(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ImportResult {
    pub added: usize,
    pub paper_ids: Vec<i64>,
}

/// Parse BibTeX source into unsaved papers with their fields attached.
pub fn parse_bibtex(content: &str) -> Result<Vec<Paper>, BibtexError> {
    let bibliography = Bibliography::parse(content)
        .map_err(|e| BibtexError::Parse(format!("{:?}", e)))?;

    let mut papers = Vec::new();

    for entry in bibliography.iter() {
        let mut paper = Paper::default();
        paper.r#type = normalize_type(&entry.entry_type.to_string());

        for (name, chunks) in &entry.fields {
            let value = chunks.format_verbatim().replace('\n', " ").trim().to_string();
            match name.as_str() {
                "title" => paper.title = value,
                "author" => paper.author = value,
                "file" => paper.file_name = value,
                "year" => match value.parse::<i32>() {
                    Ok(year) => paper.year = Some(year),
                    Err(_) => paper.set_field("year", &value),
                },
                _ => paper.set_field(name, &value),
            }
        }

        if paper.year.is_none() {
            paper.year = entry.date().ok().and_then(|date| extract_year(&date));
        }
        if paper.title.is_empty() {
            warn!("Entry '{}' has no title", entry.key);
        }

        paper.set_field(CITEKEY_FIELD, &entry.key);
        papers.push(paper);
    }

    if papers.is_empty() {
        warn!("No valid entries found in BibTeX content");
    }

    Ok(papers)
}

/// Parse BibTeX source and store every entry as a new paper.
pub fn import_bibtex(db: &Database, content: &str) -> Result<ImportResult, BibtexError> {
    let repo = PaperRepo::new(db);
    let mut paper_ids = Vec::new();

    for mut paper in parse_bibtex(content)? {
        repo.save_with_children(&mut paper)?;
        paper_ids.push(paper.id);
    }

    info!("Imported {} papers from BibTeX", paper_ids.len());

    Ok(ImportResult {
        added: paper_ids.len(),
        paper_ids,
    })
}

/// Render one paper as a BibTeX entry. Fields are written in name order.
pub fn export_paper(paper: &Paper) -> String {
    let kind = if paper.r#type.trim().is_empty() {
        "misc".to_string()
    } else {
        paper.r#type.trim().to_lowercase()
    };
    let key = paper
        .field(CITEKEY_FIELD)
        .map(str::to_string)
        .unwrap_or_else(|| format!("paper{}", paper.id));

    let mut content = format!("@{}{{{},\n", kind, key);
    content.push_str(&format!("  title = {{{}}},\n", paper.title));
    if !paper.author.is_empty() {
        content.push_str(&format!("  author = {{{}}},\n", paper.author));
    }
    if let Some(year) = paper.year {
        content.push_str(&format!("  year = {{{}}},\n", year));
    }
    if !paper.file_name.is_empty() {
        content.push_str(&format!("  file = {{{}}},\n", paper.file_name));
    }
    for name in paper.field_names() {
        if name == CITEKEY_FIELD {
            continue;
        }
        content.push_str(&format!("  {} = {{{}}},\n", name, paper.fields[name].value));
    }
    content.push_str("}\n");
    content
}

/// Render the whole library, fields included, in id order.
pub fn export_library(db: &Database) -> Result<String, BibtexError> {
    let repo = PaperRepo::new(db);
    let mut entries = Vec::new();

    for mut paper in repo.list()? {
        repo.load_fields(&mut paper)?;
        entries.push(export_paper(&paper));
    }

    info!("Exported {} papers to BibTeX", entries.len());
    Ok(entries.join("\n"))
}

/// Use the standard spelling for known entry types, otherwise capitalise.
fn normalize_type(raw: &str) -> String {
    if let Some(standard) = STANDARD_TYPES.iter().find(|t| t.eq_ignore_ascii_case(raw)) {
        return standard.to_string();
    }
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn extract_year(date: &PermissiveType<biblatex::Date>) -> Option<i32> {
    match date {
        PermissiveType::Typed(d) => {
            use biblatex::DateValue;
            match &d.value {
                DateValue::At(dt) => Some(dt.year),
                DateValue::After(dt) => Some(dt.year),
                DateValue::Before(dt) => Some(dt.year),
                DateValue::Between(start, _) => Some(start.year),
            }
        }
        PermissiveType::Chunks(_) => None,
    }
}
