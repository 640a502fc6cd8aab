//! Editing model for a single paper
//!
//! Mirrors the paper form: a type selector, title, author and year entries,
//! and a list of name/value rows that grows one row at a time. The form owns
//! plain text; `apply` is the only place values flow back into a [`Paper`],
//! and it is what sets the paper's `changed` bit.

use thiserror::Error;

use crate::models::paper::{Field, Paper};

/// Entry types offered by the type selector. Any other text is accepted too.
pub const STANDARD_TYPES: &[&str] = &[
    "Article",
    "Book",
    "Booklet",
    "Conference",
    "InBook",
    "InCollection",
    "InProceedings",
    "Manual",
    "MastersThesis",
    "Misc",
    "PhdThesis",
    "Proceedings",
    "TechReport",
    "Unpublished",
];

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("Year must be a whole number, got {0:?}")]
    InvalidYear(String),
}

/// What [`PaperForm::apply`] did to the paper.
#[derive(Debug, Default, PartialEq)]
pub struct ApplyOutcome {
    pub changed: bool,
    /// Fields whose rows were cleared, taken out of `paper.fields`. Those
    /// still `indb` need a `FieldRepo::delete`.
    pub removed: Vec<Field>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRow {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaperForm {
    pub kind: String,
    pub title: String,
    pub author: String,
    pub year: String,
    pub rows: Vec<FieldRow>,
}

impl Default for PaperForm {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperForm {
    /// An empty form with a single blank field row.
    pub fn new() -> Self {
        Self {
            kind: String::new(),
            title: String::new(),
            author: String::new(),
            year: String::new(),
            rows: vec![FieldRow::default()],
        }
    }

    /// Fill the form from a paper. Field rows come in name order, followed by
    /// one blank row.
    pub fn from_paper(paper: &Paper) -> Self {
        let mut rows: Vec<FieldRow> = paper
            .field_names()
            .into_iter()
            .map(|name| FieldRow {
                name: name.to_string(),
                value: paper.fields[name].value.clone(),
            })
            .collect();
        rows.push(FieldRow::default());

        Self {
            kind: paper.r#type.clone(),
            title: paper.title.clone(),
            author: paper.author.clone(),
            year: paper.year.map(|y| y.to_string()).unwrap_or_default(),
            rows,
        }
    }

    /// Append a blank name/value row and hand it back for editing.
    pub fn add_field_row(&mut self) -> &mut FieldRow {
        self.rows.push(FieldRow::default());
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    /// Write the form back into `paper`.
    ///
    /// Fixed columns that differ set `paper.changed`; rows with a name
    /// create or update fields, which track their own `changed` bit. A field
    /// no named row mentions any more is removed from the paper and handed
    /// back in [`ApplyOutcome::removed`]. An unparsable year leaves the paper
    /// untouched.
    pub fn apply(&self, paper: &mut Paper) -> Result<ApplyOutcome, FormError> {
        let year = parse_year(&self.year)?;

        let fixed_changed = paper.r#type != self.kind
            || paper.title != self.title
            || paper.author != self.author
            || paper.year != year;
        if fixed_changed {
            paper.r#type = self.kind.clone();
            paper.title = self.title.clone();
            paper.author = self.author.clone();
            paper.year = year;
            paper.changed = true;
        }

        let named: Vec<&FieldRow> = self
            .rows
            .iter()
            .filter(|row| !row.name.trim().is_empty())
            .collect();

        let mut stale: Vec<String> = paper
            .fields
            .keys()
            .filter(|name| !named.iter().any(|row| row.name.trim() == name.as_str()))
            .cloned()
            .collect();
        stale.sort();
        let removed: Vec<Field> = stale
            .iter()
            .filter_map(|name| paper.fields.remove(name))
            .collect();

        let mut fields_changed = false;
        for row in named {
            let name = row.name.trim();
            if paper.field(name) != Some(row.value.as_str()) {
                paper.set_field(name, &row.value);
                fields_changed = true;
            }
        }

        Ok(ApplyOutcome {
            changed: fixed_changed || fields_changed || !removed.is_empty(),
            removed,
        })
    }
}

fn parse_year(text: &str) -> Result<Option<i32>, FormError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<i32>()
        .map(Some)
        .map_err(|_| FormError::InvalidYear(text.to_string()))
}
