use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An extra bibliographic attribute ("volume", "pages", ...) attached to a paper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub id: i64,
    pub paper_id: i64,
    pub name: String,
    pub value: String,
    #[serde(skip)]
    pub indb: bool,
    #[serde(skip, default = "default_changed")]
    pub changed: bool,
}

impl Field {
    pub fn new(paper_id: i64, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: 0,
            paper_id,
            name: name.into(),
            value: value.into(),
            indb: false,
            changed: true,
        }
    }
}

/// Directed citation edge: `paper_id` cites `ref_paper_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    pub id: i64,
    pub paper_id: i64,
    pub ref_paper_id: i64,
    #[serde(skip)]
    pub indb: bool,
    #[serde(skip, default = "default_changed")]
    pub changed: bool,
}

impl Reference {
    pub fn new(paper_id: i64, ref_paper_id: i64) -> Self {
        Self {
            id: 0,
            paper_id,
            ref_paper_id,
            indb: false,
            changed: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    pub id: i64,
    pub file_name: String,
    pub contents: Option<Vec<u8>>,
    pub page_count: Option<i32>,
    #[serde(default)]
    pub read: bool,
    pub r#type: String,
    pub author: String,
    pub title: String,
    pub year: Option<i32>,

    /// Extra fields keyed by name. Filled by `PaperRepo::load_fields`.
    #[serde(default)]
    pub fields: HashMap<String, Field>,
    /// Papers cited by this one. Order carries no meaning.
    #[serde(default)]
    pub refs: Vec<Reference>,

    #[serde(skip)]
    pub indb: bool,
    #[serde(skip, default = "default_changed")]
    pub changed: bool,
}

impl Default for Paper {
    fn default() -> Self {
        Self {
            id: 0,
            file_name: String::new(),
            contents: None,
            page_count: None,
            read: false,
            r#type: String::new(),
            author: String::new(),
            title: String::new(),
            year: None,
            fields: HashMap::new(),
            refs: Vec::new(),
            indb: false,
            changed: true,
        }
    }
}

impl Paper {
    pub fn new(r#type: &str, title: &str, author: &str, year: Option<i32>) -> Self {
        Self {
            r#type: r#type.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            year,
            ..Self::default()
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|f| f.value.as_str())
    }

    /// Set a field's value, reusing the existing row if the name is already known.
    ///
    /// The field is marked changed only when its value actually differs. The
    /// paper's own `changed` bit is left alone.
    pub fn set_field(&mut self, name: &str, value: &str) {
        match self.fields.get_mut(name) {
            Some(field) => {
                if field.value != value {
                    field.value = value.to_string();
                    field.changed = true;
                }
            }
            None => {
                self.fields
                    .insert(name.to_string(), Field::new(self.id, name, value));
            }
        }
    }

    /// Add a citation to another paper unless the edge is already held.
    pub fn add_reference(&mut self, ref_paper_id: i64) {
        if !self.refs.iter().any(|r| r.ref_paper_id == ref_paper_id) {
            self.refs.push(Reference::new(self.id, ref_paper_id));
        }
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn default_changed() -> bool {
    true
}
