use serde::{Deserialize, Serialize};

/// Margin notes for one page of a paper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: i64,
    pub paper_id: i64,
    pub page: i32,
    #[serde(default)]
    pub left_note: String,
    #[serde(default)]
    pub right_note: String,
    #[serde(skip)]
    pub indb: bool,
    #[serde(skip, default = "default_changed")]
    pub changed: bool,
}

impl Note {
    pub fn new(paper_id: i64, page: i32) -> Self {
        Self {
            id: 0,
            paper_id,
            page,
            left_note: String::new(),
            right_note: String::new(),
            indb: false,
            changed: true,
        }
    }
}

fn default_changed() -> bool {
    true
}
