//! Read-only paper search by keyword, title, or author
//!
//! All three forms are case-insensitive substring matches, folded with
//! `casefold()` so non-ASCII letters compare too. `%`, `_` and `\` in the
//! term match literally. An empty term matches every paper.

use super::paper_repo::row_to_paper;
use super::{Database, DatabaseError};
use crate::models::paper::Paper;

/// Search queries over the Paper table
pub struct PaperSearch<'a> {
    db: &'a Database,
}

impl<'a> PaperSearch<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Match title, author, type, file name, or any field value.
    pub fn by_keyword(&self, term: &str) -> Result<Vec<Paper>, DatabaseError> {
        self.query(
            "SELECT * FROM Paper p
             WHERE casefold(p.Title) LIKE ?1 ESCAPE '\\'
                OR casefold(p.Author) LIKE ?1 ESCAPE '\\'
                OR casefold(p.Type) LIKE ?1 ESCAPE '\\'
                OR casefold(p.FileName) LIKE ?1 ESCAPE '\\'
                OR EXISTS (
                    SELECT 1 FROM Field f
                    WHERE f.PaperID = p.ID AND casefold(f.Value) LIKE ?1 ESCAPE '\\'
                )
             ORDER BY p.ID",
            term,
        )
    }

    pub fn by_title(&self, term: &str) -> Result<Vec<Paper>, DatabaseError> {
        self.query(
            "SELECT * FROM Paper WHERE casefold(Title) LIKE ?1 ESCAPE '\\' ORDER BY ID",
            term,
        )
    }

    pub fn by_author(&self, term: &str) -> Result<Vec<Paper>, DatabaseError> {
        self.query(
            "SELECT * FROM Paper WHERE casefold(Author) LIKE ?1 ESCAPE '\\' ORDER BY ID",
            term,
        )
    }

    fn query(&self, sql: &str, term: &str) -> Result<Vec<Paper>, DatabaseError> {
        let pattern = like_pattern(term);

        let mut stmt = self.db.conn().prepare(sql)?;
        let rows = stmt.query_map([&pattern], row_to_paper)?;

        let mut papers = Vec::new();
        for row in rows {
            papers.push(row?);
        }
        Ok(papers)
    }
}

/// Wrap a term for a `LIKE ... ESCAPE '\'` substring match.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
