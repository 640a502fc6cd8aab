//! Paper repository for database operations on papers

use rusqlite::{params, Row};
use tracing::debug;

use crate::models::paper::Paper;
use super::{Database, DatabaseError, FieldRepo, ReferenceRepo};

/// Repository for Paper operations
pub struct PaperRepo<'a> {
    db: &'a Database,
}

impl<'a> PaperRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Load a paper by id. Fields and references are left empty.
    pub fn load(&self, id: i64) -> Result<Paper, DatabaseError> {
        let result = self.db.conn().query_row(
            "SELECT * FROM Paper WHERE ID = ?",
            [id],
            row_to_paper,
        );

        match result {
            Ok(paper) => Ok(paper),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(DatabaseError::NotFound { entity: "Paper", id })
            }
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// List every paper in id order, without fields or references.
    pub fn list(&self) -> Result<Vec<Paper>, DatabaseError> {
        let mut stmt = self.db.conn().prepare("SELECT * FROM Paper ORDER BY ID")?;
        let rows = stmt.query_map([], row_to_paper)?;

        let mut papers = Vec::new();
        for row in rows {
            papers.push(row?);
        }
        Ok(papers)
    }

    /// Insert or update a paper depending on whether it is already stored.
    ///
    /// Does nothing unless the paper is marked changed. On failure the
    /// paper keeps its previous id and flags.
    pub fn save(&self, paper: &mut Paper) -> Result<(), DatabaseError> {
        if !paper.changed {
            return Ok(());
        }

        if paper.indb {
            let updated = self.db.conn().execute(
                "UPDATE Paper SET
                    FileName = ?, Contents = ?, PageCount = ?, Read = ?,
                    Type = ?, Author = ?, Title = ?, Year = ?
                 WHERE ID = ?",
                params![
                    paper.file_name,
                    paper.contents,
                    paper.page_count,
                    paper.read,
                    paper.r#type,
                    paper.author,
                    paper.title,
                    paper.year,
                    paper.id,
                ],
            )?;
            if updated == 0 {
                return Err(DatabaseError::NotFound { entity: "Paper", id: paper.id });
            }
            debug!("Updated paper {}", paper.id);
        } else {
            self.db.conn().execute(
                "INSERT INTO Paper (FileName, Contents, PageCount, Read, Type, Author, Title, Year)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    paper.file_name,
                    paper.contents,
                    paper.page_count,
                    paper.read,
                    paper.r#type,
                    paper.author,
                    paper.title,
                    paper.year,
                ],
            )?;
            paper.id = self.db.conn().last_insert_rowid();
            paper.indb = true;
            debug!("Inserted paper {}", paper.id);
        }

        paper.changed = false;
        self.db.mark_changed();
        Ok(())
    }

    /// Save a paper, then every field and reference it holds.
    ///
    /// Children pick up the paper's id first, so an aggregate built before
    /// the paper had an id can be stored in one call.
    pub fn save_with_children(&self, paper: &mut Paper) -> Result<(), DatabaseError> {
        self.save(paper)?;

        let fields = FieldRepo::new(self.db);
        for field in paper.fields.values_mut() {
            if field.paper_id != paper.id {
                field.paper_id = paper.id;
                field.changed = true;
            }
            fields.save(field)?;
        }

        let refs = ReferenceRepo::new(self.db);
        for reference in paper.refs.iter_mut() {
            if reference.paper_id != paper.id {
                reference.paper_id = paper.id;
                reference.changed = true;
            }
            refs.save(reference)?;
        }

        Ok(())
    }

    /// Delete a paper. Its fields, notes and references go with it.
    pub fn delete(&self, paper: &mut Paper) -> Result<(), DatabaseError> {
        let deleted = self.db.conn().execute("DELETE FROM Paper WHERE ID = ?", [paper.id])?;
        if deleted == 0 {
            return Err(DatabaseError::NotFound { entity: "Paper", id: paper.id });
        }
        debug!("Deleted paper {}", paper.id);

        paper.indb = false;
        paper.changed = true;
        for field in paper.fields.values_mut() {
            field.indb = false;
            field.changed = true;
        }
        for reference in paper.refs.iter_mut() {
            reference.indb = false;
            reference.changed = true;
        }

        self.db.mark_changed();
        Ok(())
    }

    /// Load the paper's fields into its keyed container.
    ///
    /// A name stored more than once resolves to the last row read.
    pub fn load_fields(&self, paper: &mut Paper) -> Result<(), DatabaseError> {
        let rows = FieldRepo::new(self.db).list_for_paper(paper.id)?;

        paper.fields.try_reserve(rows.len())?;
        for field in rows {
            paper.fields.insert(field.name.clone(), field);
        }
        Ok(())
    }

    /// Load the papers this one cites. Order is not significant.
    pub fn load_refs(&self, paper: &mut Paper) -> Result<(), DatabaseError> {
        let rows = ReferenceRepo::new(self.db).list_for_paper(paper.id)?;

        paper.refs.try_reserve(rows.len())?;
        for reference in rows {
            if !paper.refs.iter().any(|r| r.indb && r.id == reference.id) {
                paper.refs.push(reference);
            }
        }
        Ok(())
    }

    /// Load a paper together with its fields and references.
    pub fn load_full(&self, id: i64) -> Result<Paper, DatabaseError> {
        let mut paper = self.load(id)?;
        self.load_fields(&mut paper)?;
        self.load_refs(&mut paper)?;
        Ok(paper)
    }

    pub fn exists(&self, id: i64) -> Result<bool, DatabaseError> {
        let count: i64 = self.db.conn().query_row(
            "SELECT COUNT(*) FROM Paper WHERE ID = ?",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = self.db.conn().query_row("SELECT COUNT(*) FROM Paper", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Map a `SELECT * FROM Paper` row. Loaded papers are in the database and clean.
pub(crate) fn row_to_paper(row: &Row) -> rusqlite::Result<Paper> {
    Ok(Paper {
        id: row.get("ID")?,
        file_name: row.get("FileName")?,
        contents: row.get("Contents")?,
        page_count: row.get("PageCount")?,
        read: row.get("Read")?,
        r#type: row.get("Type")?,
        author: row.get("Author")?,
        title: row.get("Title")?,
        year: row.get("Year")?,
        fields: Default::default(),
        refs: Vec::new(),
        indb: true,
        changed: false,
    })
}
