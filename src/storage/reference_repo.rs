//! Reference repository for citation edges between papers

use rusqlite::params;
use tracing::debug;

use crate::models::paper::Reference;
use super::{Database, DatabaseError};

/// Repository for Reference operations
pub struct ReferenceRepo<'a> {
    db: &'a Database,
}

impl<'a> ReferenceRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Edges leaving a paper (the papers it cites)
    pub fn list_for_paper(&self, paper_id: i64) -> Result<Vec<Reference>, DatabaseError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT ID, PaperID, RefPaperID FROM \"Reference\" WHERE PaperID = ?"
        )?;

        let rows = stmt.query_map([paper_id], |row| {
            Ok(Reference {
                id: row.get(0)?,
                paper_id: row.get(1)?,
                ref_paper_id: row.get(2)?,
                indb: true,
                changed: false,
            })
        })?;

        let mut refs = Vec::new();
        for row in rows {
            refs.push(row?);
        }
        Ok(refs)
    }

    /// Ids of the papers that cite `paper_id`
    pub fn cited_by(&self, paper_id: i64) -> Result<Vec<i64>, DatabaseError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT PaperID FROM \"Reference\" WHERE RefPaperID = ? ORDER BY PaperID"
        )?;

        let rows = stmt.query_map([paper_id], |row| row.get::<_, i64>(0))?;

        let mut citing = Vec::new();
        for row in rows {
            citing.push(row?);
        }
        Ok(citing)
    }

    /// Insert or update a citation edge; a clean edge is left alone.
    pub fn save(&self, reference: &mut Reference) -> Result<(), DatabaseError> {
        if !reference.changed {
            return Ok(());
        }

        if reference.indb {
            let updated = self.db.conn().execute(
                "UPDATE \"Reference\" SET PaperID = ?, RefPaperID = ? WHERE ID = ?",
                params![reference.paper_id, reference.ref_paper_id, reference.id],
            )?;
            if updated == 0 {
                return Err(DatabaseError::NotFound { entity: "Reference", id: reference.id });
            }
        } else {
            self.db.conn().execute(
                "INSERT INTO \"Reference\" (PaperID, RefPaperID) VALUES (?, ?)",
                params![reference.paper_id, reference.ref_paper_id],
            )?;
            reference.id = self.db.conn().last_insert_rowid();
            reference.indb = true;
        }
        debug!(
            "Saved reference {} ({} -> {})",
            reference.id, reference.paper_id, reference.ref_paper_id
        );

        reference.changed = false;
        self.db.mark_changed();
        Ok(())
    }

    pub fn delete(&self, reference: &mut Reference) -> Result<(), DatabaseError> {
        let deleted = self.db.conn().execute(
            "DELETE FROM \"Reference\" WHERE ID = ?",
            [reference.id],
        )?;
        if deleted == 0 {
            return Err(DatabaseError::NotFound { entity: "Reference", id: reference.id });
        }
        debug!("Deleted reference {}", reference.id);

        reference.indb = false;
        reference.changed = true;
        self.db.mark_changed();
        Ok(())
    }
}
