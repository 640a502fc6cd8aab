//! Field repository for a paper's free-form name/value attributes

use rusqlite::params;
use tracing::debug;

use crate::models::paper::Field;
use super::{Database, DatabaseError};

/// Repository for Field operations
pub struct FieldRepo<'a> {
    db: &'a Database,
}

impl<'a> FieldRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All field rows of a paper, in insertion order.
    pub fn list_for_paper(&self, paper_id: i64) -> Result<Vec<Field>, DatabaseError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT ID, PaperID, Name, Value FROM Field WHERE PaperID = ? ORDER BY ID"
        )?;

        let rows = stmt.query_map([paper_id], |row| {
            Ok(Field {
                id: row.get(0)?,
                paper_id: row.get(1)?,
                name: row.get(2)?,
                value: row.get(3)?,
                indb: true,
                changed: false,
            })
        })?;

        let mut fields = Vec::new();
        for row in rows {
            fields.push(row?);
        }
        Ok(fields)
    }

    /// Insert or update a field; a clean field is left alone.
    pub fn save(&self, field: &mut Field) -> Result<(), DatabaseError> {
        if !field.changed {
            return Ok(());
        }

        if field.indb {
            let updated = self.db.conn().execute(
                "UPDATE Field SET PaperID = ?, Name = ?, Value = ? WHERE ID = ?",
                params![field.paper_id, field.name, field.value, field.id],
            )?;
            if updated == 0 {
                return Err(DatabaseError::NotFound { entity: "Field", id: field.id });
            }
        } else {
            self.db.conn().execute(
                "INSERT INTO Field (PaperID, Name, Value) VALUES (?, ?, ?)",
                params![field.paper_id, field.name, field.value],
            )?;
            field.id = self.db.conn().last_insert_rowid();
            field.indb = true;
        }
        debug!("Saved field {} ({}) of paper {}", field.id, field.name, field.paper_id);

        field.changed = false;
        self.db.mark_changed();
        Ok(())
    }

    pub fn delete(&self, field: &mut Field) -> Result<(), DatabaseError> {
        let deleted = self.db.conn().execute("DELETE FROM Field WHERE ID = ?", [field.id])?;
        if deleted == 0 {
            return Err(DatabaseError::NotFound { entity: "Field", id: field.id });
        }
        debug!("Deleted field {}", field.id);

        field.indb = false;
        field.changed = true;
        self.db.mark_changed();
        Ok(())
    }
}
