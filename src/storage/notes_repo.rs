//! Notes repository for per-page margin notes

use rusqlite::{params, Row};
use tracing::debug;

use crate::models::notes::Note;
use super::{Database, DatabaseError};

/// Repository for margin notes
pub struct NotesRepo<'a> {
    db: &'a Database,
}

impl<'a> NotesRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All notes of a paper, ordered by page
    pub fn list_for_paper(&self, paper_id: i64) -> Result<Vec<Note>, DatabaseError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT ID, PaperID, Page, LeftNote, RightNote
             FROM Note WHERE PaperID = ? ORDER BY Page, ID"
        )?;

        let rows = stmt.query_map([paper_id], row_to_note)?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?);
        }
        Ok(notes)
    }

    /// The note for one page, if any
    pub fn get_for_page(&self, paper_id: i64, page: i32) -> Result<Option<Note>, DatabaseError> {
        let result = self.db.conn().query_row(
            "SELECT ID, PaperID, Page, LeftNote, RightNote
             FROM Note WHERE PaperID = ? AND Page = ? ORDER BY ID DESC LIMIT 1",
            params![paper_id, page],
            row_to_note,
        );

        match result {
            Ok(note) => Ok(Some(note)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Insert or update a note; a clean note is left alone.
    pub fn save(&self, note: &mut Note) -> Result<(), DatabaseError> {
        if !note.changed {
            return Ok(());
        }

        if note.indb {
            let updated = self.db.conn().execute(
                "UPDATE Note SET PaperID = ?, Page = ?, LeftNote = ?, RightNote = ? WHERE ID = ?",
                params![note.paper_id, note.page, note.left_note, note.right_note, note.id],
            )?;
            if updated == 0 {
                return Err(DatabaseError::NotFound { entity: "Note", id: note.id });
            }
        } else {
            self.db.conn().execute(
                "INSERT INTO Note (PaperID, Page, LeftNote, RightNote) VALUES (?, ?, ?, ?)",
                params![note.paper_id, note.page, note.left_note, note.right_note],
            )?;
            note.id = self.db.conn().last_insert_rowid();
            note.indb = true;
        }
        debug!("Saved note {} (paper {}, page {})", note.id, note.paper_id, note.page);

        note.changed = false;
        self.db.mark_changed();
        Ok(())
    }

    pub fn delete(&self, note: &mut Note) -> Result<(), DatabaseError> {
        let deleted = self.db.conn().execute("DELETE FROM Note WHERE ID = ?", [note.id])?;
        if deleted == 0 {
            return Err(DatabaseError::NotFound { entity: "Note", id: note.id });
        }
        debug!("Deleted note {}", note.id);

        note.indb = false;
        note.changed = true;
        self.db.mark_changed();
        Ok(())
    }
}

fn row_to_note(row: &Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        paper_id: row.get(1)?,
        page: row.get(2)?,
        left_note: row.get(3)?,
        right_note: row.get(4)?,
        indb: true,
        changed: false,
    })
}
