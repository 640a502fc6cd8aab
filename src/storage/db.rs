//! Database connection management and schema lifecycle

use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection};
use chrono::{DateTime, Utc};
use std::cell::Cell;
use std::collections::TryReserveError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::meta::MetaInfo;

/// Schema version written to MetaInfo by this build.
///
/// 1.0 files keyed Reference on `(PaperID, RefPaperID)` and had no cascading
/// foreign keys; 2.0 adds `Reference.ID` and `ON DELETE CASCADE`.
pub const SCHEMA_VERSION: f64 = 2.0;

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Engine(#[from] rusqlite::Error),
    #[error("Allocation failed: {0}")]
    Allocation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("Schema version {found} does not match expected version {expected}")]
    SchemaVersion { found: f64, expected: f64 },
}

impl From<TryReserveError> for DatabaseError {
    fn from(err: TryReserveError) -> Self {
        DatabaseError::Allocation(err.to_string())
    }
}

/// One open library file plus its dirty flag.
///
/// The flag is set whenever a write succeeds and decides whether `close`
/// stamps `MetaInfo.LastUpdate`. A handle has a single owner; it is not `Sync`.
pub struct Database {
    conn: Connection,
    path: PathBuf,
    changed: Cell<bool>,
}

impl Database {
    /// Open or create the library at `path`.
    ///
    /// A file without a schema gets the full table set and its MetaInfo row.
    /// A schema whose version differs from [`SCHEMA_VERSION`] goes through
    /// the upgrade step and fails the open if it is still behind afterwards.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        info!("Opening library at {:?}", path);

        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        register_casefold(&conn)?;

        let db = Database {
            conn,
            path: path.to_path_buf(),
            changed: Cell::new(false),
        };

        if !has_schema(&db.conn)? {
            info!("No schema found, creating version {}", SCHEMA_VERSION);
            create_schema(&db.conn)?;
            db.mark_changed();
        }

        // Exact comparison: the version is only ever written from the constant.
        let version = stored_version(&db.conn)?;
        if version != SCHEMA_VERSION {
            warn!("Library schema version {} differs from {}", version, SCHEMA_VERSION);
            schema_upgrade(&db.conn, version)?;

            let version = stored_version(&db.conn)?;
            if version != SCHEMA_VERSION {
                return Err(DatabaseError::SchemaVersion {
                    found: version,
                    expected: SCHEMA_VERSION,
                });
            }
        }

        Ok(db)
    }

    /// Close the library, stamping `LastUpdate` first if anything was written.
    ///
    /// The connection is released even when the stamp fails; that failure is
    /// the one reported.
    pub fn close(self) -> Result<(), DatabaseError> {
        let Database { conn, path, changed } = self;

        let flushed = if changed.get() {
            conn.execute(
                "UPDATE MetaInfo SET LastUpdate = ?",
                params![Utc::now().timestamp()],
            )
            .map(|_| ())
        } else {
            Ok(())
        };
        if let Err(e) = &flushed {
            warn!("Failed to update MetaInfo for {:?}: {}", path, e);
        }

        let released = conn.close().map_err(|(_, e)| e);
        if let Err(e) = &released {
            warn!("Failed to close {:?}: {}", path, e);
        }

        flushed?;
        released?;
        info!("Closed library at {:?}", path);
        Ok(())
    }

    /// Read the MetaInfo row.
    pub fn meta_info(&self) -> Result<MetaInfo, DatabaseError> {
        let meta = self.conn.query_row(
            "SELECT Version, Created, LastUpdate FROM MetaInfo",
            [],
            |row| {
                let created: i64 = row.get(1)?;
                let last_update: Option<i64> = row.get(2)?;
                Ok(MetaInfo {
                    version: row.get(0)?,
                    created: DateTime::from_timestamp(created, 0).unwrap_or_default(),
                    last_update: last_update.and_then(|t| DateTime::from_timestamp(t, 0)),
                })
            },
        )?;
        Ok(meta)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Whether a write has succeeded since the handle was opened.
    pub fn is_changed(&self) -> bool {
        self.changed.get()
    }

    pub(crate) fn mark_changed(&self) {
        self.changed.set(true);
    }
}

/// `casefold(text)`: Unicode lowercase, matching `str::to_lowercase`.
///
/// SQLite's own `LOWER()` only folds ASCII.
fn register_casefold(conn: &Connection) -> Result<(), DatabaseError> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )?;
    Ok(())
}

/// Any table besides MetaInfo counts as a schema being present.
fn has_schema(conn: &Connection) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type = 'table' AND name <> 'MetaInfo' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Create all tables and the MetaInfo row in one transaction.
fn create_schema(conn: &Connection) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(include_str!("schema.sql"))?;
    tx.execute(
        "INSERT INTO MetaInfo (Version, Created) VALUES (?, ?)",
        params![SCHEMA_VERSION, Utc::now().timestamp()],
    )?;
    tx.commit()?;
    Ok(())
}

fn stored_version(conn: &Connection) -> Result<f64, DatabaseError> {
    let version = conn.query_row("SELECT Version FROM MetaInfo", [], |row| row.get(0))?;
    Ok(version)
}

/// Bring an older schema up to [`SCHEMA_VERSION`].
///
/// No migrations are implemented, so a 1.0 file stays at 1.0 and the open
/// fails. New versions add their steps here keyed on `from`.
fn schema_upgrade(_conn: &Connection, from: f64) -> Result<(), DatabaseError> {
    debug!("No migration path from schema version {}", from);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn library_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("library.sqlite")
    }

    fn meta_rows(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM MetaInfo", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_open_new_database() {
        let dir = tempdir().unwrap();
        let path = library_path(&dir);
        let db = Database::open(&path).unwrap();

        assert!(path.exists());
        assert!(db.is_changed());
        assert_eq!(meta_rows(db.conn()), 1);

        let meta = db.meta_info().unwrap();
        assert_eq!(meta.version, SCHEMA_VERSION);
        assert!(meta.last_update.is_none());

        db.close().unwrap();
    }

    #[test]
    fn test_creates_all_tables() {
        let dir = tempdir().unwrap();
        let db = Database::open(&library_path(&dir)).unwrap();

        for table in ["MetaInfo", "Paper", "Field", "Reference", "Note"] {
            let count: i64 = db.conn()
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = library_path(&dir);
        let created = {
            let db = Database::open(&path).unwrap();
            let created = db.meta_info().unwrap().created;
            db.close().unwrap();
            created
        };

        let db = Database::open(&path).unwrap();
        assert!(!db.is_changed());
        assert_eq!(meta_rows(db.conn()), 1);
        assert_eq!(db.meta_info().unwrap().created, created);
        db.close().unwrap();
    }

    #[test]
    fn test_close_stamps_last_update_only_when_changed() {
        let dir = tempdir().unwrap();
        let path = library_path(&dir);

        // Creation dirties the handle.
        Database::open(&path).unwrap().close().unwrap();

        let db = Database::open(&path).unwrap();
        let stamped = db.meta_info().unwrap().last_update;
        assert!(stamped.is_some());

        // Overwrite the stamp so a second write would be visible.
        db.conn()
            .execute("UPDATE MetaInfo SET LastUpdate = 1", [])
            .unwrap();
        assert!(!db.is_changed());
        db.close().unwrap();

        let db = Database::open(&path).unwrap();
        let meta = db.meta_info().unwrap();
        assert_eq!(meta.last_update, DateTime::from_timestamp(1, 0));
        db.close().unwrap();
    }

    #[test]
    fn test_version_mismatch_fails_open() {
        let dir = tempdir().unwrap();
        let path = library_path(&dir);
        Database::open(&path).unwrap().close().unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute("UPDATE MetaInfo SET Version = 3.0", []).unwrap();
        drop(conn);

        match Database::open(&path) {
            Err(DatabaseError::SchemaVersion { found, expected }) => {
                assert_eq!(found, 3.0);
                assert_eq!(expected, SCHEMA_VERSION);
            }
            other => panic!("expected version error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_meta_row_is_engine_error() {
        let dir = tempdir().unwrap();
        let path = library_path(&dir);
        Database::open(&path).unwrap().close().unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute("DELETE FROM MetaInfo", []).unwrap();
        drop(conn);

        let result = Database::open(&path);
        assert!(matches!(
            result,
            Err(DatabaseError::Engine(rusqlite::Error::QueryReturnedNoRows))
        ));
    }

    #[test]
    fn test_unrelated_table_counts_as_schema() {
        let dir = tempdir().unwrap();
        let path = library_path(&dir);

        let conn = Connection::open(&path).unwrap();
        conn.execute("CREATE TABLE Other (x INTEGER)", []).unwrap();
        drop(conn);

        // Schema is assumed present, so the MetaInfo lookup fails.
        assert!(matches!(Database::open(&path), Err(DatabaseError::Engine(_))));
    }

    #[test]
    fn test_dirty_close_stamps_exactly_once() {
        let dir = tempdir().unwrap();
        let path = library_path(&dir);

        let db = Database::open(&path).unwrap();
        assert!(db.is_changed());
        db.conn()
            .execute_batch(
                "CREATE TABLE StampLog (At INTEGER);
                 CREATE TRIGGER stamp_log AFTER UPDATE OF LastUpdate ON MetaInfo
                 BEGIN INSERT INTO StampLog VALUES (NEW.LastUpdate); END;
                 UPDATE MetaInfo SET LastUpdate = 1;
                 DELETE FROM StampLog;",
            )
            .unwrap();
        db.close().unwrap();

        let conn = Connection::open(&path).unwrap();
        let writes: i64 = conn
            .query_row("SELECT COUNT(*) FROM StampLog", [], |row| row.get(0))
            .unwrap();
        let stamp: Option<i64> = conn
            .query_row("SELECT LastUpdate FROM MetaInfo", [], |row| row.get(0))
            .unwrap();
        assert_eq!(writes, 1);
        assert!(matches!(stamp, Some(t) if t > 1));
    }

    #[test]
    fn test_version_one_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = library_path(&dir);

        // Layout written by version 1.0 libraries.
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"CREATE TABLE "MetaInfo" ("Version" REAL NOT NULL, "Created" INTEGER NOT NULL, "LastUpdate" INTEGER);
               CREATE TABLE "Paper" ("ID" INTEGER PRIMARY KEY AUTOINCREMENT, "FileName" TEXT NOT NULL,
                   "Contents" BLOB, "PageCount" INTEGER, "Read" INTEGER NOT NULL, "Type" TEXT NOT NULL,
                   "Author" TEXT NOT NULL, "Title" TEXT NOT NULL, "Year" INTEGER);
               CREATE TABLE "Field" ("ID" INTEGER PRIMARY KEY AUTOINCREMENT, "PaperID" INTEGER NOT NULL,
                   "Name" TEXT NOT NULL, "Value" TEXT NOT NULL,
                   FOREIGN KEY ("PaperID") REFERENCES "Paper"("ID"));
               CREATE TABLE "Reference" ("PaperID" INTEGER NOT NULL, "RefPaperID" INTEGER NOT NULL,
                   FOREIGN KEY ("PaperID") REFERENCES "Paper"("ID"),
                   FOREIGN KEY ("RefPaperID") REFERENCES "Paper"("ID"),
                   PRIMARY KEY ("PaperID", "RefPaperID"));
               CREATE TABLE "Note" ("ID" INTEGER PRIMARY KEY AUTOINCREMENT, "PaperID" INTEGER NOT NULL,
                   "Page" INTEGER NOT NULL, "LeftNote" TEXT NOT NULL, "RightNote" TEXT NOT NULL,
                   FOREIGN KEY ("PaperID") REFERENCES "Paper"("ID"));
               INSERT INTO MetaInfo (Version, Created) VALUES (1.0, 1370000000);"#,
        )
        .unwrap();
        drop(conn);

        match Database::open(&path) {
            Err(DatabaseError::SchemaVersion { found, expected }) => {
                assert_eq!(found, 1.0);
                assert_eq!(expected, SCHEMA_VERSION);
            }
            other => panic!("expected version error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_casefold_is_unicode_aware() {
        let dir = tempdir().unwrap();
        let db = Database::open(&library_path(&dir)).unwrap();

        let folded: String = db.conn()
            .query_row("SELECT casefold('Über ÉRDŐS')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "über érdős");
    }
}
