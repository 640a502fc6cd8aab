//! Personal reference-paper library.
//!
//! Papers, their extra fields, citation links and margin notes live in one
//! SQLite file opened through [`storage::Database`].

pub mod bibtex;
pub mod config;
pub mod form;
pub mod logging;
pub mod models;
pub mod storage;

pub use models::{Field, MetaInfo, Note, Paper, Reference};
pub use storage::{
    Database, DatabaseError, FieldRepo, NotesRepo, PaperRepo, PaperSearch, ReferenceRepo,
    SCHEMA_VERSION,
};
