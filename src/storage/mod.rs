//! Storage module for SQLite database operations
//!
//! This module provides:
//! - The library handle and its schema lifecycle
//! - Repository pattern implementations for papers, fields, references and notes
//! - Keyword, title and author search

pub mod db;
pub mod paper_repo;
pub mod field_repo;
pub mod reference_repo;
pub mod notes_repo;
pub mod search;

pub use db::{Database, DatabaseError, SCHEMA_VERSION};
pub use paper_repo::PaperRepo;
pub use field_repo::FieldRepo;
pub use reference_repo::ReferenceRepo;
pub use notes_repo::NotesRepo;
pub use search::PaperSearch;
