// Agenda - conference agenda storage and lookup on SQLite

pub mod agenda;
pub mod config;
pub mod error;
pub mod filter;
pub mod import;
pub mod models;
pub mod resolver;
pub mod schema;
pub mod spreadsheet;
pub mod table;
pub mod value;

// Re-export main types for convenience
pub use agenda::Agenda;
pub use config::Config;
pub use error::{Error, Result};
pub use filter::{Filter, FilterOp};
pub use import::{AgendaRow, ImportSummary, SessionKind};
pub use models::{Session, Speaker};
pub use resolver::{HierarchyResolver, Lookup};
pub use schema::Schema;
pub use table::{Table, TableRef};
pub use value::{Row, Value};

// Re-export rusqlite for CLI use
pub use rusqlite;
