// Data models for the agenda

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::value::{Row, Value};
use serde::Serialize;

pub const SESSIONS_TABLE: &str = "sessions";
pub const SPEAKERS_TABLE: &str = "speakers";

/// Session columns a lookup may match on
pub const LOOKUP_COLUMNS: [&str; 6] = [
    "date",
    "time_start",
    "time_end",
    "session_title",
    "location",
    "description",
];

/// A session or sub-session of the agenda
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: i64,
    /// Root session this one belongs to; `None` for a root session
    pub main_session_id: Option<i64>,
    pub date: String,
    pub time_start: String,
    pub time_end: String,
    pub session_title: String,
    pub location: String,
    pub description: String,
}

impl Session {
    pub fn schema() -> Schema {
        Schema::new([
            ("id", "integer PRIMARY KEY"),
            ("main_session_id", "integer"),
            ("date", "text"),
            ("time_start", "text"),
            ("time_end", "text"),
            ("session_title", "text"),
            ("location", "text"),
            ("description", "text"),
        ])
    }

    pub fn is_root(&self) -> bool {
        self.main_session_id.is_none()
    }

    /// Decode a row selected with the full session schema
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: int_column(row, "id")?,
            main_session_id: match row.get("main_session_id") {
                None | Some(Value::Null) => None,
                Some(v) => Some(v.as_int().ok_or_else(|| invalid(row, "main_session_id"))?),
            },
            date: text_column(row, "date"),
            time_start: text_column(row, "time_start"),
            time_end: text_column(row, "time_end"),
            session_title: text_column(row, "session_title"),
            location: text_column(row, "location"),
            description: text_column(row, "description"),
        })
    }
}

/// A speaker attached to one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Speaker {
    pub id: i64,
    pub session_id: i64,
    pub speaker_name: String,
}

impl Speaker {
    pub fn schema() -> Schema {
        Schema::new([
            ("id", "integer PRIMARY KEY"),
            ("session_id", "integer"),
            ("speaker_name", "text"),
        ])
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: int_column(row, "id")?,
            session_id: int_column(row, "session_id")?,
            speaker_name: text_column(row, "speaker_name"),
        })
    }
}

fn int_column(row: &Row, column: &str) -> Result<i64> {
    row.get(column).and_then(Value::as_int).ok_or_else(|| invalid(row, column))
}

// Free-text columns may hold NULL or a number; render them as text
fn text_column(row: &Row, column: &str) -> String {
    row.get(column).map(|v| v.to_string()).unwrap_or_default()
}

fn invalid(row: &Row, column: &str) -> Error {
    Error::InvalidRow(format!("column '{}' is not an integer in {:?}", column, row))
}
