// Bulk import of parsed agenda rows

use crate::error::{Error, Result};
use crate::table::Table;
use crate::value::Value;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Whether a row is a session of its own or belongs to the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Root,
    Sub,
}

impl SessionKind {
    /// `sub` in any case marks a sub-session; anything else is a root
    pub fn from_flag(flag: &str) -> Self {
        if flag.trim().eq_ignore_ascii_case("sub") {
            SessionKind::Sub
        } else {
            SessionKind::Root
        }
    }
}

/// One data row of an agenda spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgendaRow {
    /// 1-based row number in the source, for error messages
    pub row: usize,
    pub date: String,
    pub time_start: String,
    pub time_end: String,
    /// Raw session/sub-session flag as written in the source
    pub kind_flag: String,
    pub session_title: String,
    pub location: String,
    pub description: String,
    pub speakers: Vec<String>,
}

impl AgendaRow {
    pub fn kind(&self) -> SessionKind {
        SessionKind::from_flag(&self.kind_flag)
    }

    // Everything except the row number
    fn content_key(&self) -> (&str, &str, &str, SessionKind, &str, &str, &str, &[String]) {
        (
            &self.date,
            &self.time_start,
            &self.time_end,
            self.kind(),
            &self.session_title,
            &self.location,
            &self.description,
            &self.speakers,
        )
    }
}

/// Split a `;`-separated speaker list, trimming names and dropping blanks
pub fn parse_speakers(list: &str) -> Vec<String> {
    list.split(';')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Counts of what an import wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub sessions: usize,
    pub sub_sessions: usize,
    pub speakers: usize,
}

/// Check every row before anything is written
///
/// Rejects missing required fields, rows identical to an earlier row, and
/// sub-sessions with no session before them.
pub fn validate_rows(rows: &[AgendaRow]) -> Result<()> {
    let mut seen = HashMap::new();
    let mut has_root = false;

    for row in rows {
        let required = [
            ("date", &row.date),
            ("time_start", &row.time_start),
            ("time_end", &row.time_end),
            ("session_type", &row.kind_flag),
            ("session_title", &row.session_title),
        ];
        for (column, value) in required {
            if value.trim().is_empty() {
                return Err(Error::MissingField {
                    row: row.row,
                    column: column.to_string(),
                });
            }
        }

        if let Some(&first) = seen.get(&row.content_key()) {
            return Err(Error::DuplicateRow { row: row.row, first });
        }
        seen.insert(row.content_key(), row.row);

        match row.kind() {
            SessionKind::Root => has_root = true,
            SessionKind::Sub if !has_root => return Err(Error::OrphanSubSession { row: row.row }),
            SessionKind::Sub => {}
        }
    }

    Ok(())
}

/// Replace the contents of both tables with `rows`
///
/// Both tables must live in the same database file. The reset and every insert
/// run in one transaction on the sessions connection, so a failed import leaves
/// the previous agenda untouched.
pub fn import_rows(sessions: &Table, speakers: &Table, rows: &[AgendaRow]) -> Result<ImportSummary> {
    validate_rows(rows)?;
    info!(rows = rows.len(), "Importing agenda");

    let result = sessions.transaction(|table| {
        let speakers = speakers.on(table);
        table.reset()?;
        speakers.reset()?;

        let mut summary = ImportSummary::default();
        let mut current_root: Option<i64> = None;

        for row in rows {
            let parent = match row.kind() {
                SessionKind::Root => None,
                SessionKind::Sub => current_root,
            };

            let id = table.insert(&[
                ("main_session_id", Value::from(parent)),
                ("date", Value::from(&row.date)),
                ("time_start", Value::from(&row.time_start)),
                ("time_end", Value::from(&row.time_end)),
                ("session_title", Value::from(&row.session_title)),
                ("location", Value::from(&row.location)),
                ("description", Value::from(&row.description)),
            ])?;
            debug!(row = row.row, id, ?parent, "Inserted session");

            match row.kind() {
                SessionKind::Root => {
                    current_root = Some(id);
                    summary.sessions += 1;
                }
                SessionKind::Sub => summary.sub_sessions += 1,
            }

            for name in &row.speakers {
                speakers.insert(&[("session_id", Value::Int(id)), ("speaker_name", Value::from(name))])?;
                summary.speakers += 1;
            }
        }

        Ok(summary)
    });

    match result {
        Ok(summary) => {
            info!(
                sessions = summary.sessions,
                sub_sessions = summary.sub_sessions,
                speakers = summary.speakers,
                "Import complete"
            );
            Ok(summary)
        }
        Err(e) => {
            warn!(error = %e, "Import failed, previous agenda kept");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::models::{SESSIONS_TABLE, SPEAKERS_TABLE, Session, Speaker};
    use crate::schema::Schema;
    use std::time::Duration;
    use tempfile::TempDir;

    fn agenda_row(row: usize, flag: &str, title: &str, speakers: &str) -> AgendaRow {
        AgendaRow {
            row,
            date: "06/16/2018".to_string(),
            time_start: "09:00 AM".to_string(),
            time_end: "10:00 AM".to_string(),
            kind_flag: flag.to_string(),
            session_title: title.to_string(),
            location: "Hall".to_string(),
            description: String::new(),
            speakers: parse_speakers(speakers),
        }
    }

    fn open_tables(temp: &TempDir) -> (Table, Table) {
        let path = temp.path().join("agenda.db");
        (
            Table::open(&path, SESSIONS_TABLE, Session::schema()).unwrap(),
            Table::open(&path, SPEAKERS_TABLE, Speaker::schema()).unwrap(),
        )
    }

    #[test]
    fn test_session_kind_from_flag() {
        assert_eq!(SessionKind::from_flag("Sub"), SessionKind::Sub);
        assert_eq!(SessionKind::from_flag(" SUB "), SessionKind::Sub);
        assert_eq!(SessionKind::from_flag("Session"), SessionKind::Root);
        assert_eq!(SessionKind::from_flag("subsession"), SessionKind::Root);
    }

    #[test]
    fn test_parse_speakers() {
        assert_eq!(parse_speakers("Ann; Bob"), vec!["Ann", "Bob"]);
        assert_eq!(parse_speakers(" Ann ;; ; "), vec!["Ann"]);
        assert!(parse_speakers("").is_empty());
    }

    #[test]
    fn test_validate_missing_field() {
        let mut row = agenda_row(16, "Session", "Keynote", "");
        row.time_end = "  ".to_string();

        match validate_rows(&[row]).unwrap_err() {
            Error::MissingField { row, column } => {
                assert_eq!(row, 16);
                assert_eq!(column, "time_end");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_duplicate_row() {
        let rows = vec![
            agenda_row(16, "Session", "Keynote", "Ann"),
            agenda_row(17, "Session", "Lunch", ""),
            agenda_row(18, "Session", "Keynote", "Ann"),
        ];
        assert!(matches!(
            validate_rows(&rows),
            Err(Error::DuplicateRow { row: 18, first: 16 })
        ));
    }

    #[test]
    fn test_validate_orphan_sub_session() {
        let rows = vec![agenda_row(16, "sub", "Breakout", "")];
        assert!(matches!(validate_rows(&rows), Err(Error::OrphanSubSession { row: 16 })));
    }

    #[test]
    fn test_import_root_and_sub_session() {
        let temp = TempDir::new().unwrap();
        let (sessions, speakers) = open_tables(&temp);

        let rows = vec![
            agenda_row(16, "Session", "Keynote", "Ann; Bob"),
            agenda_row(17, "sub", "Breakout", ""),
        ];
        let summary = import_rows(&sessions, &speakers, &rows).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                sessions: 1,
                sub_sessions: 1,
                speakers: 2
            }
        );

        let root = sessions.select(&[], &[Filter::eq("session_title", "Keynote")]).unwrap();
        let root = Session::from_row(&root[0]).unwrap();
        assert!(root.is_root());

        let sub = sessions.select(&[], &[Filter::eq("session_title", "Breakout")]).unwrap();
        let sub = Session::from_row(&sub[0]).unwrap();
        assert_eq!(sub.main_session_id, Some(root.id));

        let attached = speakers.select(&[], &[Filter::eq("session_id", root.id)]).unwrap();
        let mut names: Vec<String> = attached
            .iter()
            .map(|r| Speaker::from_row(r).unwrap().speaker_name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Ann", "Bob"]);
        assert!(speakers.select(&[], &[Filter::eq("session_id", sub.id)]).unwrap().is_empty());
    }

    #[test]
    fn test_speakers_attach_to_their_own_row() {
        let temp = TempDir::new().unwrap();
        let (sessions, speakers) = open_tables(&temp);

        let rows = vec![
            agenda_row(16, "Session", "Keynote", ""),
            agenda_row(17, "sub", "Breakout", "Cid"),
        ];
        import_rows(&sessions, &speakers, &rows).unwrap();

        let sub = sessions.select(&["id"], &[Filter::eq("session_title", "Breakout")]).unwrap();
        let rows = speakers.select(&["session_id"], &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["session_id"], sub[0]["id"]);
    }

    #[test]
    fn test_sub_sessions_follow_latest_root() {
        let temp = TempDir::new().unwrap();
        let (sessions, speakers) = open_tables(&temp);

        let rows = vec![
            agenda_row(16, "Session", "Morning", ""),
            agenda_row(17, "sub", "Morning A", ""),
            agenda_row(18, "Session", "Afternoon", ""),
            agenda_row(19, "sub", "Afternoon A", ""),
        ];
        import_rows(&sessions, &speakers, &rows).unwrap();

        let afternoon = sessions.select(&["id"], &[Filter::eq("session_title", "Afternoon")]).unwrap();
        let subs = sessions
            .select(&["session_title"], &[Filter::eq("main_session_id", afternoon[0]["id"].clone())])
            .unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0]["session_title"], Value::from("Afternoon A"));
    }

    #[test]
    fn test_reimport_replaces_previous_data() {
        let temp = TempDir::new().unwrap();
        let (sessions, speakers) = open_tables(&temp);

        import_rows(&sessions, &speakers, &[agenda_row(16, "Session", "Old", "Ann")]).unwrap();
        import_rows(&sessions, &speakers, &[agenda_row(16, "Session", "New", "Bob")]).unwrap();

        let titles = sessions.select(&["session_title"], &[]).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0]["session_title"], Value::from("New"));
        assert_eq!(speakers.select(&[], &[]).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_import_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let (sessions, speakers) = open_tables(&temp);
        import_rows(&sessions, &speakers, &[agenda_row(16, "Session", "Kept", "Ann")]).unwrap();

        let rows = vec![
            agenda_row(16, "Session", "Keynote", ""),
            agenda_row(17, "Session", "Keynote", ""),
        ];
        assert!(import_rows(&sessions, &speakers, &rows).is_err());

        // Validation failed before the tables were touched
        let titles = sessions.select(&["session_title"], &[]).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0]["session_title"], Value::from("Kept"));
    }

    #[test]
    fn test_failed_speaker_insert_keeps_previous_agenda() {
        let temp = TempDir::new().unwrap();
        let (sessions, speakers) = open_tables(&temp);
        import_rows(&sessions, &speakers, &[agenda_row(16, "Session", "Old", "Ann")]).unwrap();

        // Same table name, but the recreated table has no speaker_name column
        let broken = Table::open(
            temp.path().join("agenda.db"),
            SPEAKERS_TABLE,
            Schema::new([("id", "integer PRIMARY KEY"), ("session_id", "integer")]),
        )
        .unwrap();

        let rows = vec![agenda_row(16, "Session", "New", "Bob")];
        let err = import_rows(&sessions, &broken, &rows).unwrap_err();
        assert!(matches!(err, Error::Database(_)));

        let titles = sessions.select(&["session_title"], &[]).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0]["session_title"], Value::from("Old"));
        let names = speakers.select(&["speaker_name"], &[]).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0]["speaker_name"], Value::from("Ann"));
    }

    #[test]
    fn test_locked_database_keeps_previous_agenda() {
        let temp = TempDir::new().unwrap();
        let (sessions, speakers) = open_tables(&temp);
        import_rows(&sessions, &speakers, &[agenda_row(16, "Session", "Old", "Ann")]).unwrap();

        let other = rusqlite::Connection::open(temp.path().join("agenda.db")).unwrap();
        other.execute_batch("BEGIN IMMEDIATE").unwrap();
        sessions.db().busy_timeout(Duration::from_millis(50)).unwrap();

        let rows = vec![agenda_row(16, "Session", "New", "Bob")];
        assert!(import_rows(&sessions, &speakers, &rows).is_err());
        other.execute_batch("ROLLBACK").unwrap();

        let titles = sessions.select(&["session_title"], &[]).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0]["session_title"], Value::from("Old"));
        assert_eq!(speakers.select(&[], &[]).unwrap().len(), 1);
    }
}
