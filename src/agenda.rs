// Agenda store: the sessions and speakers tables of one database file

use crate::error::Result;
use crate::filter::Filter;
use crate::import::{AgendaRow, ImportSummary, import_rows};
use crate::models::{SESSIONS_TABLE, SPEAKERS_TABLE, Session, Speaker};
use crate::resolver::{HierarchyResolver, Lookup};
use crate::spreadsheet;
use crate::table::Table;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Both agenda tables, opened against the same database file
pub struct Agenda {
    path: PathBuf,
    sessions: Table,
    speakers: Table,
}

impl Agenda {
    /// Open or create the agenda database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "Opening agenda database");

        let sessions = Table::open(&path, SESSIONS_TABLE, Session::schema())?;
        let speakers = match Table::open(&path, SPEAKERS_TABLE, Speaker::schema()) {
            Ok(table) => table,
            Err(e) => {
                if let Err(close_err) = sessions.close() {
                    warn!(error = %close_err, "Failed to close sessions table");
                }
                return Err(e);
            }
        };

        Ok(Self {
            path,
            sessions,
            speakers,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sessions(&self) -> &Table {
        &self.sessions
    }

    pub fn speakers(&self) -> &Table {
        &self.speakers
    }

    /// Replace the whole agenda with `rows`
    pub fn import(&self, rows: &[AgendaRow]) -> Result<ImportSummary> {
        import_rows(&self.sessions, &self.speakers, rows)
    }

    /// Read a spreadsheet and replace the whole agenda with its rows
    pub fn import_file<P: AsRef<Path>>(&self, path: P) -> Result<ImportSummary> {
        let rows = spreadsheet::read_agenda(path)?;
        self.import(&rows)
    }

    /// Sessions matching `lookup`, each followed by its sub-sessions
    pub fn lookup(&self, lookup: &Lookup) -> Result<Vec<Session>> {
        HierarchyResolver::new(&self.sessions, &self.speakers).resolve(lookup)
    }

    /// Speakers attached directly to a session
    pub fn speakers_for(&self, session_id: i64) -> Result<Vec<Speaker>> {
        self.speakers
            .select(&[], &[Filter::eq("session_id", session_id)])?
            .iter()
            .map(Speaker::from_row)
            .collect()
    }

    /// Close both connections, reporting the first failure
    pub fn close(self) -> Result<()> {
        let sessions = self.sessions.close();
        let speakers = self.speakers.close();
        sessions.and(speakers)
    }
}
