// Session hierarchy resolution
//
// A lookup first finds the ids of directly matching sessions, then expands each
// one into itself plus every session that names it as `main_session_id`. Each
// session is emitted at most once, in depth-first discovery order.

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::models::{LOOKUP_COLUMNS, Session};
use crate::table::Table;
use crate::value::{Row, Value};
use std::collections::HashSet;
use tracing::{debug, info};

/// What a lookup matches on; both forms compare case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A session column equals the value
    Column { column: String, value: String },
    /// A speaker with this name is attached to the session
    Speaker(String),
}

impl Lookup {
    /// Build a lookup from `<column|speaker> <value>`
    ///
    /// Unknown columns are rejected before any query runs, with the valid
    /// names in the error.
    pub fn parse(target: &str, value: &str) -> Result<Self> {
        let target = target.trim().to_lowercase();
        if target == "speaker" {
            return Ok(Lookup::Speaker(value.to_string()));
        }
        if LOOKUP_COLUMNS.contains(&target.as_str()) {
            return Ok(Lookup::Column {
                column: target,
                value: value.to_string(),
            });
        }

        let mut valid: Vec<String> = LOOKUP_COLUMNS.iter().map(|c| c.to_string()).collect();
        valid.push("speaker".to_string());
        Err(Error::InvalidLookupColumn { column: target, valid })
    }
}

/// Expands matched sessions into their full families
pub struct HierarchyResolver<'a> {
    sessions: &'a Table,
    speakers: &'a Table,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(sessions: &'a Table, speakers: &'a Table) -> Self {
        Self { sessions, speakers }
    }

    /// Every session to show for `lookup`, sub-sessions included, without duplicates
    pub fn resolve(&self, lookup: &Lookup) -> Result<Vec<Session>> {
        let matched = self.matching_ids(lookup)?;
        debug!(?lookup, matched = matched.len(), "resolve: initial matches");

        let sessions = self.expand(&matched)?;
        info!(?lookup, found = sessions.len(), "Lookup complete");
        Ok(sessions)
    }

    /// Ids of sessions matching the lookup directly, in storage order
    fn matching_ids(&self, lookup: &Lookup) -> Result<Vec<i64>> {
        match lookup {
            Lookup::Column { column, value } => {
                let rows = self
                    .sessions
                    .select(&["id"], &[Filter::eq_ignore_case(column.as_str(), value.as_str())])?;
                ids_from(&rows, "id")
            }
            Lookup::Speaker(name) => {
                let id_column = format!("{}.id", self.sessions.name());
                let name_column = format!("{}.speaker_name", self.speakers.name());
                let rows = self.sessions.select_join(
                    self.speakers.name(),
                    "id",
                    "session_id",
                    &[id_column.as_str()],
                    &[Filter::eq_ignore_case(name_column, name.as_str())],
                )?;
                ids_from(&rows, &id_column)
            }
        }
    }

    /// Expand `ids` and their descendants into full session records
    ///
    /// Uses an explicit stack so deeper nesting than the one level imported
    /// agendas produce cannot exhaust the call stack.
    pub fn expand(&self, ids: &[i64]) -> Result<Vec<Session>> {
        let mut visited: HashSet<i64> = HashSet::new();
        let mut results = Vec::new();

        for &root in ids {
            let mut stack = vec![root];

            while let Some(id) = stack.pop() {
                if !visited.insert(id) {
                    continue;
                }

                let Some(row) = self.sessions.select(&[], &[Filter::eq("id", id)])?.into_iter().next() else {
                    debug!(id, "expand: session not found, skipping");
                    continue;
                };
                results.push(Session::from_row(&row)?);

                // Reverse so children pop in storage order
                let children = self.children_of(id)?;
                stack.extend(children.into_iter().rev());
            }
        }

        Ok(results)
    }

    fn children_of(&self, id: i64) -> Result<Vec<i64>> {
        let rows = self.sessions.select(&["id"], &[Filter::eq("main_session_id", id)])?;
        ids_from(&rows, "id")
    }
}

fn ids_from(rows: &[Row], column: &str) -> Result<Vec<i64>> {
    rows.iter()
        .map(|row| {
            row.get(column)
                .and_then(Value::as_int)
                .ok_or_else(|| Error::InvalidRow(format!("session id missing in {:?}", row)))
        })
        .collect()
}
