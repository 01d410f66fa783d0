// Schema-driven access to a single SQLite table

use crate::error::{Error, Result};
use crate::filter::{Filter, where_clause};
use crate::schema::Schema;
use crate::value::{Row, Value};
use rusqlite::{Connection, params_from_iter};
use std::path::Path;
use tracing::{debug, warn};

/// One named table in a file-backed SQLite database
///
/// Each instance owns its own connection. Identifiers (table and column names)
/// come from the program and are formatted into the SQL text; values are always
/// bound as parameters.
pub struct Table {
    name: String,
    schema: Schema,
    db: Connection,
}

impl Table {
    /// Open the database at `path` and create the table if it does not exist yet
    ///
    /// An existing table is left as is, even if its schema differs from `schema`.
    pub fn open<P: AsRef<Path>>(path: P, name: &str, schema: Schema) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::InvalidConfiguration("invalid table name".to_string()));
        }
        if schema.is_empty() {
            return Err(Error::InvalidConfiguration("invalid table schema".to_string()));
        }
        validate_identifier(name).map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        for column in schema.names() {
            validate_identifier(column).map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        }

        let db = Connection::open(path.as_ref())?;
        let table = Self {
            name: name.to_string(),
            schema,
            db,
        };
        table.bound().create_table()?;

        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get a reference to the SQLite database connection
    pub fn db(&self) -> &Connection {
        &self.db
    }

    /// This table's definition, bound to `owner`'s connection
    ///
    /// Statements run through the handle join any transaction `owner` has
    /// open. Both tables must live in the same database file.
    pub fn on<'a>(&'a self, owner: &'a Table) -> TableRef<'a> {
        TableRef {
            name: &self.name,
            schema: &self.schema,
            db: &owner.db,
        }
    }

    fn bound(&self) -> TableRef<'_> {
        self.on(self)
    }

    /// Drop the table and create it again, empty, from the schema
    pub fn reset(&self) -> Result<()> {
        self.bound().reset()
    }

    /// See [`TableRef::select`]
    pub fn select(&self, columns: &[&str], filters: &[Filter]) -> Result<Vec<Row>> {
        self.bound().select(columns, filters)
    }

    /// See [`TableRef::select_join`]
    pub fn select_join(
        &self,
        other: &str,
        left: &str,
        right: &str,
        columns: &[&str],
        filters: &[Filter],
    ) -> Result<Vec<Row>> {
        self.bound().select_join(other, left, right, columns, filters)
    }

    /// Insert one row and return its row id
    pub fn insert(&self, item: &[(&str, Value)]) -> Result<i64> {
        self.bound().insert(item)
    }

    /// Update every row matching the filters; returns the number of rows changed
    pub fn update(&self, values: &[(&str, Value)], filters: &[Filter]) -> Result<usize> {
        self.bound().update(values, filters)
    }

    /// Run `f` inside a single transaction, rolling back if it fails
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        self.db.execute_batch("BEGIN IMMEDIATE")?;

        let result = f(self).and_then(|value| {
            self.db.execute_batch("COMMIT")?;
            Ok(value)
        });

        if result.is_err() && !self.db.is_autocommit() {
            if let Err(e) = self.db.execute_batch("ROLLBACK") {
                warn!(table = %self.name, error = ?e, "Rollback failed");
            }
        }

        result
    }

    /// Close the underlying connection
    pub fn close(self) -> Result<()> {
        debug!(table = %self.name, "close");
        self.db.close().map_err(|(_, e)| Error::from(e))
    }
}

/// A table definition paired with the connection that runs its statements
#[derive(Clone, Copy)]
pub struct TableRef<'a> {
    name: &'a str,
    schema: &'a Schema,
    db: &'a Connection,
}

impl TableRef<'_> {
    pub fn name(&self) -> &str {
        self.name
    }

    fn create_table(&self) -> Result<()> {
        let sql = format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, self.schema.to_sql());
        debug!(table = %self.name, %sql, "create_table");
        self.db.execute_batch(&sql)?;
        Ok(())
    }

    /// Drop the table and create it again, empty, from the schema
    pub fn reset(&self) -> Result<()> {
        debug!(table = %self.name, "reset");
        self.db.execute_batch(&format!("DROP TABLE IF EXISTS {}", self.name))?;
        self.create_table()
    }

    /// Select rows matching every filter
    ///
    /// An empty `columns` selects every schema column, in schema order. An
    /// empty `filters` scans the whole table.
    pub fn select(&self, columns: &[&str], filters: &[Filter]) -> Result<Vec<Row>> {
        let columns = if columns.is_empty() {
            self.schema.names().map(String::from).collect()
        } else {
            owned_columns(columns)?
        };

        let sql = format!("SELECT {} FROM {}{}", columns.join(", "), self.name, where_clause(filters));
        self.query(&sql, &columns, filters)
    }

    /// Inner join with `other` on `self.left = other.right`
    ///
    /// Columns and filter keys may be qualified as `table.column`. An empty
    /// `columns` selects every column of this table, qualified with its name.
    pub fn select_join(
        &self,
        other: &str,
        left: &str,
        right: &str,
        columns: &[&str],
        filters: &[Filter],
    ) -> Result<Vec<Row>> {
        validate_identifier(other)?;
        validate_identifier(left)?;
        validate_identifier(right)?;

        let columns = if columns.is_empty() {
            self.schema.names().map(|c| format!("{}.{}", self.name, c)).collect()
        } else {
            owned_columns(columns)?
        };

        let sql = format!(
            "SELECT {} FROM {} JOIN {} ON {}.{} = {}.{}{}",
            columns.join(", "),
            self.name,
            other,
            self.name,
            left,
            other,
            right,
            where_clause(filters)
        );
        self.query(&sql, &columns, filters)
    }

    /// Insert one row and return its row id
    pub fn insert(&self, item: &[(&str, Value)]) -> Result<i64> {
        let sql = if item.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.name)
        } else {
            for (column, _) in item {
                validate_identifier(column)?;
            }
            let columns: Vec<&str> = item.iter().map(|(c, _)| *c).collect();
            let placeholders = vec!["?"; item.len()];
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.name,
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        debug!(table = %self.name, %sql, "insert");
        self.db.execute(&sql, params_from_iter(item.iter().map(|(_, v)| v)))?;
        Ok(self.db.last_insert_rowid())
    }

    /// Update every row matching the filters; returns the number of rows changed
    pub fn update(&self, values: &[(&str, Value)], filters: &[Filter]) -> Result<usize> {
        if values.is_empty() {
            return Ok(0);
        }
        for (column, _) in values {
            validate_identifier(column)?;
        }
        for filter in filters {
            validate_identifier(&filter.column)?;
        }

        let assignments: Vec<String> = values.iter().map(|(c, _)| format!("{} = ?", c)).collect();
        let sql = format!(
            "UPDATE {} SET {}{}",
            self.name,
            assignments.join(", "),
            where_clause(filters)
        );

        debug!(table = %self.name, %sql, "update");
        let params = values.iter().map(|(_, v)| v).chain(filters.iter().map(|f| &f.value));
        let changed = self.db.execute(&sql, params_from_iter(params))?;
        Ok(changed)
    }

    fn query(&self, sql: &str, columns: &[String], filters: &[Filter]) -> Result<Vec<Row>> {
        for filter in filters {
            validate_identifier(&filter.column)?;
        }

        debug!(table = %self.name, %sql, params = filters.len(), "query");
        let mut stmt = self.db.prepare(sql)?;

        let rows = stmt.query_map(params_from_iter(filters.iter().map(|f| &f.value)), |row| {
            let mut decoded = Row::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                decoded.insert(column.clone(), row.get::<_, Value>(i)?);
            }
            Ok(decoded)
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }
}

fn owned_columns(columns: &[&str]) -> Result<Vec<String>> {
    columns
        .iter()
        .map(|c| {
            validate_identifier(c)?;
            Ok(c.to_string())
        })
        .collect()
}

/// Accept `name` or `table.name`, each part alphanumeric with `_` and not
/// starting with a digit
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidIdentifier("identifier cannot be empty".to_string()));
    }
    if name.len() > 64 {
        return Err(Error::InvalidIdentifier(format!("{} (max 64 chars)", name)));
    }

    let parts: Vec<&str> = name.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|p| {
            p.chars().next().is_some_and(|c| !c.is_ascii_digit())
                && p.chars().all(|c| c.is_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(Error::InvalidIdentifier(name.to_string()));
    }

    Ok(())
}
