// Ordered column schema for a table

/// Ordered mapping of column name to its SQL type and constraints
///
/// The order is kept: it drives both `CREATE TABLE` and the default column
/// list of unrestricted selects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<(String, String)>,
}

impl Schema {
    pub fn new<N, D>(columns: impl IntoIterator<Item = (N, D)>) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(|(n, d)| (n.into(), d.into())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Column names in schema order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.names().any(|n| n == column)
    }

    /// `id integer PRIMARY KEY, name text`
    pub(crate) fn to_sql(&self) -> String {
        self.columns
            .iter()
            .map(|(name, decl)| format!("{} {}", name, decl))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
