// Equality filters for table queries

use crate::value::Value;

/// Filter on a single column; a query's filters are combined with AND
#[derive(Debug, Clone)]
pub struct Filter {
    /// Column name, optionally qualified as `relation.column`
    pub column: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn eq_ignore_case(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::EqIgnoreCase,
            value: value.into(),
        }
    }

    /// Render as a SQL predicate with a positional placeholder for the value
    pub(crate) fn to_sql(&self) -> String {
        match self.op {
            FilterOp::Eq => format!("{} = ?", self.column),
            FilterOp::EqIgnoreCase => format!("lower({}) = lower(?)", self.column),
        }
    }
}

/// Comparison operators for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,           // =
    EqIgnoreCase, // lower(a) = lower(b)
}

/// Join filters into a `WHERE` clause, or an empty string when there are none
pub(crate) fn where_clause(filters: &[Filter]) -> String {
    if filters.is_empty() {
        return String::new();
    }
    let predicates: Vec<String> = filters.iter().map(Filter::to_sql).collect();
    format!(" WHERE {}", predicates.join(" AND "))
}
