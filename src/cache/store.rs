use std::collections::BTreeMap;

pub use rusqlite::types::Value as SqlValue;

use super::{EntityKind, StoreError, codec};

/// A cached row, keyed by column name.
pub type Row = BTreeMap<String, SqlValue>;

/// Persistence Gateway. All entity access goes through this trait; tables are
/// addressed by [`EntityKind`] and rows by their primary key.
pub trait Store {
    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Row>, StoreError>;

    /// `None` when the row does not exist.
    fn get_column(
        &self,
        kind: EntityKind,
        id: &str,
        column: &str,
    ) -> Result<Option<SqlValue>, StoreError>;

    /// Insert-or-ignore. Returns `true` if a new row was written.
    fn insert(&self, kind: EntityKind, row: &Row) -> Result<bool, StoreError>;

    /// Returns `false` when no row with `id` exists.
    fn update_column(
        &self,
        kind: EntityKind,
        id: &str,
        column: &str,
        value: SqlValue,
    ) -> Result<bool, StoreError>;

    fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, StoreError>;

    /// `(primary key, value)` of `column` for every non-dummy row.
    fn project(&self, kind: EntityKind, column: &str)
    -> Result<Vec<(String, SqlValue)>, StoreError>;

    fn contains(&self, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
        Ok(self.get_column(kind, id, kind.primary_key())?.is_some())
    }

    /// Hydration flag of a cached row of a queued kind, `None` when the row
    /// does not exist.
    fn hydrated(&self, kind: EntityKind, id: &str) -> Result<Option<bool>, StoreError> {
        Ok(self
            .get_column(kind, id, "hydrated")?
            .map(|value| matches!(value, SqlValue::Integer(i) if i != 0)))
    }
}

/// Typed, name-based access to the columns of a [`Row`].
pub struct RowReader<'a> {
    kind: EntityKind,
    row: &'a Row,
}

impl<'a> RowReader<'a> {
    pub fn new(kind: EntityKind, row: &'a Row) -> Self {
        Self { kind, row }
    }

    fn value(&self, column: &str) -> Result<&'a SqlValue, StoreError> {
        self.row
            .get(column)
            .ok_or_else(|| StoreError::MissingColumn {
                table: self.kind.table(),
                column: column.to_string(),
            })
    }

    fn invalid(&self, column: &str, reason: impl Into<String>) -> StoreError {
        StoreError::InvalidValue {
            table: self.kind.table(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub fn text(&self, column: &str) -> Result<String, StoreError> {
        self.opt_text(column)?
            .ok_or_else(|| self.invalid(column, "unexpected NULL"))
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>, StoreError> {
        match self.value(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s.clone())),
            SqlValue::Integer(i) => Ok(Some(i.to_string())),
            SqlValue::Real(r) => Ok(Some(r.to_string())),
            SqlValue::Blob(_) => Err(self.invalid(column, "expected text, found blob")),
        }
    }

    pub fn int(&self, column: &str) -> Result<i64, StoreError> {
        self.opt_int(column)?
            .ok_or_else(|| self.invalid(column, "unexpected NULL"))
    }

    /// Older databases stored updated counters as text, so numeric strings
    /// are accepted too.
    pub fn opt_int(&self, column: &str) -> Result<Option<i64>, StoreError> {
        match self.value(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(i) => Ok(Some(*i)),
            SqlValue::Real(r) => Ok(Some(*r as i64)),
            SqlValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|e| self.invalid(column, e.to_string())),
            SqlValue::Blob(_) => Err(self.invalid(column, "expected integer, found blob")),
        }
    }

    pub fn real(&self, column: &str) -> Result<f64, StoreError> {
        match self.value(column)? {
            SqlValue::Integer(i) => Ok(*i as f64),
            SqlValue::Real(r) => Ok(*r),
            SqlValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| self.invalid(column, e.to_string())),
            SqlValue::Null => Err(self.invalid(column, "unexpected NULL")),
            SqlValue::Blob(_) => Err(self.invalid(column, "expected real, found blob")),
        }
    }

    pub fn flag(&self, column: &str) -> Result<bool, StoreError> {
        Ok(self.opt_int(column)?.unwrap_or(0) != 0)
    }

    /// NULL decodes as the empty list.
    pub fn list(&self, column: &str) -> Result<Vec<String>, StoreError> {
        match self.opt_text(column)? {
            None => Ok(Vec::new()),
            Some(text) => {
                codec::decode_list(&text).map_err(|e| self.invalid(column, e.to_string()))
            }
        }
    }
}

/// Decodes a list column fetched through [`Store::get_column`].
pub fn list_value(kind: EntityKind, column: &str, value: &SqlValue) -> Result<Vec<String>, StoreError> {
    match value {
        SqlValue::Null => Ok(Vec::new()),
        SqlValue::Text(text) => codec::decode_list(text).map_err(|e| StoreError::InvalidValue {
            table: kind.table(),
            column: column.to_string(),
            reason: e.to_string(),
        }),
        _ => Err(StoreError::InvalidValue {
            table: kind.table(),
            column: column.to_string(),
            reason: "expected an encoded list".to_string(),
        }),
    }
}

pub fn text(value: impl Into<String>) -> SqlValue {
    SqlValue::Text(value.into())
}

pub fn int(value: i64) -> SqlValue {
    SqlValue::Integer(value)
}

pub fn list<T: AsRef<str>>(items: &[T]) -> SqlValue {
    SqlValue::Text(codec::encode_list(items))
}

pub fn opt_text(value: Option<impl Into<String>>) -> SqlValue {
    value.map_or(SqlValue::Null, |v| SqlValue::Text(v.into()))
}
