use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use super::{
    DUMMY_ID, EntityKind, Row, SqlValue, Store, StoreError,
    schema::{self, SCHEMA_VERSION, Table},
};

/// [`Store`] backed by a single SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 15000;
            ",
        )?;
        debug!(path = %path.display(), "opened cache database");
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates missing tables and their sentinel rows. Safe to call on an
    /// existing database.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        let tx = self.conn.unchecked_transaction()?;
        for table in schema::TABLES {
            tx.execute(&table.create_statement(), [])?;
            insert_row(&tx, table, &table.dummy_row())?;
        }
        if version < SCHEMA_VERSION {
            tx.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
            info!(from = version, to = SCHEMA_VERSION, "initialized cache schema");
        }
        tx.commit()?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Row count per table, the sentinel row excluded.
    pub fn counts(&self) -> Result<Vec<(EntityKind, usize)>, StoreError> {
        schema::TABLES
            .iter()
            .map(|table| {
                let sql = format!(
                    "SELECT COUNT(*) FROM {} WHERE {} != ?1",
                    table.name(),
                    table.kind.primary_key()
                );
                let count: i64 = self.conn.query_row(&sql, params![DUMMY_ID], |r| r.get(0))?;
                Ok::<_, StoreError>((table.kind, count as usize))
            })
            .collect()
    }
}

fn checked_column(table: &Table, column: &str) -> Result<&'static str, StoreError> {
    table
        .column(column)
        .map(|c| c.name)
        .ok_or_else(|| StoreError::UnknownColumn {
            table: table.name(),
            column: column.to_string(),
        })
}

fn insert_row(conn: &Connection, table: &Table, row: &Row) -> Result<bool, StoreError> {
    let columns = row
        .keys()
        .map(|c| checked_column(table, c))
        .collect::<Result<Vec<_>, _>>()?;
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
        table.name(),
        columns.join(", "),
        placeholders.join(", ")
    );
    let changed = conn.execute(&sql, params_from_iter(row.values()))?;
    Ok(changed > 0)
}

impl Store for SqliteStore {
    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Row>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            kind.table(),
            kind.primary_key()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
        let row = stmt
            .query_row(params![id], |r| {
                let mut row = Row::new();
                for (i, name) in names.iter().enumerate() {
                    row.insert(name.clone(), r.get::<_, SqlValue>(i)?);
                }
                Ok(row)
            })
            .optional()?;
        Ok(row)
    }

    fn get_column(
        &self,
        kind: EntityKind,
        id: &str,
        column: &str,
    ) -> Result<Option<SqlValue>, StoreError> {
        let table = schema::table(kind);
        let column = checked_column(table, column)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            column,
            table.name(),
            kind.primary_key()
        );
        Ok(self
            .conn
            .query_row(&sql, params![id], |r| r.get::<_, SqlValue>(0))
            .optional()?)
    }

    fn insert(&self, kind: EntityKind, row: &Row) -> Result<bool, StoreError> {
        insert_row(&self.conn, schema::table(kind), row)
    }

    fn update_column(
        &self,
        kind: EntityKind,
        id: &str,
        column: &str,
        value: SqlValue,
    ) -> Result<bool, StoreError> {
        let table = schema::table(kind);
        let column = checked_column(table, column)?;
        let sql = format!(
            "UPDATE {} SET {} = ?1 WHERE {} = ?2",
            table.name(),
            column,
            kind.primary_key()
        );
        let changed = self.conn.execute(&sql, params![value, id])?;
        Ok(changed > 0)
    }

    fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            kind.table(),
            kind.primary_key()
        );
        Ok(self.conn.execute(&sql, params![id])? > 0)
    }

    fn project(
        &self,
        kind: EntityKind,
        column: &str,
    ) -> Result<Vec<(String, SqlValue)>, StoreError> {
        let table = schema::table(kind);
        let column = checked_column(table, column)?;
        let pk = kind.primary_key();
        let sql = format!(
            "SELECT {}, {} FROM {} WHERE {} != ?1 ORDER BY rowid",
            pk,
            column,
            table.name(),
            pk
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![DUMMY_ID], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, SqlValue>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{int, text};

    fn row(id: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), text(id));
        row.insert("name".into(), text("Some Track"));
        row.insert("uri".into(), text(format!("spotify:track:{}", id)));
        row.insert("url".into(), text(""));
        row.insert("image".into(), text(""));
        row.insert("popularity".into(), int(20));
        row
    }

    #[test]
    fn initialize_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        for kind in EntityKind::ALL {
            assert!(store.contains(kind, DUMMY_ID).unwrap(), "{kind} lacks a dummy row");
        }
        assert!(store.counts().unwrap().iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn insert_or_ignore_keeps_first_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.insert(EntityKind::Track, &row("T1")).unwrap());

        let mut second = row("T1");
        second.insert("name".into(), text("Changed"));
        assert!(!store.insert(EntityKind::Track, &second).unwrap());

        let stored = store.get(EntityKind::Track, "T1").unwrap().unwrap();
        assert_eq!(stored.get("name"), Some(&text("Some Track")));
        assert_eq!(stored.get("popularity"), Some(&int(20)));
        assert_eq!(stored.get("artist_ids"), Some(&text("[]")));
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .update_column(EntityKind::Album, "A1", "nonsense", int(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { .. }));
    }

    #[test]
    fn projection_skips_dummy_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(EntityKind::Track, &row("T1")).unwrap();
        store.insert(EntityKind::Track, &row("T2")).unwrap();
        store
            .update_column(EntityKind::Track, "T2", "popularity", int(25))
            .unwrap();

        let projected = store.project(EntityKind::Track, "popularity").unwrap();
        assert_eq!(
            projected,
            vec![("T1".to_string(), int(20)), ("T2".to_string(), int(25))]
        );
    }

    #[test]
    fn popularity_has_no_schema_default() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut bare = row("T1");
        bare.remove("popularity");
        assert!(store.insert(EntityKind::Track, &bare).is_err());
        assert!(!store.contains(EntityKind::Track, "T1").unwrap());
    }

    #[test]
    fn hydrated_flag_of_cached_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(EntityKind::Track, &row("T1")).unwrap();

        assert_eq!(store.hydrated(EntityKind::Track, "T1").unwrap(), Some(false));
        store
            .update_column(EntityKind::Track, "T1", "hydrated", int(1))
            .unwrap();
        assert_eq!(store.hydrated(EntityKind::Track, "T1").unwrap(), Some(true));
        assert_eq!(store.hydrated(EntityKind::Track, "T9").unwrap(), None);
    }
}
