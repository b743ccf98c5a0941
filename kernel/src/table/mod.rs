// Table Store
//
// Two-level mapping of `table name -> (record key -> value)` that backs the
// query layer. Tables are created implicitly on first write and live for the
// lifetime of the process.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Snapshot of a single table, ordered by record key.
pub type Table = BTreeMap<String, Value>;

/// Keyed record storage shared between the table-store sink and readers.
///
/// Properties required from implementations:
/// - Upsert replaces the whole value (no partial merge)
/// - A never-written table reads as absent, not empty
/// - Mutations are visible to the next read on the same instance
///
/// Implementations MUST NOT:
/// - Hand out references aliasing stored values
/// - Drop a table except through `clear_table` (which empties it in place)
pub trait TableStore: Send + Sync {
    /// Insert or overwrite `key` in `table`, creating the table if needed.
    fn write(&self, table: &str, key: &str, value: Value);

    /// Read a single record.
    fn read(&self, table: &str, key: &str) -> Option<Value>;

    /// Read a snapshot of a whole table.
    ///
    /// Returns `None` only if the table was never written.
    fn read_all(&self, table: &str) -> Option<Table>;

    /// Remove a record. No-op if the table or key is absent.
    fn delete(&self, table: &str, key: &str);

    /// Empty a table in place. No-op if the table is absent.
    fn clear_table(&self, table: &str);

    /// Names of all tables that currently exist (including empty ones).
    fn table_names(&self) -> Vec<String>;
}

/// Process-local table store.
#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for InMemoryTableStore {
    fn write(&self, table: &str, key: &str, value: Value) {
        let mut tables = self.tables.write();
        tables
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn read(&self, table: &str, key: &str) -> Option<Value> {
        let tables = self.tables.read();
        tables.get(table).and_then(|t| t.get(key)).cloned()
    }

    fn read_all(&self, table: &str) -> Option<Table> {
        self.tables.read().get(table).cloned()
    }

    fn delete(&self, table: &str, key: &str) {
        if let Some(t) = self.tables.write().get_mut(table) {
            t.remove(key);
        }
    }

    fn clear_table(&self, table: &str) {
        if let Some(t) = self.tables.write().get_mut(table) {
            t.clear();
        }
    }

    fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}
