//! Local mirror of monitored tables.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::protocol::TableUpdates;

/// An in-memory mirror of remote table rows, keyed by table name and
/// row id, kept consistent by applying update batches in the order the
/// connection delivers them.
#[derive(Debug, Default)]
pub struct TableCache {
    tables: HashMap<String, HashMap<String, Map<String, Value>>>,
}

impl TableCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one update batch.
    ///
    /// For each row: a non-empty `new` value replaces the cached row,
    /// anything else removes it. Each row operation is an
    /// overwrite-or-delete, so applying the same batch twice is a
    /// no-op the second time.
    pub fn apply_update(&mut self, updates: TableUpdates) {
        for (table, rows) in updates {
            let cached = self.tables.entry(table).or_default();
            for (row_id, update) in rows {
                match update.new {
                    Some(new) if !new.is_empty() => {
                        cached.insert(row_id, new);
                    }
                    _ => {
                        cached.remove(&row_id);
                    }
                }
            }
        }
    }

    /// Look up a row by table and row id.
    #[must_use]
    pub fn row(&self, table: &str, row_id: &str) -> Option<&Map<String, Value>> {
        self.tables.get(table)?.get(row_id)
    }

    /// Find the first row in `table` whose `column` equals `value`.
    #[must_use]
    pub fn find(&self, table: &str, column: &str, value: &Value) -> Option<(&str, &Map<String, Value>)> {
        self.tables.get(table)?.iter().find_map(|(row_id, row)| {
            (row.get(column) == Some(value)).then_some((row_id.as_str(), row))
        })
    }

    /// Number of cached rows in `table`.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, HashMap::len)
    }
}
