use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{Record, Store, StoreError, TableInfo};

#[derive(Debug)]
struct MemoryTable {
    info: TableInfo,
    rows: BTreeMap<i64, Record>,
    next_id: i64,
}

impl MemoryTable {
    fn new(info: TableInfo) -> Self {
        Self {
            info,
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn key_column(&self) -> &str {
        self.info
            .primary_key
            .first()
            .map(String::as_str)
            .unwrap_or("id")
    }

    fn check_columns<'a>(
        &self,
        columns: impl IntoIterator<Item = &'a String>,
    ) -> Result<(), StoreError> {
        for column in columns {
            if !self.info.has_column(column) {
                return Err(StoreError::UnknownColumn {
                    table: self.info.name.clone(),
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }
}

/// In-process [`Store`] with integer auto-increment keys.
///
/// Tables must be created up front. Only the first primary key column is
/// used to address rows.
///
/// ```
/// use restlink::store::{MemoryStore, TableInfo};
///
/// let store = MemoryStore::new()
///     .with_table(TableInfo::new("canal").column("width").column("name"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, MemoryTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    pub fn with_table(self, info: TableInfo) -> Self {
        self.create_table(info);
        self
    }

    /// Creates a table, replacing any existing table of the same name.
    pub fn create_table(&self, info: TableInfo) {
        self.tables.insert(info.name.clone(), MemoryTable::new(info));
    }

    /// Removes every row and restarts key generation.
    pub fn reset(&self) {
        for mut table in self.tables.iter_mut() {
            table.rows.clear();
            table.next_id = 1;
        }
    }

    fn unknown(table: &str) -> StoreError {
        StoreError::UnknownTable(table.to_string())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn describe(&self, table: &str) -> Result<TableInfo, StoreError> {
        self.tables
            .get(table)
            .map(|t| t.info.clone())
            .ok_or_else(|| Self::unknown(table))
    }

    async fn fetch(&self, table: &str, id: &Value) -> Result<Option<Record>, StoreError> {
        let t = self.tables.get(table).ok_or_else(|| Self::unknown(table))?;
        Ok(id.as_i64().and_then(|key| t.rows.get(&key).cloned()))
    }

    async fn insert(&self, table: &str, mut record: Record) -> Result<Record, StoreError> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Self::unknown(table))?;
        t.check_columns(record.keys())?;

        let key_column = t.key_column().to_string();
        let key = match record.get(&key_column) {
            None | Some(Value::Null) => t.next_id,
            Some(value) => value.as_i64().ok_or_else(|| {
                StoreError::Backend(format!("primary key '{}' must be an integer", key_column))
            })?,
        };
        if t.rows.contains_key(&key) {
            return Err(StoreError::Backend(format!(
                "duplicate key {} in '{}'",
                key, table
            )));
        }

        record.insert(key_column, Value::from(key));
        for column in t.info.columns.clone() {
            record.entry(column).or_insert(Value::Null);
        }

        t.next_id = t.next_id.max(key + 1);
        t.rows.insert(key, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        table: &str,
        id: &Value,
        changes: Record,
    ) -> Result<Option<Record>, StoreError> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Self::unknown(table))?;
        t.check_columns(changes.keys())?;

        let key_column = t.key_column().to_string();
        if changes.contains_key(&key_column) {
            return Err(StoreError::Backend(format!(
                "primary key '{}' can not be changed",
                key_column
            )));
        }

        let Some(key) = id.as_i64() else {
            return Ok(None);
        };
        let Some(row) = t.rows.get_mut(&key) else {
            return Ok(None);
        };
        for (column, value) in changes {
            row.insert(column, value);
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, table: &str, id: &Value) -> Result<bool, StoreError> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Self::unknown(table))?;
        let Some(key) = id.as_i64() else {
            return Ok(false);
        };
        Ok(t.rows.remove(&key).is_some())
    }

    async fn select_ids(
        &self,
        table: &str,
        filter: &[(String, Value)],
    ) -> Result<Vec<Value>, StoreError> {
        let t = self.tables.get(table).ok_or_else(|| Self::unknown(table))?;
        t.check_columns(filter.iter().map(|(column, _)| column))?;

        Ok(t.rows
            .iter()
            .filter(|(_, row)| {
                filter
                    .iter()
                    .all(|(column, value)| row.get(column).is_some_and(|v| loosely_eq(v, value)))
            })
            .map(|(key, _)| Value::from(*key))
            .collect())
    }
}

/// Equality as a SQL column comparison sees it: numbers compare by value,
/// and a numeric string equals the number it spells.
fn loosely_eq(stored: &Value, wanted: &Value) -> bool {
    if stored == wanted {
        return true;
    }
    match (number(stored), number(wanted)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
