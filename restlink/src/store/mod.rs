//! Persistence seam for storage-backed resources.
//!
//! A [`Store`] knows tables of JSON records keyed by a primary key.
//! [`TableResource`](crate::table::TableResource) drives it for the standard
//! CRUD actions; [`MemoryStore`] keeps everything in process and the
//! `database` feature adds a SQL backed store.

mod memory;

pub use memory::MemoryStore;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Error, IntoApiError};

/// A row, keyed by column name.
pub type Record = Map<String, Value>;

/// Table metadata a store reports for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    pub name: String,
    pub primary_key: Vec<String>,
    pub columns: Vec<String>,
}

impl TableInfo {
    /// Creates a table with a single `id` primary key column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: vec!["id".to_string()],
            columns: vec!["id".to_string()],
        }
    }

    /// Replaces the primary key. Key columns are added to the column list.
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let old = std::mem::take(&mut self.primary_key);
        self.columns.retain(|c| !old.contains(c));
        for column in columns {
            let column = column.into();
            self.primary_key.push(column.clone());
            if !self.columns.contains(&column) {
                self.columns.insert(self.primary_key.len() - 1, column);
            }
        }
        self
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.columns.contains(&name) {
            self.columns.push(name);
        }
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn is_composite(&self) -> bool {
        self.primary_key.len() > 1
    }
}

/// Errors a store can raise.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    UnknownTable(String),
    UnknownColumn { table: String, column: String },
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UnknownTable(table) => write!(f, "no such table '{}'", table),
            StoreError::UnknownColumn { table, column } => {
                write!(f, "table '{}' has no column '{}'", table, column)
            }
            StoreError::Backend(msg) => write!(f, "store backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl IntoApiError for StoreError {
    fn into_api_error(self) -> Error {
        match self {
            StoreError::UnknownColumn { .. } => Error::bad_request(self.to_string()),
            _ => {
                tracing::error!(error = %self, "store error");
                Error::internal("storage operation failed")
            }
        }
    }
}

/// A table-oriented record store.
///
/// Ids are the JSON value of the single primary key column. Filters are
/// equality matches on every listed column, compared the way SQL compares a
/// bound value to a column: `"3"` matches a stored `3`.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn describe(&self, table: &str) -> Result<TableInfo, StoreError>;

    async fn fetch(&self, table: &str, id: &Value) -> Result<Option<Record>, StoreError>;

    /// Inserts a record and returns it as stored, generated key included.
    async fn insert(&self, table: &str, record: Record) -> Result<Record, StoreError>;

    /// Applies `changes` to a record. Returns `None` when it does not exist.
    async fn update(
        &self,
        table: &str,
        id: &Value,
        changes: Record,
    ) -> Result<Option<Record>, StoreError>;

    /// Returns whether a record was deleted.
    async fn delete(&self, table: &str, id: &Value) -> Result<bool, StoreError>;

    /// Primary key values of every matching record, in key order.
    async fn select_ids(
        &self,
        table: &str,
        filter: &[(String, Value)],
    ) -> Result<Vec<Value>, StoreError>;
}
