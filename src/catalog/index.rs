use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::value_err;

/// Name of the index backing a primary key, declared or hidden.
pub const PRIMARY_KEY_NAME: &str = "PRIMARY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Name of the indexed table column
    pub column: String,
    /// Position within the index key
    pub position: usize,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Index name, unique within its table
    pub name: String,
    pub kind: IndexKind,
    /// The key columns, ordered by position.
    pub columns: Vec<IndexColumn>,
    /// Internal indexes, i.e. the hidden primary key, are not user visible.
    pub internal: bool,
    /// Storage tree, assigned when the index is merged into a schema.
    pub tree_name: Option<String>,
}

impl Index {
    pub fn new(name: impl Into<String>, kind: IndexKind) -> Index {
        Index { name: name.into(), kind, columns: vec![], internal: false, tree_name: None }
    }

    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::Primary
    }

    /// Adds a key column keeping the key ordered by position.
    pub fn add_column(&mut self, column: IndexColumn) {
        let at = self.columns.partition_point(|it| it.position <= column.position);
        self.columns.insert(at, column);
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(value_err!("Index name can't be empty"));
        }
        if self.columns.is_empty() {
            return Err(value_err!("Index {} have no key columns", self.name));
        }
        Ok(())
    }
}
