use std::collections::HashSet;
use std::fmt::Display;
use std::fmt::Formatter;

use serde::{Deserialize, Serialize};

use crate::catalog::column::Column;
use crate::catalog::index::{Index, IndexColumn, IndexKind, PRIMARY_KEY_NAME};
use crate::catalog::name::TableName;
use crate::catalog::osc::PendingOsc;
use crate::catalog::TableId;
use crate::error::Error;
use crate::error::Result;
use crate::value_err;

/// Table holds metadata about table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Schema qualified table name
    pub name: TableName,
    /// Assigned when the table is merged into a schema
    pub id: Option<TableId>,
    /// User columns ordered by position, followed by the internal ones.
    columns: Vec<Column>,
    indexes: Vec<Index>,
    /// Name of the join to the parent table, if any
    pub parent_join: Option<String>,
    /// Names of the joins to the child tables, ordered by child ordinal
    pub child_joins: Vec<String>,
    /// Name of the group, set once grouping is complete
    pub group: Option<TableName>,
    /// Join hops from the group root, set once grouping is complete
    pub depth: Option<u32>,
    /// Sibling order among the children of one parent
    pub ordinal: Option<u32>,
    pub pending_osc: Option<PendingOsc>,
}

impl Table {
    pub fn new(name: TableName) -> Table {
        Table {
            name,
            id: None,
            columns: vec![],
            indexes: vec![],
            parent_join: None,
            child_joins: vec![],
            group: None,
            depth: None,
            ordinal: None,
            pending_osc: None,
        }
    }

    /// The user visible columns in position order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|it| !it.internal)
    }

    pub fn columns_including_internal(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|it| it.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|it| it.name == name)
    }

    /// Adds a user column at its declared position. Internal columns are
    /// kept after all user columns.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.column(&column.name).is_some() {
            return Err(Error::DuplicateName {
                kind: "column",
                name: format!("{}.{}", self.name, column.name),
            });
        }
        let user = self.columns.iter().take_while(|it| !it.internal).count();
        let at = self.columns[..user].partition_point(|it| it.position <= column.position);
        self.columns.insert(at, column);
        self.renumber_internal();
        Ok(())
    }

    fn renumber_internal(&mut self) {
        let user = self.columns().count();
        for (i, column) in self.columns.iter_mut().filter(|it| it.internal).enumerate() {
            column.position = user + i;
        }
    }

    /// The user visible indexes.
    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter().filter(|it| !it.internal)
    }

    pub fn indexes_including_internal(&self) -> &[Index] {
        &self.indexes
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|it| it.name == name)
    }

    pub fn index_mut(&mut self, name: &str) -> Option<&mut Index> {
        self.indexes.iter_mut().find(|it| it.name == name)
    }

    pub fn add_index(&mut self, index: Index) -> Result<()> {
        if self.index(&index.name).is_some() {
            return Err(Error::DuplicateName {
                kind: "index",
                name: format!("{}.{}", self.name, index.name),
            });
        }
        if index.is_primary() {
            // A declared primary key replaces the hidden one.
            self.drop_hidden_pk();
        }
        self.indexes.push(index);
        Ok(())
    }

    /// The declared primary key, never the hidden one.
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes().find(|it| it.is_primary())
    }

    pub fn primary_key_including_internal(&self) -> Option<&Index> {
        self.indexes.iter().find(|it| it.is_primary())
    }

    pub fn has_hidden_pk(&self) -> bool {
        self.columns.iter().any(|it| it.is_hidden_pk())
    }

    /// Materializes the hidden primary key, a column appended after the
    /// user columns plus an internal index over it. Does nothing when a
    /// primary key, declared or hidden, already exists.
    pub fn add_hidden_pk(&mut self) {
        if self.primary_key_including_internal().is_some() {
            return;
        }
        let column = Column::hidden_pk(self.columns.len());
        let mut index = Index::new(PRIMARY_KEY_NAME, IndexKind::Primary);
        index.internal = true;
        index.add_column(IndexColumn { column: column.name.clone(), position: 0, ascending: true });
        self.columns.push(column);
        self.indexes.push(index);
    }

    pub fn drop_hidden_pk(&mut self) {
        self.columns.retain(|it| !it.is_hidden_pk());
        self.indexes.retain(|it| !(it.internal && it.is_primary()));
        self.renumber_internal();
    }

    /// Names the storage tree of every index that has none yet.
    pub fn assign_tree_names(&mut self) {
        let table = self.name.to_string();
        for index in self.indexes.iter_mut().filter(|it| it.tree_name.is_none()) {
            index.tree_name = Some(format!("index:{}.{}", table, index.name));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.table.is_empty() {
            return Err(value_err!("Table name can't be empty"));
        }
        if self.columns().next().is_none() {
            return Err(value_err!("Table {} have no columns", self.name));
        }
        let mut names = HashSet::new();
        for (i, column) in self.columns.iter().enumerate() {
            column.validate()?;
            if column.position != i {
                return Err(value_err!(
                    "Column {}.{} declared at position {}, expect {}",
                    self.name,
                    column.name,
                    column.position,
                    i
                ));
            }
            if !names.insert(column.name.as_str()) {
                return Err(Error::DuplicateName {
                    kind: "column",
                    name: format!("{}.{}", self.name, column.name),
                });
            }
        }
        if self.indexes.iter().filter(|it| it.is_primary()).count() > 1 {
            return Err(value_err!("Multiple primary keys in table {}", self.name));
        }
        for index in &self.indexes {
            index.validate()?;
            for key in &index.columns {
                if self.column(&key.column).is_none() {
                    return Err(Error::NoSuchColumn {
                        table: self.name.clone(),
                        column: key.column.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sep = if f.alternate() { "\n" } else { "" };
        write!(f, "TABLE {}(", self.name)?;
        write!(f, "{}", sep)?;
        let columns = self.columns().collect::<Vec<_>>();
        for (i, col) in columns.iter().enumerate() {
            write!(f, "{}", col)?;
            if i < columns.len() - 1 {
                write!(f, ", {}", sep)?;
            }
        }
        write!(f, ")")?;
        Ok(())
    }
}
