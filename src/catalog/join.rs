use serde::Deserialize;
use serde::Serialize;

use crate::catalog::name::TableName;
use crate::catalog::table::Table;
use crate::error::{Error, Result};
use crate::value_err;

/// One child column referencing one parent column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinColumn {
    pub parent: String,
    pub child: String,
}

/// A directed parent to child edge of a group tree. The child rows are
/// clustered under the parent row whose key the join columns reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Join name, unique within a schema
    pub name: String,
    pub parent: TableName,
    pub child: TableName,
    pub columns: Vec<JoinColumn>,
}

impl Join {
    pub fn new(name: impl Into<String>, parent: TableName, child: TableName) -> Join {
        Join { name: name.into(), parent, child, columns: vec![] }
    }

    pub fn add_column(&mut self, parent: impl Into<String>, child: impl Into<String>) {
        self.columns.push(JoinColumn { parent: parent.into(), child: child.into() })
    }

    /// Checks every join column against the joined tables: both sides
    /// must exist and the child type must be compatible with the parent's.
    pub fn validate(&self, parent: &Table, child: &Table) -> Result<()> {
        if self.columns.is_empty() {
            return Err(value_err!("Join {} has no join columns", self.name));
        }
        for column in &self.columns {
            let p = parent.column(&column.parent).ok_or_else(|| Error::NoSuchColumn {
                table: parent.name.clone(),
                column: column.parent.clone(),
            })?;
            let c = child.column(&column.child).ok_or_else(|| Error::NoSuchColumn {
                table: child.name.clone(),
                column: column.child.clone(),
            })?;
            if !c.datatype.is_join_compatible(&p.datatype) {
                return Err(Error::IncompatibleJoinColumnTypes {
                    join: self.name.clone(),
                    parent: parent.name.clone(),
                    parent_column: p.name.clone(),
                    parent_type: p.datatype,
                    child: child.name.clone(),
                    child_column: c.name.clone(),
                    child_type: c.datatype,
                });
            }
        }
        Ok(())
    }

    /// The parent column the given child column references.
    pub fn parent_column_of(&self, child: &str) -> Option<&str> {
        self.columns.iter().find(|it| it.child == child).map(|it| it.parent.as_str())
    }
}
