use serde::Deserialize;
use serde::Serialize;

use crate::catalog::name::TableName;
use crate::catalog::GroupId;

/// The tables physically clustered under the key hierarchy of one root.
/// Membership is a flat registry, the tree shape lives in the joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: TableName,
    /// Assigned when the group is merged into a schema.
    pub id: Option<GroupId>,
    pub root: TableName,
    pub tables: Vec<TableName>,
    /// Storage tree, assigned when the group is merged into a schema.
    pub tree_name: Option<String>,
}

impl Group {
    pub fn new(name: TableName, root: TableName) -> Group {
        Group { tables: vec![root.clone()], name, id: None, root, tree_name: None }
    }

    pub fn contains(&self, table: &TableName) -> bool {
        self.tables.iter().any(|it| it == table)
    }

    pub fn add_table(&mut self, table: TableName) {
        if !self.contains(&table) {
            self.tables.push(table)
        }
    }

    pub fn default_tree_name(&self) -> String {
        format!("group:{}", self.name)
    }
}

/// Position at which a sibling with the given ordinal is inserted into a
/// list ordered by ascending ordinal: before the first sibling with a
/// strictly greater ordinal, or at the end.
pub fn sibling_position<T>(siblings: &[T], ordinal: u32, ordinal_of: impl Fn(&T) -> u32) -> usize {
    siblings.iter().position(|it| ordinal_of(it) > ordinal).unwrap_or(siblings.len())
}
