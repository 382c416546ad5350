use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::catalog::catalog::Catalog;
use crate::catalog::group::Group;
use crate::catalog::join::Join;
use crate::catalog::name::TableName;
use crate::catalog::sequence::Sequence;
use crate::catalog::table::Table;
use crate::catalog::{GroupId, TableId};
use crate::error::Error;
use crate::error::Result;
use crate::internal_err;

/// A frozen schema generation: the tables, groups, joins and sequences of
/// every schema, reserved ones included.
///
/// There is no way to mutate a `Schema`. New generations are produced by a
/// [`SchemaMerge`] or by freezing a [`SchemaBuilder`]; members may be shared
/// with the generation they were derived from.
///
/// [`SchemaMerge`]: crate::catalog::merge::SchemaMerge
/// [`SchemaBuilder`]: crate::catalog::builder::SchemaBuilder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub(crate) tables: BTreeMap<TableName, Arc<Table>>,
    pub(crate) groups: BTreeMap<TableName, Arc<Group>>,
    pub(crate) joins: BTreeMap<String, Arc<Join>>,
    pub(crate) sequences: BTreeMap<TableName, Arc<Sequence>>,
}

impl Schema {
    pub fn empty() -> Schema {
        Schema::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &TableName) -> Option<&Table> {
        self.tables.get(name).map(|it| it.as_ref())
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values().map(|it| it.as_ref())
    }

    pub fn group(&self, name: &TableName) -> Option<&Group> {
        self.groups.get(name).map(|it| it.as_ref())
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values().map(|it| it.as_ref())
    }

    pub fn join(&self, name: &str) -> Option<&Join> {
        self.joins.get(name).map(|it| it.as_ref())
    }

    pub fn joins(&self) -> impl Iterator<Item = &Join> {
        self.joins.values().map(|it| it.as_ref())
    }

    pub fn sequence(&self, name: &TableName) -> Option<&Sequence> {
        self.sequences.get(name).map(|it| it.as_ref())
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values().map(|it| it.as_ref())
    }

    /// The parent table of the given table in its group.
    pub fn parent_table(&self, table: &TableName) -> Option<&Table> {
        self.parent_join(table).and_then(|join| self.table(&join.parent))
    }

    /// The joins to the children of the given table, in ordinal order.
    pub fn child_joins(&self, table: &TableName) -> Vec<&Join> {
        self.table(table)
            .map(|it| it.child_joins.iter().filter_map(|name| self.join(name)).collect())
            .unwrap_or_default()
    }

    /// The sequence generating values for the given column, if any.
    pub fn identity_generator(&self, table: &TableName, column: &str) -> Option<&Sequence> {
        let identity = self.table(table)?.column(column)?.identity.as_ref()?;
        self.sequence(&identity.sequence)
    }

    /// Checks that table IDs and group IDs are pairwise unique across the
    /// whole snapshot, reserved schemas included.
    pub fn validate_ids(&self) -> Result<()> {
        let mut tables: HashMap<TableId, &TableName> = HashMap::new();
        for table in self.tables() {
            let id = table.id.ok_or_else(|| internal_err!("Table {} has no id", table.name))?;
            if let Some(existing) = tables.insert(id, &table.name) {
                return Err(Error::DuplicateTableId {
                    id,
                    existing: existing.clone(),
                    duplicate: table.name.clone(),
                });
            }
        }
        let mut groups: HashMap<GroupId, &TableName> = HashMap::new();
        for group in self.groups() {
            let id = group.id.ok_or_else(|| internal_err!("Group {} has no id", group.name))?;
            if let Some(existing) = groups.insert(id, &group.name) {
                return Err(Error::DuplicateGroupId {
                    id,
                    existing: existing.clone(),
                    duplicate: group.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Encodes this generation for the persistence layer.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decodes a generation produced by [`Schema::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Schema> {
        let schema: Schema = bincode::deserialize(bytes)?;
        schema.validate_ids()?;
        Ok(schema)
    }
}

impl Catalog for Schema {
    fn get_table(&self, name: &TableName) -> Option<&Table> {
        self.table(name)
    }

    fn get_join(&self, name: &str) -> Option<&Join> {
        self.join(name)
    }

    fn get_sequence(&self, name: &TableName) -> Option<&Sequence> {
        self.sequence(name)
    }

    fn get_group(&self, name: &TableName) -> Result<Option<&Group>> {
        Ok(self.group(name))
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn write_tree(
            schema: &Schema,
            f: &mut Formatter<'_>,
            table: &TableName,
            indent: usize,
        ) -> std::fmt::Result {
            writeln!(f, "{:indent$}{}", "", table, indent = indent * 2)?;
            for join in schema.child_joins(table) {
                write_tree(schema, f, &join.child, indent + 1)?;
            }
            Ok(())
        }
        for group in self.groups() {
            writeln!(f, "GROUP {}", group.name)?;
            write_tree(self, f, &group.root, 1)?;
        }
        Ok(())
    }
}
