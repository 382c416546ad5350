use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::catalog::allocator::IdAllocator;
use crate::catalog::catalog::Catalog;
use crate::catalog::column::{Column, Identity};
use crate::catalog::group::{sibling_position, Group};
use crate::catalog::index::{Index, IndexColumn, IndexKind};
use crate::catalog::join::Join;
use crate::catalog::name::TableName;
use crate::catalog::osc::PendingOsc;
use crate::catalog::r#type::DataType;
use crate::catalog::schema::Schema;
use crate::catalog::sequence::Sequence;
use crate::catalog::table::Table;
use crate::error::{Error, Result};
use crate::{internal_err, value_err};

/// A group declared through the builder, resolved into a [`Group`] when
/// grouping completes.
#[derive(Debug, Clone, Default)]
struct StagedGroup {
    root: Option<TableName>,
    joins: Vec<String>,
}

/// Mutable staging area for schema objects.
///
/// Two barriers gate the staged state: [`basic_schema_is_complete`]
/// validates tables and materializes hidden primary keys, and
/// [`grouping_is_complete`] places every table into exactly one group.
/// Grouping dependent lookups fail with [`Error::PrematureAccess`] until
/// the second barrier passes. Any structural change lowers both barriers
/// again.
///
/// [`basic_schema_is_complete`]: SchemaBuilder::basic_schema_is_complete
/// [`grouping_is_complete`]: SchemaBuilder::grouping_is_complete
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    tables: BTreeMap<TableName, Arc<Table>>,
    groups: BTreeMap<TableName, Arc<Group>>,
    joins: BTreeMap<String, Arc<Join>>,
    sequences: BTreeMap<TableName, Arc<Sequence>>,
    staged_groups: BTreeMap<TableName, StagedGroup>,
    basic_complete: bool,
    grouping_complete: bool,
}

impl SchemaBuilder {
    pub fn new() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Stages a copy of a frozen generation. The copy shares members with
    /// `schema` until they are modified.
    pub fn from_schema(schema: &Schema) -> SchemaBuilder {
        SchemaBuilder {
            tables: schema.tables.clone(),
            groups: schema.groups.clone(),
            joins: schema.joins.clone(),
            sequences: schema.sequences.clone(),
            staged_groups: BTreeMap::new(),
            basic_complete: true,
            grouping_complete: true,
        }
    }

    fn changed(&mut self) {
        self.basic_complete = false;
        self.grouping_complete = false;
    }

    pub fn is_basic_schema_complete(&self) -> bool {
        self.basic_complete
    }

    pub fn is_grouping_complete(&self) -> bool {
        self.grouping_complete
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values().map(|it| it.as_ref())
    }

    pub fn table(&mut self, schema: &str, table: &str) -> Result<()> {
        let name = TableName::new(schema, table);
        if self.tables.contains_key(&name) {
            return Err(Error::DuplicateName { kind: "table", name: name.to_string() });
        }
        self.changed();
        self.tables.insert(name.clone(), Arc::new(Table::new(name)));
        Ok(())
    }

    pub fn column(
        &mut self,
        schema: &str,
        table: &str,
        name: &str,
        position: usize,
        datatype: DataType,
        nullable: bool,
    ) -> Result<()> {
        self.changed();
        let table = self.table_mut(&TableName::new(schema, table))?;
        table.add_column(Column::new(name, position, datatype, nullable))
    }

    pub fn index(&mut self, schema: &str, table: &str, name: &str, kind: IndexKind) -> Result<()> {
        self.changed();
        self.table_mut(&TableName::new(schema, table))?.add_index(Index::new(name, kind))
    }

    pub fn index_column(
        &mut self,
        schema: &str,
        table: &str,
        index: &str,
        column: &str,
        position: usize,
        ascending: bool,
    ) -> Result<()> {
        self.changed();
        let table = self.table_mut(&TableName::new(schema, table))?;
        let name = table.name.clone();
        let index = table
            .index_mut(index)
            .ok_or_else(|| value_err!("Index {} does not exist on table {}", index, name))?;
        index.add_column(IndexColumn { column: column.to_string(), position, ascending });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn sequence(
        &mut self,
        schema: &str,
        name: &str,
        start_with: i64,
        increment: i64,
        min_value: i64,
        max_value: i64,
        cycle: bool,
    ) -> Result<()> {
        let name = TableName::new(schema, name);
        if self.sequences.contains_key(&name) {
            return Err(Error::DuplicateName { kind: "sequence", name: name.to_string() });
        }
        let sequence = Sequence::new(name.clone(), start_with, increment, min_value, max_value, cycle);
        sequence.validate()?;
        self.changed();
        self.sequences.insert(name, Arc::new(sequence));
        Ok(())
    }

    /// Binds a column to a sequence of the same schema as an identity
    /// generator.
    pub fn column_as_identity(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
        sequence: &str,
        default_identity: bool,
    ) -> Result<()> {
        let sequence = TableName::new(schema, sequence);
        if !self.sequences.contains_key(&sequence) {
            return Err(value_err!("Sequence {} does not exist", sequence));
        }
        self.changed();
        let table = self.table_mut(&TableName::new(schema, table))?;
        let name = table.name.clone();
        let col = table
            .column_mut(column)
            .ok_or_else(|| Error::NoSuchColumn { table: name.clone(), column: column.to_string() })?;
        if let Some(identity) = &col.identity {
            return Err(Error::ColumnAlreadyGenerated {
                table: name,
                column: column.to_string(),
                sequence: identity.sequence.clone(),
            });
        }
        col.identity = Some(Identity { sequence, default_identity });
        Ok(())
    }

    /// Declares a join from a child table to its parent. The parent may be
    /// absent from this builder; it is then resolved by name when the
    /// child is merged.
    pub fn join_tables(
        &mut self,
        join: &str,
        parent_schema: &str,
        parent_table: &str,
        child_schema: &str,
        child_table: &str,
    ) -> Result<()> {
        if self.joins.contains_key(join) {
            return Err(Error::DuplicateName { kind: "join", name: join.to_string() });
        }
        let parent = TableName::new(parent_schema, parent_table);
        let child = TableName::new(child_schema, child_table);
        self.changed();
        let table = self.table_mut(&child)?;
        if let Some(existing) = &table.parent_join {
            return Err(value_err!("Table {} already has parent join {}", child, existing));
        }
        table.parent_join = Some(join.to_string());
        self.joins.insert(join.to_string(), Arc::new(Join::new(join, parent, child)));
        Ok(())
    }

    pub fn join_columns(&mut self, join: &str, parent_column: &str, child_column: &str) -> Result<()> {
        self.changed();
        let join = self
            .joins
            .get_mut(join)
            .map(Arc::make_mut)
            .ok_or_else(|| value_err!("Join {} does not exist", join))?;
        join.add_column(parent_column, child_column);
        Ok(())
    }

    pub fn pending_osc(&mut self, schema: &str, table: &str, osc: PendingOsc) -> Result<()> {
        self.changed();
        self.table_mut(&TableName::new(schema, table))?.pending_osc = Some(osc);
        Ok(())
    }

    /// Pins the sibling ordinal of a table instead of letting grouping
    /// assign the next free one.
    pub fn table_ordinal(&mut self, schema: &str, table: &str, ordinal: u32) -> Result<()> {
        self.changed();
        self.table_mut(&TableName::new(schema, table))?.ordinal = Some(ordinal);
        Ok(())
    }

    /// Declares a group and returns its name for the `add_*_to_group` calls.
    pub fn create_group(&mut self, schema: &str, name: &str) -> Result<TableName> {
        let name = TableName::new(schema, name);
        if self.staged_groups.contains_key(&name) || self.groups.contains_key(&name) {
            return Err(Error::DuplicateName { kind: "group", name: name.to_string() });
        }
        self.changed();
        self.staged_groups.insert(name.clone(), StagedGroup::default());
        Ok(name)
    }

    /// Makes the given table the root of the group.
    pub fn add_table_to_group(&mut self, group: &TableName, schema: &str, table: &str) -> Result<()> {
        let table = TableName::new(schema, table);
        self.must_get_table(&table)?;
        let staged = self
            .staged_groups
            .get_mut(group)
            .ok_or_else(|| value_err!("Group {} does not exist", group))?;
        match &staged.root {
            Some(root) if *root != table => {
                return Err(value_err!("Group {} already has root table {}", group, root));
            }
            _ => staged.root = Some(table),
        }
        self.changed();
        Ok(())
    }

    /// Places the child table of the join into the group.
    pub fn add_join_to_group(&mut self, group: &TableName, join: &str) -> Result<()> {
        if !self.joins.contains_key(join) {
            return Err(value_err!("Join {} does not exist", join));
        }
        let staged = self
            .staged_groups
            .get_mut(group)
            .ok_or_else(|| value_err!("Group {} does not exist", group))?;
        if !staged.joins.iter().any(|it| it == join) {
            staged.joins.push(join.to_string());
        }
        self.changed();
        Ok(())
    }

    /// First barrier: validates the staged tables and sequences, and gives
    /// every table without a primary key its hidden one.
    pub fn basic_schema_is_complete(&mut self) -> Result<()> {
        let names: Vec<TableName> = self
            .tables()
            .filter(|it| it.primary_key_including_internal().is_none())
            .map(|it| it.name.clone())
            .collect();
        for name in names {
            self.table_mut(&name)?.add_hidden_pk();
        }
        for table in self.tables() {
            table.validate()?;
            for column in table.columns() {
                if let Some(identity) = &column.identity {
                    if !self.sequences.contains_key(&identity.sequence) {
                        return Err(value_err!(
                            "Sequence {} of column {}.{} does not exist",
                            identity.sequence,
                            table.name,
                            column.name
                        ));
                    }
                }
            }
        }
        for sequence in self.sequences.values() {
            sequence.validate()?;
        }
        for join in self.joins.values() {
            let child = self.must_get_table(&join.child)?;
            if join.columns.is_empty() {
                return Err(value_err!("Join {} has no join columns", join.name));
            }
            for column in &join.columns {
                if child.column(&column.child).is_none() {
                    return Err(Error::NoSuchColumn {
                        table: child.name.clone(),
                        column: column.child.clone(),
                    });
                }
            }
        }
        self.basic_complete = true;
        Ok(())
    }

    /// Second barrier: resolves the declared groups, assigning group,
    /// depth and ordinal to every grouped table and ordering child joins
    /// by ordinal. Fails when a table ends up in no group.
    pub fn grouping_is_complete(&mut self) -> Result<()> {
        if !self.basic_complete {
            self.basic_schema_is_complete()?;
        }
        let staged_groups = self.staged_groups.clone();
        for (name, staged) in &staged_groups {
            let root = staged
                .root
                .clone()
                .ok_or_else(|| value_err!("Group {} has no root table", name))?;
            if let Some(join) = &self.must_get_table(&root)?.parent_join {
                return Err(value_err!("Root {} of group {} has parent join {}", root, name, join));
            }
            match self.groups.get(name) {
                Some(group) if group.root != root => {
                    return Err(value_err!("Group {} is rooted at {}, not {}", name, group.root, root));
                }
                Some(_) => {}
                None => {
                    self.groups.insert(name.clone(), Arc::new(Group::new(name.clone(), root.clone())));
                }
            }
            self.place(&root, name, 0)?;

            // Joins may be listed ahead of the join placing their parent.
            let mut pending = staged.joins.clone();
            while !pending.is_empty() {
                let before = pending.len();
                let mut rest = vec![];
                for join in pending {
                    let join = self.must_get_join(&join)?;
                    let depth = self
                        .tables
                        .get(&join.parent)
                        .filter(|it| it.group.as_ref() == Some(name))
                        .map(|it| it.depth.unwrap_or_default() + 1);
                    match depth {
                        Some(depth) => {
                            self.place(&join.child, name, depth)?;
                            self.link_child(&join.parent, &join.name)?;
                        }
                        None => rest.push(join.name.clone()),
                    }
                }
                if rest.len() == before {
                    return Err(value_err!("Join {} does not connect to group {}", rest[0], name));
                }
                pending = rest;
            }
        }
        for table in self.tables() {
            match &table.group {
                Some(group) if self.groups.contains_key(group) => {}
                _ => return Err(value_err!("Table {} is not in any group", table.name)),
            }
        }
        self.grouping_complete = true;
        debug!("grouping complete, {} groups, {} tables", self.groups.len(), self.tables.len());
        Ok(())
    }

    fn place(&mut self, table: &TableName, group: &TableName, depth: u32) -> Result<()> {
        let ordinal = self.next_ordinal(group);
        let t = self.table_mut(table)?;
        match &t.group {
            Some(existing) if existing != group => {
                return Err(value_err!("Table {} already belongs to group {}", table, existing));
            }
            _ => {}
        }
        t.group = Some(group.clone());
        t.depth = Some(depth);
        if t.ordinal.is_none() {
            t.ordinal = Some(ordinal);
        }
        self.group_mut(group)?.add_table(table.clone());
        Ok(())
    }

    /// The group of a table; fails before grouping is complete.
    pub fn group(&self, table: &TableName) -> Result<Option<&Group>> {
        self.group_of(table)
    }

    /// The depth of a table in its group; fails before grouping is complete.
    pub fn depth(&self, table: &TableName) -> Result<Option<u32>> {
        if !self.grouping_complete {
            return Err(Error::PrematureAccess(format!("get depth of {}", table)));
        }
        Ok(self.get_table(table).and_then(|it| it.depth))
    }

    /// Freezes the staged state with IDs from a default allocator.
    pub fn freeze(self) -> Result<Schema> {
        self.freeze_with(IdAllocator::default())
    }

    /// Freezes the staged state into a [`Schema`]. Tables and groups
    /// without an ID get one from `allocator`, then every join is checked
    /// against its parent and child and IDs are checked for uniqueness.
    pub fn freeze_with(mut self, mut allocator: IdAllocator) -> Result<Schema> {
        if !self.grouping_complete {
            return Err(Error::PrematureAccess("freeze the schema".to_string()));
        }
        for join in self.joins.values() {
            let parent = self.get_table(&join.parent).ok_or_else(|| Error::InvalidParentReference {
                join: join.name.clone(),
                child: join.child.clone(),
                parent: join.parent.clone(),
            })?;
            join.validate(parent, self.must_get_table(&join.child)?)?;
        }
        for table in self.tables() {
            if let Some(id) = table.id {
                allocator.observe_table(&table.name, id);
            }
        }
        for group in self.groups.values() {
            if let Some(id) = group.id {
                allocator.observe_group(&group.name, id);
            }
        }
        let names: Vec<TableName> = self.tables.keys().cloned().collect();
        for name in names {
            let needs_id = self.tables.get(&name).map(|it| it.id.is_none()).unwrap_or_default();
            if needs_id {
                let id = allocator.allocate_table_id(&name)?;
                self.table_mut(&name)?.id = Some(id);
            }
            let needs_names = self
                .tables
                .get(&name)
                .map(|it| it.indexes_including_internal().iter().any(|i| i.tree_name.is_none()))
                .unwrap_or_default();
            if needs_names {
                self.table_mut(&name)?.assign_tree_names();
            }
        }
        let names: Vec<TableName> = self.groups.keys().cloned().collect();
        for name in names {
            let group = self.group_mut(&name)?;
            if group.tree_name.is_none() {
                group.tree_name = Some(group.default_tree_name());
            }
            if group.id.is_none() {
                group.id = Some(allocator.allocate_group_id(&name)?);
            }
        }
        for sequence in self.sequences.values_mut() {
            if sequence.tree_name.is_none() {
                let sequence = Arc::make_mut(sequence);
                sequence.tree_name = Some(sequence.default_tree_name());
            }
        }
        let schema = self.into_schema();
        schema.validate_ids()?;
        Ok(schema)
    }

    pub(crate) fn into_schema(self) -> Schema {
        Schema {
            tables: self.tables,
            groups: self.groups,
            joins: self.joins,
            sequences: self.sequences,
        }
    }

    pub(crate) fn table_mut(&mut self, name: &TableName) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .map(Arc::make_mut)
            .ok_or_else(|| value_err!("Table {} does not exist", name))
    }

    pub(crate) fn group_mut(&mut self, name: &TableName) -> Result<&mut Group> {
        self.groups
            .get_mut(name)
            .map(Arc::make_mut)
            .ok_or_else(|| internal_err!("Group {} does not exist", name))
    }

    fn must_get_join(&self, name: &str) -> Result<Arc<Join>> {
        self.joins.get(name).cloned().ok_or_else(|| value_err!("Join {} does not exist", name))
    }

    pub(crate) fn insert_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), Arc::new(table));
    }

    pub(crate) fn insert_join(&mut self, join: Join) {
        self.joins.insert(join.name.clone(), Arc::new(join));
    }

    pub(crate) fn insert_group(&mut self, group: Group) {
        self.groups.insert(group.name.clone(), Arc::new(group));
    }

    pub(crate) fn insert_sequence(&mut self, sequence: Sequence) {
        self.sequences.insert(sequence.name.clone(), Arc::new(sequence));
    }

    pub(crate) fn contains_join(&self, name: &str) -> bool {
        self.joins.contains_key(name)
    }

    pub(crate) fn contains_sequence(&self, name: &TableName) -> bool {
        self.sequences.contains_key(name)
    }

    /// The ordinal following the highest one used in the group.
    pub(crate) fn next_ordinal(&self, group: &TableName) -> u32 {
        self.tables()
            .filter(|it| it.group.as_ref() == Some(group))
            .filter_map(|it| it.ordinal)
            .max()
            .unwrap_or_default()
            + 1
    }

    /// Adds the join to the parent's child joins, keeping them ordered by
    /// the ordinal of the child tables.
    pub(crate) fn link_child(&mut self, parent: &TableName, join: &str) -> Result<()> {
        let ordinal_of = |builder: &SchemaBuilder, join: &str| {
            builder
                .joins
                .get(join)
                .and_then(|it| builder.tables.get(&it.child))
                .and_then(|it| it.ordinal)
                .unwrap_or_default()
        };
        let siblings = &self.must_get_table(parent)?.child_joins;
        if siblings.iter().any(|it| it == join) {
            return Ok(());
        }
        let ordinals: Vec<u32> = siblings.iter().map(|it| ordinal_of(self, it)).collect();
        let at = sibling_position(&ordinals, ordinal_of(self, join), |it| *it);
        self.table_mut(parent)?.child_joins.insert(at, join.to_string());
        Ok(())
    }
}

impl Catalog for SchemaBuilder {
    fn get_table(&self, name: &TableName) -> Option<&Table> {
        self.tables.get(name).map(|it| it.as_ref())
    }

    fn get_join(&self, name: &str) -> Option<&Join> {
        self.joins.get(name).map(|it| it.as_ref())
    }

    fn get_sequence(&self, name: &TableName) -> Option<&Sequence> {
        self.sequences.get(name).map(|it| it.as_ref())
    }

    fn get_group(&self, name: &TableName) -> Result<Option<&Group>> {
        if !self.grouping_complete {
            return Err(Error::PrematureAccess(format!("look up group {}", name)));
        }
        Ok(self.groups.get(name).map(|it| it.as_ref()))
    }
}
