use log::debug;

use crate::catalog::allocator::IdAllocator;
use crate::catalog::builder::SchemaBuilder;
use crate::catalog::catalog::Catalog;
use crate::catalog::group::Group;
use crate::catalog::join::Join;
use crate::catalog::name::TableName;
use crate::catalog::schema::Schema;
use crate::catalog::table::Table;
use crate::catalog::DEFAULT_RESERVED_SCHEMAS;
use crate::error::{Error, Result};
use crate::{internal_err, value_err};

/// Merges one table of a source catalog into a frozen target, producing a
/// new generation. The target itself is never modified.
///
/// A table with a parent join is grafted under its parent, which must
/// already exist in the target. Any other table becomes the root of a new
/// group named after the table.
pub struct SchemaMerge<'a, C: Catalog + ?Sized> {
    target: &'a Schema,
    source: &'a C,
    name: TableName,
    allocator: IdAllocator,
}

impl<'a, C: Catalog + ?Sized> SchemaMerge<'a, C> {
    pub fn new(target: &'a Schema, source: &'a C, name: TableName) -> Self {
        let reserved = DEFAULT_RESERVED_SCHEMAS.iter().map(|it| it.to_string()).collect();
        let allocator = IdAllocator::seeded(target, reserved);
        SchemaMerge { target, source, name, allocator }
    }

    /// Replaces the allocator. It should be seeded from the target.
    pub fn with_allocator(mut self, allocator: IdAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn merge(mut self) -> Result<Schema> {
        let catalog = self.source;
        let source = catalog.must_get_table(&self.name)?;
        if self.target.table(&self.name).is_some() {
            return Err(Error::DuplicateName { kind: "table", name: self.name.to_string() });
        }
        debug!("merging table {} into a schema of {} tables", self.name, self.target.tables().count());

        let mut staging = SchemaBuilder::from_schema(self.target);
        let mut table = Table::new(self.name.clone());
        for column in source.columns() {
            table.add_column(column.clone())?;
        }
        for index in source.indexes() {
            table.add_index(index.clone())?;
        }
        table.pending_osc = source.pending_osc.clone();
        table.ordinal = source.ordinal;
        self.copy_sequences(&mut staging, &table)?;

        table.id = Some(match source.id {
            Some(id) => {
                self.allocator.observe_table(&self.name, id);
                id
            }
            None => self.allocator.allocate_table_id(&self.name)?,
        });
        table.add_hidden_pk();
        table.assign_tree_names();
        table.validate()?;

        match catalog.parent_join(&self.name) {
            Some(join) => self.graft(&mut staging, table, join.clone())?,
            None => self.root(&mut staging, table)?,
        }

        let schema = staging.into_schema();
        schema.validate_ids()?;
        debug!("merged table {}", self.name);
        Ok(schema)
    }

    fn copy_sequences(&self, staging: &mut SchemaBuilder, table: &Table) -> Result<()> {
        for column in table.columns() {
            let Some(identity) = &column.identity else {
                continue;
            };
            let mut sequence = self
                .source
                .get_sequence(&identity.sequence)
                .cloned()
                .ok_or_else(|| value_err!("Sequence {} does not exist", identity.sequence))?;
            if staging.contains_sequence(&sequence.name) {
                return Err(Error::DuplicateName { kind: "sequence", name: sequence.name.to_string() });
            }
            if sequence.tree_name.is_none() {
                sequence.tree_name = Some(sequence.default_tree_name());
            }
            debug!("merging sequence {} of {}.{}", sequence.name, table.name, column.name);
            staging.insert_sequence(sequence);
        }
        Ok(())
    }

    /// Places the table under its parent in the parent's group.
    fn graft(&mut self, staging: &mut SchemaBuilder, mut table: Table, join: Join) -> Result<()> {
        let parent = staging.get_table(&join.parent).ok_or_else(|| Error::InvalidParentReference {
            join: join.name.clone(),
            child: self.name.clone(),
            parent: join.parent.clone(),
        })?;
        if staging.contains_join(&join.name) {
            return Err(Error::DuplicateName { kind: "join", name: join.name.clone() });
        }
        join.validate(parent, &table)?;
        let group = parent
            .group
            .clone()
            .ok_or_else(|| internal_err!("Parent table {} is not in a group", parent.name))?;
        let depth = parent.depth.unwrap_or_default() + 1;

        table.group = Some(group.clone());
        table.depth = Some(depth);
        if table.ordinal.is_none() {
            table.ordinal = Some(staging.next_ordinal(&group));
        }
        table.parent_join = Some(join.name.clone());
        debug!("grafting {} under {} at depth {} in group {}", self.name, join.parent, depth, group);

        staging.insert_table(table);
        staging.group_mut(&group)?.add_table(self.name.clone());
        let (parent, name) = (join.parent.clone(), join.name.clone());
        staging.insert_join(join);
        staging.link_child(&parent, &name)
    }

    /// Makes the table the root of a group. The group is named after the
    /// table unless the source already roots one at it, whose name, ID and
    /// tree are then kept.
    fn root(&mut self, staging: &mut SchemaBuilder, mut table: Table) -> Result<()> {
        let name = self.name.clone();
        let source = self.source;
        // A source that is still staging has no groups to reuse.
        let existing = match source.group_of(&name) {
            Ok(existing) => existing.filter(|it| it.root == name),
            Err(Error::PrematureAccess(_)) => None,
            Err(err) => return Err(err),
        };
        let mut group = match existing {
            Some(existing) => {
                let mut group = Group::new(existing.name.clone(), name.clone());
                group.id = existing.id;
                group.tree_name = existing.tree_name.clone();
                group
            }
            None => Group::new(name.clone(), name.clone()),
        };
        if staging.get_group(&group.name)?.is_some() {
            return Err(Error::DuplicateName { kind: "group", name: group.name.to_string() });
        }
        group.id = Some(match group.id {
            Some(id) => {
                self.allocator.observe_group(&group.name, id);
                id
            }
            None => self.allocator.allocate_group_id(&group.name)?,
        });
        if group.tree_name.is_none() {
            group.tree_name = Some(group.default_tree_name());
        }
        debug!("creating group {} rooted at {} with id {:?}", group.name, name, group.id);

        table.group = Some(group.name.clone());
        table.depth = Some(0);
        table.ordinal = Some(1);
        staging.insert_table(table);
        staging.insert_group(group);
        Ok(())
    }
}
