use crate::catalog::group::Group;
use crate::catalog::join::Join;
use crate::catalog::name::TableName;
use crate::catalog::sequence::Sequence;
use crate::catalog::table::Table;
use crate::error::{Error, Result};
use crate::value_err;

/// Read access to schema objects, shared by the frozen [`Schema`] and the
/// staging [`SchemaBuilder`] so that either can be the source of a merge.
///
/// [`Schema`]: crate::catalog::schema::Schema
/// [`SchemaBuilder`]: crate::catalog::builder::SchemaBuilder
pub trait Catalog {
    /// Gets a table, if it exists
    fn get_table(&self, name: &TableName) -> Option<&Table>;

    /// Gets a table, and errors if it does not exist
    fn must_get_table(&self, name: &TableName) -> Result<&Table> {
        self.get_table(name).ok_or_else(|| value_err!("Table {} does not exist", name))
    }

    /// Gets a join by name
    fn get_join(&self, name: &str) -> Option<&Join>;

    /// Gets a sequence, if it exists
    fn get_sequence(&self, name: &TableName) -> Option<&Sequence>;

    /// Gets a group by name. Fails with [`Error::PrematureAccess`] when
    /// grouping is not complete yet.
    fn get_group(&self, name: &TableName) -> Result<Option<&Group>>;

    /// The join to the parent of the given table, if any.
    fn parent_join(&self, table: &TableName) -> Option<&Join> {
        let name = self.get_table(table)?.parent_join.as_ref()?;
        self.get_join(name)
    }

    /// The group the given table belongs to.
    fn group_of(&self, table: &TableName) -> Result<Option<&Group>> {
        match self.get_table(table).and_then(|it| it.group.as_ref()) {
            Some(group) => self.get_group(group),
            None => match self.get_group(table) {
                // Surface premature access even for ungrouped tables.
                Err(err @ Error::PrematureAccess(_)) => Err(err),
                _ => Ok(None),
            },
        }
    }
}
