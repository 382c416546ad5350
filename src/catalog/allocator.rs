use std::collections::HashSet;

use log::trace;

use crate::catalog::name::TableName;
use crate::catalog::schema::Schema;
use crate::catalog::{GroupId, TableId, DEFAULT_RESERVED_SCHEMAS};
use crate::error::{Error, Result};

/// A pair of counters, one for user schemas and one for reserved schemas.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spaces {
    user: u32,
    reserved: u32,
}

impl Spaces {
    fn next_mut(&mut self, reserved: bool) -> &mut u32 {
        if reserved {
            &mut self.reserved
        } else {
            &mut self.user
        }
    }
}

/// Hands out table and group IDs for one merge.
///
/// User and reserved schemas are allocated from independent counters, yet
/// an allocated ID never equals one already used anywhere in the seeding
/// snapshot, whatever space it came from.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    reserved_schemas: Vec<String>,
    used_tables: HashSet<TableId>,
    used_groups: HashSet<GroupId>,
    next_table: Spaces,
    next_group: Spaces,
}

impl IdAllocator {
    pub fn new(reserved_schemas: Vec<String>) -> IdAllocator {
        IdAllocator {
            reserved_schemas,
            used_tables: HashSet::new(),
            used_groups: HashSet::new(),
            next_table: Spaces { user: 1, reserved: 1 },
            next_group: Spaces { user: 1, reserved: 1 },
        }
    }

    /// An allocator whose counters continue after the highest IDs of
    /// each space in `schema`.
    pub fn seeded(schema: &Schema, reserved_schemas: Vec<String>) -> IdAllocator {
        let mut allocator = IdAllocator::new(reserved_schemas);
        for table in schema.tables() {
            if let Some(id) = table.id {
                allocator.observe_table(&table.name, id);
            }
        }
        for group in schema.groups() {
            if let Some(id) = group.id {
                allocator.observe_group(&group.name, id);
            }
        }
        allocator
    }

    /// Marks a table ID as used.
    pub fn observe_table(&mut self, name: &TableName, id: TableId) {
        self.used_tables.insert(id);
        let reserved = self.is_reserved(name);
        let next = self.next_table.next_mut(reserved);
        *next = (*next).max(id.saturating_add(1));
    }

    /// Marks a group ID as used.
    pub fn observe_group(&mut self, name: &TableName, id: GroupId) {
        self.used_groups.insert(id);
        let reserved = self.is_reserved(name);
        let next = self.next_group.next_mut(reserved);
        *next = (*next).max(id.saturating_add(1));
    }

    pub fn allocate_table_id(&mut self, name: &TableName) -> Result<TableId> {
        let reserved = self.is_reserved(name);
        let id = Self::allocate(self.next_table.next_mut(reserved), &mut self.used_tables)
            .ok_or_else(|| Error::IdsExhausted { kind: "table", name: name.clone() })?;
        trace!("allocated table id {} for {}", id, name);
        Ok(id)
    }

    pub fn allocate_group_id(&mut self, name: &TableName) -> Result<GroupId> {
        let reserved = self.is_reserved(name);
        let id = Self::allocate(self.next_group.next_mut(reserved), &mut self.used_groups)
            .ok_or_else(|| Error::IdsExhausted { kind: "group", name: name.clone() })?;
        trace!("allocated group id {} for {}", id, name);
        Ok(id)
    }

    pub fn is_reserved(&self, name: &TableName) -> bool {
        name.in_schemas(&self.reserved_schemas)
    }

    /// The first unused ID at or after `next`, none once the space is
    /// used up to `u32::MAX`.
    fn allocate(next: &mut u32, used: &mut HashSet<u32>) -> Option<u32> {
        while used.contains(next) {
            *next = next.checked_add(1)?;
        }
        let id = *next;
        used.insert(id);
        *next = next.saturating_add(1);
        Some(id)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator::new(DEFAULT_RESERVED_SCHEMAS.iter().map(|it| it.to_string()).collect())
    }
}
