pub mod allocator;
pub mod builder;
#[allow(clippy::module_inception)]
pub mod catalog;
pub mod column;
pub mod group;
pub mod index;
pub mod join;
pub mod merge;
pub mod name;
pub mod osc;
pub mod schema;
pub mod sequence;
pub mod table;
pub mod r#type;

/// Table IDs are unique across every schema of a snapshot, reserved
/// schemas included.
pub type TableId = u32;

/// Group IDs share the uniqueness rule of table IDs.
pub type GroupId = u32;

/// Schemas whose tables are allocated from the reserved ID space.
pub const DEFAULT_RESERVED_SCHEMAS: [&str; 2] = ["information_schema", "sys"];
