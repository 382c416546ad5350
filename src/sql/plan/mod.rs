pub mod expr;
pub mod group_join;
pub mod join;
pub mod visitor;
