use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write;

use crate::catalog::group::sibling_position;
use crate::catalog::name::TableName;
use crate::sql::plan::expr::{ConditionExpr, Expr};
use crate::sql::plan::join::{JoinType, TableSource};

/// One table of a group join tree. Children are the tables clustered
/// under it, ordered by ordinal.
#[derive(Clone, Debug, PartialEq)]
pub struct TableGroupJoinNode {
    pub table: TableSource,
    /// The join type this node was attached to its parent with.
    pub join_type: Option<JoinType>,
    /// The conditions of the join that attached this node.
    pub conditions: Vec<ConditionExpr>,
    pub children: Vec<TableGroupJoinNode>,
}

impl TableGroupJoinNode {
    pub fn new(table: TableSource) -> TableGroupJoinNode {
        TableGroupJoinNode { table, join_type: None, conditions: vec![], children: vec![] }
    }

    /// The first node, in pre-order, over the given table.
    pub fn find_table_mut(&mut self, name: &TableName) -> Option<&mut TableGroupJoinNode> {
        if self.table.name == *name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|it| it.find_table_mut(name))
    }

    /// Inserts a child before the first sibling with a greater ordinal.
    pub fn add_child(&mut self, child: TableGroupJoinNode) {
        let at = sibling_position(&self.children, child.table.ordinal, |it| it.table.ordinal);
        self.children.insert(at, child);
    }

    pub fn walk_tables(&self, f: &mut impl FnMut(&TableSource)) {
        f(&self.table);
        for child in &self.children {
            child.walk_tables(f);
        }
    }

    pub fn condition_exprs(&self) -> Vec<&Expr> {
        let mut exprs: Vec<&Expr> = self.conditions.iter().map(|it| &it.expr).collect();
        for child in &self.children {
            exprs.extend(child.condition_exprs());
        }
        exprs
    }

    /// Writes the subtree one node per line.
    pub fn write_indented(&self, out: &mut impl Write, indent: usize) -> std::fmt::Result {
        writeln!(out, "{:indent$}{}", "", self, indent = indent * 2)?;
        for child in &self.children {
            child.write_indented(out, indent + 1)?;
        }
        Ok(())
    }
}

impl Display for TableGroupJoinNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table)?;
        if let Some(join_type) = &self.join_type {
            write!(f, " ({join_type}")?;
            for (i, condition) in self.conditions.iter().enumerate() {
                let sep = if i == 0 { ": " } else { ", " };
                write!(f, "{sep}{condition}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// The tables of one group that a query reads with a single scan.
#[derive(Clone, Debug, PartialEq)]
pub struct TableGroupJoinTree {
    pub group: TableName,
    pub root: TableGroupJoinNode,
}

impl TableGroupJoinTree {
    pub fn new(root: TableGroupJoinNode) -> TableGroupJoinTree {
        let group = root.table.group.clone().unwrap_or_else(|| root.table.name.clone());
        TableGroupJoinTree { group, root }
    }
}
