use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write;

use crate::apply_each;
use crate::catalog::catalog::Catalog;
use crate::catalog::name::TableName;
use crate::catalog::schema::Schema;
use crate::error::Result;
use crate::internal_err;
use crate::sql::plan::expr::{ConditionExpr, Expr, SourceId};
use crate::sql::plan::group_join::TableGroupJoinTree;
use crate::sql::plan::visitor::{TreeNode, TreeNodeVisitor, VisitRecursion};

/// A table reference together with the grouping facts of its table.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSource {
    pub id: SourceId,
    pub name: TableName,
    pub alias: Option<String>,
    pub group: Option<TableName>,
    pub depth: u32,
    pub ordinal: u32,
    /// The parent table recorded by the schema join, if any.
    pub parent: Option<TableName>,
}

impl TableSource {
    /// Binds a table reference against `schema`.
    pub fn try_new(schema: &Schema, id: SourceId, name: TableName, alias: Option<&str>) -> Result<Self> {
        let table = schema.must_get_table(&name)?;
        Ok(TableSource {
            id,
            alias: alias.map(|it| it.to_string()),
            group: table.group.clone(),
            depth: table.depth.unwrap_or_default(),
            ordinal: table.ordinal.unwrap_or_default(),
            parent: schema.parent_join(&name).map(|it| it.parent.clone()),
            name,
        })
    }
}

impl Display for TableSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl Display for JoinType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JoinType::Inner => "Inner",
            JoinType::Left => "Left",
            JoinType::Right => "Right",
            JoinType::Full => "Full",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinNode {
    pub left: Box<Joinable>,
    pub right: Box<Joinable>,
    pub join_type: JoinType,
    pub conditions: Vec<ConditionExpr>,
}

impl JoinNode {
    pub fn new(left: Joinable, right: Joinable, join_type: JoinType, conditions: Vec<Expr>) -> JoinNode {
        JoinNode {
            left: Box::new(left),
            right: Box::new(right),
            join_type,
            conditions: conditions.into_iter().map(ConditionExpr::new).collect(),
        }
    }

    /// Replaces the left input, returning the old one.
    pub fn set_left(&mut self, left: Joinable) -> Joinable {
        std::mem::replace(self.left.as_mut(), left)
    }

    /// Replaces the right input, returning the old one.
    pub fn set_right(&mut self, right: Joinable) -> Joinable {
        std::mem::replace(self.right.as_mut(), right)
    }
}

/// A derived table.
#[derive(Clone, Debug, PartialEq)]
pub struct SubquerySource {
    pub alias: String,
    pub input: Box<Joinable>,
}

/// A node of the join tree of a query.
#[derive(Clone, Debug, PartialEq)]
pub enum Joinable {
    Table(TableSource),
    Join(JoinNode),
    /// Tables of one group answered by a single clustered scan.
    GroupJoinTree(TableGroupJoinTree),
    Subquery(SubquerySource),
}

impl Joinable {
    pub fn join(left: Joinable, right: Joinable, join_type: JoinType, conditions: Vec<Expr>) -> Joinable {
        Joinable::Join(JoinNode::new(left, right, join_type, conditions))
    }

    /// Replaces the input at `index` in place, returning the replaced one.
    /// The left input of a join is 0 and the right one 1.
    pub fn replace_input(&mut self, index: usize, input: Joinable) -> Result<Joinable> {
        match (self, index) {
            (Joinable::Join(join), 0) => Ok(join.set_left(input)),
            (Joinable::Join(join), 1) => Ok(join.set_right(input)),
            (Joinable::Subquery(subquery), 0) => Ok(std::mem::replace(subquery.input.as_mut(), input)),
            (node, index) => Err(internal_err!("{} has no input {}", node.kind(), index)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Joinable::Table(_) => "Table",
            Joinable::Join(_) => "Join",
            Joinable::GroupJoinTree(_) => "GroupJoinTree",
            Joinable::Subquery(_) => "Subquery",
        }
    }

    /// Every table reference in this subtree, derived tables and group
    /// join trees included.
    pub fn sources(&self) -> Vec<SourceId> {
        let mut sources = vec![];
        let _ = self.walk(|node| {
            match node {
                Joinable::Table(table) => sources.push(table.id),
                Joinable::GroupJoinTree(tree) => tree.root.walk_tables(&mut |it| sources.push(it.id)),
                _ => {}
            }
            Ok(VisitRecursion::Continue)
        });
        sources
    }

    /// Applies `f` to every condition expression in this subtree.
    pub fn visit_exprs<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&Expr) -> Result<VisitRecursion>,
    {
        self.walk(|node| match node {
            Joinable::Join(JoinNode { conditions, .. }) => {
                let exprs: Vec<&Expr> = conditions.iter().map(|it| &it.expr).collect();
                apply_each!(f; exprs)
            }
            Joinable::GroupJoinTree(tree) => {
                let exprs = tree.root.condition_exprs();
                apply_each!(f; exprs)
            }
            _ => Ok(VisitRecursion::Continue),
        })?;
        Ok(())
    }

    /// Whether `expr` references a column of any of `sources`, looking
    /// into the plans of subqueries as well.
    pub fn references_any(expr: &Expr, sources: &[SourceId]) -> Result<bool> {
        let mut found = false;
        expr.walk(|it| match it {
            Expr::Column(column) if sources.contains(&column.source) => {
                found = true;
                Ok(VisitRecursion::Stop)
            }
            Expr::Exists(plan) | Expr::ScalarSubquery(plan) => {
                let mut inner = false;
                plan.visit_exprs(|e| {
                    inner = Joinable::references_any(e, sources)?;
                    Ok(if inner { VisitRecursion::Stop } else { VisitRecursion::Continue })
                })?;
                found = inner;
                Ok(if inner { VisitRecursion::Stop } else { VisitRecursion::Continue })
            }
            _ => Ok(VisitRecursion::Continue),
        })?;
        Ok(found)
    }
}

/// Subqueries inside conditions are children too, so a walk reaches
/// every join tree of the query.
impl TreeNode for Joinable {
    fn visit_children<F>(&self, mut f: F) -> Result<VisitRecursion>
    where
        F: FnMut(&Self) -> Result<VisitRecursion>,
    {
        match self {
            Joinable::Table(_) | Joinable::GroupJoinTree(_) => Ok(VisitRecursion::Continue),
            Joinable::Subquery(SubquerySource { input, .. }) => f(input),
            Joinable::Join(JoinNode { left, right, conditions, .. }) => {
                apply_each!(f, left, right)?.when_sibling(|| {
                    let subqueries: Vec<&Joinable> =
                        conditions.iter().flat_map(|it| it.expr.subqueries()).collect();
                    apply_each!(f; subqueries)
                })
            }
        }
    }
}

impl Display for Joinable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut visitor = IndentVisitor::new(f);
        match self.visit(&mut visitor) {
            Ok(_) => Ok(()),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

struct IndentVisitor<'a, 'b> {
    f: &'a mut Formatter<'b>,
    /// The current indent
    indent: usize,
}

impl<'a, 'b> IndentVisitor<'a, 'b> {
    fn new(f: &'a mut Formatter<'b>) -> Self {
        Self { f, indent: 0 }
    }

    fn write_node(&mut self, node: &Joinable) -> std::fmt::Result {
        match node {
            Joinable::Table(table) => write!(self.f, "Table: {table}"),
            Joinable::Join(JoinNode { join_type, conditions, .. }) => {
                write!(self.f, "{join_type} Join:")?;
                for (i, condition) in conditions.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(self.f, "{sep}{condition}")?;
                }
                Ok(())
            }
            Joinable::GroupJoinTree(tree) => {
                write!(self.f, "GroupJoinTree: {}", tree.group)?;
                let mut lines = String::new();
                tree.root.write_indented(&mut lines, self.indent + 1)?;
                for line in lines.lines() {
                    self.f.write_char('\n')?;
                    self.f.write_str(line)?;
                }
                Ok(())
            }
            Joinable::Subquery(SubquerySource { alias, .. }) => write!(self.f, "Subquery: {alias}"),
        }
    }
}

impl<'n> TreeNodeVisitor<'n> for IndentVisitor<'_, '_> {
    type Node = Joinable;

    fn enter(&mut self, node: &'n Self::Node) -> Result<VisitRecursion> {
        if self.indent > 0 {
            writeln!(self.f)?;
        }
        write!(self.f, "{:indent$}", "", indent = self.indent * 2)?;
        self.write_node(node)?;

        self.indent += 1;
        Ok(VisitRecursion::Continue)
    }

    fn leave(&mut self, _node: &'n Self::Node) -> Result<VisitRecursion> {
        self.indent -= 1;
        Ok(VisitRecursion::Continue)
    }
}
