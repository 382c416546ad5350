use std::cmp::Ordering;
use std::fmt::Display;
use std::fmt::Formatter;

use log::debug;

use crate::catalog::catalog::Catalog;
use crate::catalog::schema::Schema;
use crate::sql::plan::expr::{ColumnExpr, Expr, Implementation};
use crate::sql::plan::group_join::{TableGroupJoinNode, TableGroupJoinTree};
use crate::sql::plan::join::{JoinNode, JoinType, Joinable};

/// Why the two resolved inputs of a join were not coalesced. Never fatal,
/// the join is simply planned as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    CrossGroup,
    /// An outer join has a condition on its optional side.
    OuterCondition,
    UnsupportedJoinType,
    EqualDepth,
    /// The child's recorded parent is not in the other tree.
    MissingLineage,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Rejection::CrossGroup => "tables are in different groups",
            Rejection::OuterCondition => "outer join condition references the optional side",
            Rejection::UnsupportedJoinType => "join type can't be clustered",
            Rejection::EqualDepth => "both sides are at the same depth",
            Rejection::MissingLineage => "parent of the child side is not joined",
        };
        write!(f, "{reason}")
    }
}

/// Finds the joins of a query that follow the grouping of the schema and
/// replaces them with group join trees, so that the tables of one group
/// are read with a single scan.
pub struct GroupJoinFinder<'a> {
    schema: &'a Schema,
}

impl<'a> GroupJoinFinder<'a> {
    pub fn new(schema: &'a Schema) -> GroupJoinFinder<'a> {
        GroupJoinFinder { schema }
    }

    /// Rewrites the join tree in place. Derived tables and subqueries in
    /// conditions are independent islands and are rewritten first.
    pub fn apply(&self, root: &mut Joinable) {
        self.apply_nested(root);
        if let Some(node) = self.isolate(root) {
            let tree = TableGroupJoinTree::new(node);
            debug!("island coalesced into a group join over {}", tree.group);
            *root = Joinable::GroupJoinTree(tree);
        }
    }

    fn apply_nested(&self, node: &mut Joinable) {
        match node {
            Joinable::Join(join) => {
                self.apply_nested(&mut join.left);
                self.apply_nested(&mut join.right);
                for condition in join.conditions.iter_mut() {
                    self.apply_expr(&mut condition.expr);
                }
            }
            Joinable::Subquery(subquery) => self.apply(&mut subquery.input),
            Joinable::Table(_) | Joinable::GroupJoinTree(_) => {}
        }
    }

    fn apply_expr(&self, expr: &mut Expr) {
        match expr {
            Expr::Exists(plan) | Expr::ScalarSubquery(plan) => self.apply(plan),
            Expr::Not(expr) | Expr::IsNull(expr) => self.apply_expr(expr),
            Expr::BinaryExpr(binary) => {
                self.apply_expr(&mut binary.left);
                self.apply_expr(&mut binary.right);
            }
            Expr::Column(_) | Expr::Value(_) => {}
        }
    }

    /// Resolves the subtree bottom-up into a group join tree. Returns none
    /// when the subtree can't be answered by one group scan; the parts that
    /// could are then wrapped in place.
    #[cfg_attr(feature = "recursive-protection", recursive::recursive)]
    pub fn isolate(&self, node: &mut Joinable) -> Option<TableGroupJoinNode> {
        match node {
            Joinable::Table(table) => Some(TableGroupJoinNode::new(table.clone())),
            Joinable::Join(join) => self.isolate_join(join),
            Joinable::GroupJoinTree(_) | Joinable::Subquery(_) => None,
        }
    }

    fn isolate_join(&self, join: &mut JoinNode) -> Option<TableGroupJoinNode> {
        self.mark_group_joins(join);
        let left = self.isolate(&mut join.left);
        let right = self.isolate(&mut join.right);
        let (left, right) = match (left, right) {
            (Some(left), Some(right)) => (left, right),
            (left, right) => {
                wrap(join, left, right);
                return None;
            }
        };

        let child_is_right = match self.check(join, &left, &right) {
            Ok(child_is_right) => child_is_right,
            Err(rejection) => {
                reject(join, rejection, left, right);
                return None;
            }
        };
        let (mut parent, mut child) = if child_is_right { (left, right) } else { (right, left) };
        child.join_type = Some(join.join_type);
        child.conditions = join.conditions.clone();
        match splice(&mut parent, child) {
            Ok(()) => Some(parent),
            Err(mut child) => {
                child.join_type = None;
                child.conditions.clear();
                let (left, right) = if child_is_right { (parent, child) } else { (child, parent) };
                reject(join, Rejection::MissingLineage, left, right);
                None
            }
        }
    }

    /// Whether the resolved sides may be coalesced, and if so whether the
    /// right one is the child.
    fn check(
        &self,
        join: &JoinNode,
        left: &TableGroupJoinNode,
        right: &TableGroupJoinNode,
    ) -> std::result::Result<bool, Rejection> {
        match (&left.table.group, &right.table.group) {
            (Some(l), Some(r)) if l == r => {}
            _ => return Err(Rejection::CrossGroup),
        }
        match join.join_type {
            JoinType::Inner => {}
            JoinType::Left if references(join, &join.right) => return Err(Rejection::OuterCondition),
            JoinType::Right if references(join, &join.left) => return Err(Rejection::OuterCondition),
            JoinType::Left | JoinType::Right => {}
            JoinType::Full => return Err(Rejection::UnsupportedJoinType),
        }
        match left.table.depth.cmp(&right.table.depth) {
            Ordering::Less => Ok(true),
            Ordering::Greater => Ok(false),
            Ordering::Equal => Err(Rejection::EqualDepth),
        }
    }

    /// Flags the conditions equating a child column with the parent column
    /// of its schema join.
    fn mark_group_joins(&self, join: &mut JoinNode) {
        for condition in join.conditions.iter_mut() {
            let group_join = condition
                .expr
                .as_column_equality()
                .map(|(l, r)| self.is_join_column(l, r) || self.is_join_column(r, l))
                .unwrap_or_default();
            if group_join {
                condition.implementation = Implementation::GroupJoin;
            }
        }
    }

    fn is_join_column(&self, child: &ColumnExpr, parent: &ColumnExpr) -> bool {
        self.schema
            .parent_join(&child.table)
            .filter(|join| join.parent == parent.table)
            .and_then(|join| join.parent_column_of(&child.column))
            .map(|column| column == parent.column)
            .unwrap_or_default()
    }
}

/// Whether a condition other than the group join ones references a table
/// under `subtree`.
fn references(join: &JoinNode, subtree: &Joinable) -> bool {
    let sources = subtree.sources();
    join.conditions
        .iter()
        .filter(|it| !it.is_group_join())
        .any(|it| Joinable::references_any(&it.expr, &sources).unwrap_or(true))
}

/// Attaches `child` under the node of its recorded parent table, keeping
/// siblings in ordinal order. Hands the child back when the parent isn't
/// in the tree.
fn splice(
    parent: &mut TableGroupJoinNode,
    child: TableGroupJoinNode,
) -> std::result::Result<(), TableGroupJoinNode> {
    let Some(lineage) = child.table.parent.clone() else {
        return Err(child);
    };
    match parent.find_table_mut(&lineage) {
        Some(node) => {
            node.add_child(child);
            Ok(())
        }
        None => Err(child),
    }
}

fn reject(join: &mut JoinNode, rejection: Rejection, left: TableGroupJoinNode, right: TableGroupJoinNode) {
    debug!("not coalescing {} with {}: {}", left.table, right.table, rejection);
    wrap(join, Some(left), Some(right));
}

/// Puts the resolved inputs of a join back as group join boundaries. The
/// join stays a plain join, so none of its conditions is answered by the
/// clustering any more.
fn wrap(join: &mut JoinNode, left: Option<TableGroupJoinNode>, right: Option<TableGroupJoinNode>) {
    for condition in join.conditions.iter_mut() {
        condition.implementation = Implementation::Normal;
    }
    if let Some(left) = left {
        join.set_left(Joinable::GroupJoinTree(TableGroupJoinTree::new(left)));
    }
    if let Some(right) = right {
        join.set_right(Joinable::GroupJoinTree(TableGroupJoinTree::new(right)));
    }
}
