use std::fmt::Display;
use std::fmt::Formatter;

use crate::apply_each;
use crate::catalog::name::TableName;
use crate::catalog::r#type::Value;
use crate::error::Result;
use crate::sql::plan::join::Joinable;
use crate::sql::plan::visitor::TreeNode;
use crate::sql::plan::visitor::VisitRecursion;

/// Identifies one table reference of a query. Two references to the same
/// table, e.g. a self join, get different ids.
pub type SourceId = usize;

/// A column bound to the table reference it was resolved against.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnExpr {
    pub source: SourceId,
    pub table: TableName,
    pub column: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::And => "AND",
            Operator::Or => "OR",
        };
        write!(f, "{op}")
    }
}

/// A binary expression such as `o.cid = c.cid`
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: Operator,
    pub right: Box<Expr>,
}

/// Resolved expressions, as handed over by the binder.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Column(ColumnExpr),
    Value(Value),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    BinaryExpr(BinaryExpr),
    /// EXISTS subquery
    Exists(Box<Joinable>),
    /// Scalar subquery, produce exactly one column and at most one row
    ScalarSubquery(Box<Joinable>),
}

impl Expr {
    pub fn column(source: SourceId, table: TableName, column: impl Into<String>) -> Expr {
        Expr::Column(ColumnExpr { source, table, column: column.into() })
    }

    pub fn binary(left: Expr, op: Operator, right: Expr) -> Expr {
        Expr::BinaryExpr(BinaryExpr { left: Box::new(left), op, right: Box::new(right) })
    }

    pub fn eq(left: Expr, right: Expr) -> Expr {
        Expr::binary(left, Operator::Eq, right)
    }

    /// The plans of the subqueries nested in this expression.
    pub fn subqueries(&self) -> Vec<&Joinable> {
        fn collect<'a>(expr: &'a Expr, out: &mut Vec<&'a Joinable>) {
            match expr {
                Expr::Exists(plan) | Expr::ScalarSubquery(plan) => out.push(plan),
                Expr::Not(expr) | Expr::IsNull(expr) => collect(expr, out),
                Expr::BinaryExpr(BinaryExpr { left, right, .. }) => {
                    collect(left, out);
                    collect(right, out);
                }
                Expr::Column(_) | Expr::Value(_) => {}
            }
        }
        let mut out = vec![];
        collect(self, &mut out);
        out
    }

    /// The two columns of an `a = b` comparison.
    pub fn as_column_equality(&self) -> Option<(&ColumnExpr, &ColumnExpr)> {
        match self {
            Expr::BinaryExpr(BinaryExpr { left, op: Operator::Eq, right }) => {
                match (left.as_ref(), right.as_ref()) {
                    (Expr::Column(l), Expr::Column(r)) => Some((l, r)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Subqueries are leaves here, their plans are visited by the join tree.
impl TreeNode for Expr {
    fn visit_children<F>(&self, mut f: F) -> Result<VisitRecursion>
    where
        F: FnMut(&Self) -> Result<VisitRecursion>,
    {
        match self {
            Expr::Not(expr) | Expr::IsNull(expr) => f(expr),
            Expr::BinaryExpr(BinaryExpr { left, right, .. }) => apply_each!(f, left, right),
            Expr::Column(_) | Expr::Value(_) | Expr::Exists(_) | Expr::ScalarSubquery(_) => {
                Ok(VisitRecursion::Continue)
            }
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Column(ColumnExpr { table, column, .. }) => write!(f, "{}.{}", table.table, column),
            Expr::Value(v) => write!(f, "{v}"),
            Expr::Not(expr) => write!(f, "NOT {expr}"),
            Expr::IsNull(expr) => write!(f, "{expr} IS NULL"),
            Expr::BinaryExpr(BinaryExpr { left, op, right }) => write!(f, "{left} {op} {right}"),
            Expr::Exists(_) => write!(f, "EXISTS (<subquery>)"),
            Expr::ScalarSubquery(_) => write!(f, "(<subquery>)"),
        }
    }
}

/// How a join condition is evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Implementation {
    Normal,
    /// The condition is the child to parent column equality of a group
    /// join and is answered by the physical clustering.
    GroupJoin,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConditionExpr {
    pub expr: Expr,
    pub implementation: Implementation,
}

impl ConditionExpr {
    pub fn new(expr: Expr) -> ConditionExpr {
        ConditionExpr { expr, implementation: Implementation::Normal }
    }

    pub fn is_group_join(&self) -> bool {
        self.implementation == Implementation::GroupJoin
    }
}

impl Display for ConditionExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expr)?;
        if self.is_group_join() {
            write!(f, " [group]")?;
        }
        Ok(())
    }
}
