use crate::error::Result;

/// Applies `$f` to each item in turn, stopping early when it returns
/// [`VisitRecursion::Stop`].
#[macro_export]
macro_rules! apply_each {
    ($f:expr; $ARRAY:expr) => {{
        let mut action: VisitRecursion = VisitRecursion::Continue;
        for it in $ARRAY.iter() {
            action = $f(it)?;
            match action {
                VisitRecursion::Continue | VisitRecursion::Jump => {}
                VisitRecursion::Stop => return Ok(VisitRecursion::Stop)
            }
        }
        Ok::<VisitRecursion, $crate::error::Error>(action)
    }};
    ($f:expr, $($x:expr),+ $(,)?) => {{
        let items = vec![$($x),+];
        let mut action: VisitRecursion = VisitRecursion::Continue;
        for it in items.iter() {
            action = $f(it)?;
            match action {
                VisitRecursion::Continue | VisitRecursion::Jump => {}
                VisitRecursion::Stop => return Ok(VisitRecursion::Stop)
            }
        }
        Ok::<VisitRecursion, $crate::error::Error>(action)
    }};
}

/// A node of a join tree or of an expression tree.
pub trait TreeNode: Sized {
    /// Visits the node with a [`TreeNodeVisitor`] in depth-first order.
    ///
    /// [`TreeNodeVisitor::enter()`] is called before the children are
    /// visited and [`TreeNodeVisitor::leave()`] after them.
    ///
    /// The higher-ranked bound lets the visitor accept nodes borrowed with
    /// any lifetime.
    fn visit<V>(&self, visitor: &mut V) -> Result<VisitRecursion>
    where
        V: for<'n> TreeNodeVisitor<'n, Node = Self>,
    {
        visitor
            .enter(self)?
            .when_children(|| self.visit_children(|c| c.visit(visitor)))?
            .when_parent(|| visitor.leave(self))
    }

    /// Depth-first walk calling `f` on each node before its children.
    fn walk<F>(&self, mut f: F) -> Result<VisitRecursion>
    where
        F: FnMut(&Self) -> Result<VisitRecursion>,
    {
        fn walk_impl<N: TreeNode, F>(node: &N, f: &mut F) -> Result<VisitRecursion>
        where
            F: FnMut(&N) -> Result<VisitRecursion>,
        {
            f(node)?.when_children(|| node.visit_children(|c| walk_impl(c, f)))
        }

        walk_impl(self, &mut f)
    }

    /// Applies `f` to the direct children of the node, not the node itself.
    fn visit_children<F>(&self, f: F) -> Result<VisitRecursion>
    where
        F: FnMut(&Self) -> Result<VisitRecursion>;
}

pub trait TreeNodeVisitor<'n> {
    type Node: TreeNode;

    fn enter(&mut self, _node: &'n Self::Node) -> Result<VisitRecursion> {
        Ok(VisitRecursion::Continue)
    }

    fn leave(&mut self, _node: &'n Self::Node) -> Result<VisitRecursion> {
        Ok(VisitRecursion::Continue)
    }
}

/// Drives the traversal: every visit hook returns one to tell the walk
/// where to go next.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum VisitRecursion {
    /// Continue with the next node.
    Continue,
    /// On enter, skip the children of the node and go straight to its
    /// `leave`. On leave, skip the `leave` of the ancestors up to the
    /// first one that still has unvisited children.
    Jump,
    /// Stop the traversal.
    Stop,
}

impl VisitRecursion {
    /// Runs `f` over the children unless the node asked to skip or stop.
    pub fn when_children<F>(self, f: F) -> Result<VisitRecursion>
    where
        F: FnOnce() -> Result<VisitRecursion>,
    {
        match self {
            VisitRecursion::Continue => f(),
            VisitRecursion::Jump => Ok(VisitRecursion::Continue),
            VisitRecursion::Stop => Ok(self),
        }
    }

    /// Runs `f` over the next sibling unless the traversal stopped.
    pub fn when_sibling<F>(self, f: F) -> Result<VisitRecursion>
    where
        F: FnOnce() -> Result<VisitRecursion>,
    {
        match self {
            VisitRecursion::Continue | VisitRecursion::Jump => f(),
            VisitRecursion::Stop => Ok(self),
        }
    }

    /// Runs `f` on the way back up unless the children jumped or stopped.
    pub fn when_parent<F>(self, f: F) -> Result<VisitRecursion>
    where
        F: FnOnce() -> Result<VisitRecursion>,
    {
        match self {
            VisitRecursion::Continue => f(),
            VisitRecursion::Jump | VisitRecursion::Stop => Ok(self),
        }
    }
}
