//! Comparisons between two operands of a common ordered type.

use std::{cmp::Ordering, fmt};

use crate::{
    errors::{BindingError, EvalError, UnsupportedOperation},
    node::{Node, fmt_operand},
    reference::Resolver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Gt,
    Gte,
    Eq,
    Lt,
    Lte,
}

impl Relation {
    /// Whether the relation holds for the three-way comparison `lhs.cmp(rhs)`.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Relation::Gt => ordering == Ordering::Greater,
            Relation::Gte => ordering != Ordering::Less,
            Relation::Eq => ordering == Ordering::Equal,
            Relation::Lt => ordering == Ordering::Less,
            Relation::Lte => ordering != Ordering::Greater,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Gt => ">",
            Relation::Gte => ">=",
            Relation::Eq => "==",
            Relation::Lt => "<",
            Relation::Lte => "<=",
        }
    }

    pub fn phrase(self) -> &'static str {
        match self {
            Relation::Gt => "is greater than",
            Relation::Gte => "is greater than or equal to",
            Relation::Eq => "equals",
            Relation::Lt => "is less than",
            Relation::Lte => "is less than or equal to",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationalNode {
    relation: Relation,
    lhs: Box<Node>,
    rhs: Box<Node>,
}

impl RelationalNode {
    /// Builds the comparison, narrowing a bare reference operand to the type
    /// of the other side when the two differ.
    pub fn create(relation: Relation, lhs: Node, rhs: Node) -> Result<Self, BindingError> {
        let (lhs, rhs) = unify(lhs, rhs);

        if !lhs.ty().common_supertype(&rhs.ty()).is_ordered() {
            return Err(BindingError::Incompatible {
                lhs: lhs.to_string(),
                rhs: rhs.to_string(),
            });
        }

        Ok(RelationalNode {
            relation,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn lhs(&self) -> &Node {
        &self.lhs
    }

    pub fn rhs(&self) -> &Node {
        &self.rhs
    }

    pub fn eval(&self, resolver: &dyn Resolver) -> Result<bool, EvalError> {
        let lhs = self.lhs.eval(resolver)?;
        let rhs = self.rhs.eval(resolver)?;

        let ordering = lhs.compare(&rhs).ok_or_else(|| EvalError::Incomparable {
            lhs: lhs.ty(),
            rhs: rhs.ty(),
        })?;

        Ok(self.relation.holds(ordering))
    }

    /// For a relation of the form `reference == constant`, the constant as an
    /// integer.
    pub fn expected_value(&self, resolver: &dyn Resolver) -> Result<i64, UnsupportedOperation> {
        if self.relation == Relation::Eq && matches!(*self.lhs, Node::Reference(_)) {
            if let Some(expected) = self.rhs.eval(resolver).ok().and_then(|v| v.as_i64()) {
                return Ok(expected);
            }
        }

        Err(UnsupportedOperation(format!(
            "no expected value can be derived from `{self}`"
        )))
    }

    pub(crate) fn map(&self, f: impl Fn(&Node) -> Node) -> Self {
        RelationalNode {
            relation: self.relation,
            lhs: Box::new(f(&self.lhs)),
            rhs: Box::new(f(&self.rhs)),
        }
    }

    /// Rebuilds the comparison from transformed children, unifying them again.
    pub(crate) fn rebuild(
        &self,
        f: impl Fn(&Node) -> Result<Node, BindingError>,
    ) -> Result<Self, BindingError> {
        RelationalNode::create(self.relation, f(&self.lhs)?, f(&self.rhs)?)
    }
}

fn unify(lhs: Node, rhs: Node) -> (Node, Node) {
    let (lhs_ty, rhs_ty) = (lhs.ty(), rhs.ty());
    if lhs_ty == rhs_ty {
        return (lhs, rhs);
    }

    if let Node::Reference(reference) = &rhs {
        if let Some(narrowed) = reference.narrow(&lhs_ty) {
            return (lhs, Node::Reference(narrowed));
        }
    }

    if let Node::Reference(reference) = &lhs {
        if let Some(narrowed) = reference.narrow(&rhs_ty) {
            return (Node::Reference(narrowed), rhs);
        }
    }

    (lhs, rhs)
}

impl fmt::Display for RelationalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_operand(&self.lhs, f)?;
        write!(f, " {} ", self.relation.symbol())?;
        fmt_operand(&self.rhs, f)
    }
}
