//! The expression AST.
//!
//! Trees are immutable once built: [`Node::simplify`] and [`Node::rescope`]
//! return new trees.

use std::{collections::BTreeSet, fmt};

use crate::{
    arithmetic::{ArithmeticNode, Operator},
    errors::{BindingError, EvalError},
    logical::LogicalNode,
    reference::{EmptyResolver, Reference, ReferenceContext, Resolver},
    relational::{Relation, RelationalNode},
    types::Type,
    value::Value,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Literal(Value),
    Reference(Reference),
    Arithmetic(ArithmeticNode),
    Relational(RelationalNode),
    Logical(LogicalNode),
}

impl Node {
    pub fn literal(value: impl Into<Value>) -> Self {
        Node::Literal(value.into())
    }

    pub fn int(value: i32) -> Self {
        Node::Literal(Value::Int(value))
    }

    pub fn long(value: i64) -> Self {
        Node::Literal(Value::Long(value))
    }

    pub fn bool(value: bool) -> Self {
        Node::Literal(Value::Bool(value))
    }

    /// Binds `name` in `context`.
    pub fn reference(context: &dyn ReferenceContext, name: &str) -> Result<Self, BindingError> {
        context.select(name).map(Node::Reference)
    }

    pub fn relational(relation: Relation, lhs: Node, rhs: Node) -> Result<Self, BindingError> {
        RelationalNode::create(relation, lhs, rhs).map(Node::Relational)
    }

    pub fn arithmetic(operator: Operator, lhs: Node, rhs: Node) -> Result<Self, BindingError> {
        ArithmeticNode::create(operator, lhs, rhs).map(Node::Arithmetic)
    }

    pub fn and(lhs: Node, rhs: Node) -> Result<Self, BindingError> {
        LogicalNode::and(lhs, rhs).map(Node::Logical)
    }

    pub fn or(lhs: Node, rhs: Node) -> Result<Self, BindingError> {
        LogicalNode::or(lhs, rhs).map(Node::Logical)
    }

    pub fn not(operand: Node) -> Result<Self, BindingError> {
        LogicalNode::not(operand).map(Node::Logical)
    }

    pub fn eval(&self, resolver: &dyn Resolver) -> Result<Value, EvalError> {
        match self {
            Node::Literal(value) => Ok(value.clone()),
            Node::Reference(reference) => reference.resolve(resolver),
            Node::Arithmetic(node) => node.eval(resolver),
            Node::Relational(node) => node.eval(resolver).map(Value::Bool),
            Node::Logical(node) => node.eval(resolver).map(Value::Bool),
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Node::Literal(value) => value.ty(),
            Node::Reference(reference) => reference.ty().clone(),
            Node::Arithmetic(node) => node.ty().clone(),
            Node::Relational(_) | Node::Logical(_) => Type::Bool,
        }
    }

    /// True iff evaluation depends on a resolver.
    pub fn is_parameterized(&self) -> bool {
        match self {
            Node::Literal(_) => false,
            Node::Reference(_) => true,
            Node::Arithmetic(node) => node.lhs().is_parameterized() || node.rhs().is_parameterized(),
            Node::Relational(node) => node.lhs().is_parameterized() || node.rhs().is_parameterized(),
            Node::Logical(node) => node.operands().any(Node::is_parameterized),
        }
    }

    /// True iff no reference in the tree is bound to a field owned by `context`.
    pub fn is_constant_for(&self, context: &dyn ReferenceContext) -> bool {
        let mut references = BTreeSet::new();
        self.gather(&mut references);
        references
            .iter()
            .all(|reference| reference.scope() != context.name())
    }

    /// Collects every reference the tree depends on.
    pub fn gather(&self, references: &mut BTreeSet<Reference>) {
        match self {
            Node::Literal(_) => {}
            Node::Reference(reference) => {
                references.insert(reference.clone());
            }
            Node::Arithmetic(node) => {
                node.lhs().gather(references);
                node.rhs().gather(references);
            }
            Node::Relational(node) => {
                node.lhs().gather(references);
                node.rhs().gather(references);
            }
            Node::Logical(node) => node.operands().for_each(|operand| operand.gather(references)),
        }
    }

    /// Folds every non-parameterized subtree into a literal.
    ///
    /// A subtree that fails to evaluate is kept as is so the failure shows up
    /// when the expression is evaluated.
    pub fn simplify(&self) -> Node {
        if let Node::Literal(_) | Node::Reference(_) = self {
            return self.clone();
        }

        if !self.is_parameterized() {
            if let Ok(value) = self.eval(&EmptyResolver) {
                return Node::Literal(value);
            }
        }

        match self {
            Node::Arithmetic(node) => Node::Arithmetic(node.map(Node::simplify)),
            Node::Relational(node) => Node::Relational(node.map(Node::simplify)),
            Node::Logical(node) => Node::Logical(node.map(Node::simplify)),
            Node::Literal(_) | Node::Reference(_) => self.clone(),
        }
    }

    /// Rebinds every reference by name in `context`.
    ///
    /// Composite nodes are rebuilt through their constructors, so the result
    /// matches a tree bound directly in `context`.
    pub fn rescope(&self, context: &dyn ReferenceContext) -> Result<Node, BindingError> {
        match self {
            Node::Literal(_) => Ok(self.clone()),
            Node::Reference(reference) => {
                let rebound = context.select(reference.name())?;
                let rebound = rebound.narrow(reference.ty()).unwrap_or(rebound);
                Ok(Node::Reference(rebound))
            }
            Node::Arithmetic(node) => node.rebuild(|child| child.rescope(context)).map(Node::Arithmetic),
            Node::Relational(node) => node.rebuild(|child| child.rescope(context)).map(Node::Relational),
            Node::Logical(node) => node.rebuild(|child| child.rescope(context)).map(Node::Logical),
        }
    }

    /// Whether the node renders as a single token.
    pub(crate) fn is_atom(&self) -> bool {
        matches!(self, Node::Literal(_) | Node::Reference(_))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(value) => write!(f, "{value}"),
            Node::Reference(reference) => write!(f, "{reference}"),
            Node::Arithmetic(node) => write!(f, "{node}"),
            Node::Relational(node) => write!(f, "{node}"),
            Node::Logical(node) => write!(f, "{node}"),
        }
    }
}

/// Renders `node`, parenthesized unless it is a single token.
pub(crate) fn fmt_operand(node: &Node, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if node.is_atom() {
        write!(f, "{node}")
    } else {
        write!(f, "({node})")
    }
}
