//! Boolean connectives over conditions.

use std::fmt;

use crate::{
    errors::{BindingError, EvalError},
    node::{Node, fmt_operand},
    reference::Resolver,
    types::Type,
};

/// Boolean connectives. `And` and `Or` short-circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalNode {
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
}

impl LogicalNode {
    pub fn and(lhs: Node, rhs: Node) -> Result<Self, BindingError> {
        Ok(LogicalNode::And(
            Box::new(boolean_operand(lhs)?),
            Box::new(boolean_operand(rhs)?),
        ))
    }

    pub fn or(lhs: Node, rhs: Node) -> Result<Self, BindingError> {
        Ok(LogicalNode::Or(
            Box::new(boolean_operand(lhs)?),
            Box::new(boolean_operand(rhs)?),
        ))
    }

    pub fn not(operand: Node) -> Result<Self, BindingError> {
        Ok(LogicalNode::Not(Box::new(boolean_operand(operand)?)))
    }

    pub fn operands(&self) -> impl Iterator<Item = &Node> {
        let (first, second) = match self {
            LogicalNode::And(lhs, rhs) | LogicalNode::Or(lhs, rhs) => (lhs, Some(rhs)),
            LogicalNode::Not(operand) => (operand, None),
        };
        std::iter::once(&**first).chain(second.map(|rhs| &**rhs))
    }

    pub fn eval(&self, resolver: &dyn Resolver) -> Result<bool, EvalError> {
        match self {
            LogicalNode::And(lhs, rhs) => Ok(boolean(lhs, resolver)? && boolean(rhs, resolver)?),
            LogicalNode::Or(lhs, rhs) => Ok(boolean(lhs, resolver)? || boolean(rhs, resolver)?),
            LogicalNode::Not(operand) => Ok(!boolean(operand, resolver)?),
        }
    }

    pub(crate) fn map(&self, f: impl Fn(&Node) -> Node) -> Self {
        match self {
            LogicalNode::And(lhs, rhs) => LogicalNode::And(Box::new(f(lhs)), Box::new(f(rhs))),
            LogicalNode::Or(lhs, rhs) => LogicalNode::Or(Box::new(f(lhs)), Box::new(f(rhs))),
            LogicalNode::Not(operand) => LogicalNode::Not(Box::new(f(operand))),
        }
    }

    pub(crate) fn rebuild(
        &self,
        f: impl Fn(&Node) -> Result<Node, BindingError>,
    ) -> Result<Self, BindingError> {
        match self {
            LogicalNode::And(lhs, rhs) => LogicalNode::and(f(lhs)?, f(rhs)?),
            LogicalNode::Or(lhs, rhs) => LogicalNode::or(f(lhs)?, f(rhs)?),
            LogicalNode::Not(operand) => LogicalNode::not(f(operand)?),
        }
    }
}

fn boolean_operand(node: Node) -> Result<Node, BindingError> {
    if node.ty() == Type::Bool {
        return Ok(node);
    }

    if let Node::Reference(reference) = &node {
        if let Some(narrowed) = reference.narrow(&Type::Bool) {
            return Ok(Node::Reference(narrowed));
        }
    }

    Err(BindingError::NotBoolean(node.to_string()))
}

fn boolean(node: &Node, resolver: &dyn Resolver) -> Result<bool, EvalError> {
    let value = node.eval(resolver)?;
    value.as_bool().ok_or_else(|| EvalError::TypeMismatch {
        expected: "boolean",
        found: value.ty(),
    })
}

impl fmt::Display for LogicalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalNode::And(lhs, rhs) => {
                fmt_operand(lhs, f)?;
                f.write_str(" && ")?;
                fmt_operand(rhs, f)
            }
            LogicalNode::Or(lhs, rhs) => {
                fmt_operand(lhs, f)?;
                f.write_str(" || ")?;
                fmt_operand(rhs, f)
            }
            LogicalNode::Not(operand) => {
                f.write_str("!")?;
                fmt_operand(operand, f)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        reference::{EmptyResolver, Scope},
        relational::Relation,
        value::Value,
    };

    use super::*;

    #[test]
    fn test_short_circuit() {
        let scope = Scope::new("Frame").with_field("missing", Type::Bool);
        let unresolved = Node::reference(&scope, "missing").unwrap();

        let or = LogicalNode::or(Node::bool(true), unresolved.clone()).unwrap();
        assert_eq!(or.eval(&EmptyResolver), Ok(true));

        let and = LogicalNode::and(Node::bool(false), unresolved.clone()).unwrap();
        assert_eq!(and.eval(&EmptyResolver), Ok(false));

        let and = LogicalNode::and(Node::bool(true), unresolved).unwrap();
        assert_eq!(
            and.eval(&EmptyResolver),
            Err(EvalError::Unresolved("missing".to_string()))
        );
    }

    #[test]
    fn test_range_condition() {
        let low = Node::relational(Relation::Gte, Node::int(5), Node::int(1)).unwrap();
        let high = Node::relational(Relation::Lt, Node::int(5), Node::int(4)).unwrap();
        let range = LogicalNode::and(low, Node::not(high).unwrap()).unwrap();

        assert_eq!(range.eval(&EmptyResolver), Ok(true));
        assert_eq!(range.to_string(), "(5 >= 1) && (!(5 < 4))");
    }

    #[test]
    fn test_non_boolean_operand() {
        let err = LogicalNode::not(Node::literal(Value::Int(1))).unwrap_err();
        assert_eq!(err, BindingError::NotBoolean("1".to_string()));
    }
}
