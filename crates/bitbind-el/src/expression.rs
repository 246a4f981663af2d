//! Typed wrapper over [`Node`] for the two result types codecs consume:
//! integral sizes and boolean conditions.

use std::{collections::BTreeSet, fmt, marker::PhantomData};

use crate::{
    errors::{BindingError, EvalError, UnsupportedOperation},
    node::Node,
    reference::{EmptyResolver, Reference, ReferenceContext, Resolver},
    types::Type,
    value::Value,
};

/// Rust type an [`Expression`] evaluates to.
pub trait ExpressionType: Sized {
    const DESCRIPTION: &'static str;

    /// Type a bare `Any` reference is narrowed to.
    const NARROWED: Type;

    fn accepts(ty: &Type) -> bool;

    fn from_value(value: Value) -> Result<Self, EvalError>;
}

impl ExpressionType for i64 {
    const DESCRIPTION: &'static str = "integral";
    const NARROWED: Type = Type::Number;

    fn accepts(ty: &Type) -> bool {
        ty.is_numeric()
    }

    fn from_value(value: Value) -> Result<Self, EvalError> {
        value.as_i64().ok_or_else(|| EvalError::TypeMismatch {
            expected: Self::DESCRIPTION,
            found: value.ty(),
        })
    }
}

impl ExpressionType for bool {
    const DESCRIPTION: &'static str = "boolean";
    const NARROWED: Type = Type::Bool;

    fn accepts(ty: &Type) -> bool {
        *ty == Type::Bool
    }

    fn from_value(value: Value) -> Result<Self, EvalError> {
        value.as_bool().ok_or_else(|| EvalError::TypeMismatch {
            expected: Self::DESCRIPTION,
            found: value.ty(),
        })
    }
}

/// An expression tree known to produce a `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression<T> {
    node: Node,
    marker: PhantomData<fn() -> T>,
}

impl<T: ExpressionType> Expression<T> {
    pub fn new(node: Node) -> Result<Self, BindingError> {
        let node = match node {
            Node::Reference(reference) if !T::accepts(reference.ty()) => reference
                .narrow(&T::NARROWED)
                .map(Node::Reference)
                .unwrap_or(Node::Reference(reference)),
            other => other,
        };

        let ty = node.ty();
        if !T::accepts(&ty) {
            return Err(BindingError::WrongType {
                expected: T::DESCRIPTION,
                found: ty,
                expression: node.to_string(),
            });
        }

        Ok(Expression {
            node,
            marker: PhantomData,
        })
    }

    pub fn eval(&self, resolver: &dyn Resolver) -> Result<T, EvalError> {
        T::from_value(self.node.eval(resolver)?)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    pub fn ty(&self) -> Type {
        self.node.ty()
    }

    pub fn simplify(&self) -> Self {
        Expression {
            node: self.node.simplify(),
            marker: PhantomData,
        }
    }

    pub fn gather(&self, references: &mut BTreeSet<Reference>) {
        self.node.gather(references);
    }

    pub fn is_parameterized(&self) -> bool {
        self.node.is_parameterized()
    }

    pub fn is_constant_for(&self, context: &dyn ReferenceContext) -> bool {
        self.node.is_constant_for(context)
    }

    /// Rebinds every reference in `context`, checking the result type again.
    pub fn rescope(&self, context: &dyn ReferenceContext) -> Result<Self, BindingError> {
        Expression::new(self.node.rescope(context)?)
    }

    /// The value when the expression needs no resolver.
    pub fn constant_value(&self) -> Option<T> {
        if self.is_parameterized() {
            return None;
        }
        self.eval(&EmptyResolver).ok()
    }
}

impl Expression<i64> {
    pub fn constant(value: i64) -> Self {
        let literal = match i32::try_from(value) {
            Ok(value) => Value::Int(value),
            Err(_) => Value::Long(value),
        };

        Expression {
            node: Node::Literal(literal),
            marker: PhantomData,
        }
    }
}

impl Expression<bool> {
    pub fn constant(value: bool) -> Self {
        Expression {
            node: Node::bool(value),
            marker: PhantomData,
        }
    }

    /// The literal a `reference == literal` condition selects on.
    pub fn expected_value(&self, resolver: &dyn Resolver) -> Result<i64, UnsupportedOperation> {
        match &self.node {
            Node::Relational(node) => node.expected_value(resolver),
            other => Err(UnsupportedOperation(format!(
                "no expected value can be derived from `{other}`"
            ))),
        }
    }
}

impl<T> fmt::Display for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        arithmetic::Operator,
        reference::Scope,
        relational::Relation,
    };

    use super::*;

    #[test]
    fn test_type_checked_on_construction() {
        let condition = Node::relational(Relation::Eq, Node::int(1), Node::int(1)).unwrap();
        assert!(Expression::<bool>::new(condition.clone()).is_ok());

        let err = Expression::<i64>::new(condition).unwrap_err();
        assert_eq!(
            err,
            BindingError::WrongType {
                expected: "integral",
                found: Type::Bool,
                expression: "1 == 1".to_string(),
            }
        );
    }

    #[test]
    fn test_any_reference_is_narrowed() {
        let scope = Scope::new("Frame").with_field("length", Type::Any);
        let size = Expression::<i64>::new(Node::reference(&scope, "length").unwrap()).unwrap();
        assert_eq!(size.ty(), Type::Number);
    }

    #[test]
    fn test_constant_value() {
        let scope = Scope::new("Frame").with_field("length", Type::Int);
        let size = Expression::<i64>::new(
            Node::arithmetic(Operator::Mul, Node::int(4), Node::int(8)).unwrap(),
        )
        .unwrap();
        assert_eq!(size.constant_value(), Some(32));
        assert_eq!(size.simplify(), Expression::<i64>::constant(32));

        let dynamic = Expression::<i64>::new(Node::reference(&scope, "length").unwrap()).unwrap();
        assert_eq!(dynamic.constant_value(), None);
    }

    #[test]
    fn test_constant_widens_to_long() {
        assert_eq!(Expression::<i64>::constant(1 << 40).ty(), Type::Long);
        assert_eq!(Expression::<i64>::constant(16).ty(), Type::Int);
    }

    #[test]
    fn test_expected_value_requires_relation() {
        let condition = Expression::<bool>::constant(true);
        assert_eq!(
            condition.expected_value(&EmptyResolver),
            Err(UnsupportedOperation(
                "no expected value can be derived from `true`".to_string()
            ))
        );
    }
}
