//! Integer arithmetic over numeric operands.

use std::fmt;

use crate::{
    errors::{BindingError, EvalError},
    node::{Node, fmt_operand},
    reference::Resolver,
    types::Type,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Pow => "^",
        }
    }

    pub fn phrase(self) -> &'static str {
        match self {
            Operator::Add => "plus",
            Operator::Sub => "minus",
            Operator::Mul => "times",
            Operator::Div => "divided by",
            Operator::Mod => "modulo",
            Operator::Pow => "to the power of",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArithmeticNode {
    operator: Operator,
    lhs: Box<Node>,
    rhs: Box<Node>,
    ty: Type,
}

impl ArithmeticNode {
    pub fn create(operator: Operator, lhs: Node, rhs: Node) -> Result<Self, BindingError> {
        let lhs = numeric_operand(lhs)?;
        let rhs = numeric_operand(rhs)?;
        let ty = lhs.ty().promote(&rhs.ty());

        Ok(ArithmeticNode {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
        })
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn lhs(&self) -> &Node {
        &self.lhs
    }

    pub fn rhs(&self) -> &Node {
        &self.rhs
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn eval(&self, resolver: &dyn Resolver) -> Result<Value, EvalError> {
        let a = integral(self.lhs.eval(resolver)?)?;
        let b = integral(self.rhs.eval(resolver)?)?;

        let result = match self.operator {
            Operator::Add => a.checked_add(b),
            Operator::Sub => a.checked_sub(b),
            Operator::Mul => a.checked_mul(b),
            Operator::Div | Operator::Mod if b == 0 => {
                return Err(EvalError::DivisionByZero(self.to_string()));
            }
            Operator::Div => a.checked_div(b),
            Operator::Mod => a.checked_rem(b),
            Operator::Pow if b < 0 => return Err(EvalError::NegativeExponent(self.to_string())),
            Operator::Pow => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
        };

        result
            .and_then(|value| Value::integral(&self.ty, value))
            .ok_or_else(|| EvalError::Overflow(self.to_string()))
    }

    pub(crate) fn map(&self, f: impl Fn(&Node) -> Node) -> Self {
        ArithmeticNode {
            operator: self.operator,
            lhs: Box::new(f(&self.lhs)),
            rhs: Box::new(f(&self.rhs)),
            ty: self.ty.clone(),
        }
    }

    /// Rebuilds the node from transformed children, deriving the result type
    /// again.
    pub(crate) fn rebuild(
        &self,
        f: impl Fn(&Node) -> Result<Node, BindingError>,
    ) -> Result<Self, BindingError> {
        ArithmeticNode::create(self.operator, f(&self.lhs)?, f(&self.rhs)?)
    }
}

fn numeric_operand(node: Node) -> Result<Node, BindingError> {
    let ty = node.ty();
    if ty.is_numeric() {
        return Ok(node);
    }

    if let Node::Reference(reference) = &node {
        if let Some(narrowed) = reference.narrow(&Type::Number) {
            return Ok(Node::Reference(narrowed));
        }
    }

    Err(BindingError::NotNumeric(node.to_string()))
}

fn integral(value: Value) -> Result<i64, EvalError> {
    value.as_i64().ok_or_else(|| EvalError::TypeMismatch {
        expected: "integral",
        found: value.ty(),
    })
}

impl fmt::Display for ArithmeticNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_operand(&self.lhs, f)?;
        write!(f, " {} ", self.operator.symbol())?;
        fmt_operand(&self.rhs, f)
    }
}
