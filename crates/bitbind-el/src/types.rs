//! Semantic types shared by expression nodes, values and codecs.

use std::{fmt, sync::Arc};

/// The semantic type of a value or expression.
///
/// Integral kinds (`Byte`, `Short`, `Int`, `Long`) all widen to [`Type::Number`];
/// every type widens to [`Type::Any`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    /// Common supertype of the integral kinds.
    Number,
    Text,
    /// A set of enum symbols.
    Set,
    List,
    Map,
    /// A named composite type.
    Record(Arc<str>),
    Any,
}

impl Type {
    pub fn record(name: &str) -> Self {
        Type::Record(Arc::from(name))
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Byte | Type::Short | Type::Int | Type::Long)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integral() || *self == Type::Number
    }

    /// Whether values of this type have a native total ordering.
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || matches!(self, Type::Bool | Type::Text)
    }

    /// Whether a value of type `other` can stand in for a value of this type.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        self == other || *self == Type::Any || (*self == Type::Number && other.is_integral())
    }

    /// Nearest type both `self` and `other` widen to.
    pub fn common_supertype(&self, other: &Type) -> Type {
        if self.is_assignable_from(other) {
            self.clone()
        } else if other.is_assignable_from(self) {
            other.clone()
        } else if self.is_numeric() && other.is_numeric() {
            Type::Number
        } else {
            Type::Any
        }
    }

    /// Natural width in bits of an integral type.
    pub fn bits(&self) -> Option<u32> {
        match self {
            Type::Byte => Some(8),
            Type::Short => Some(16),
            Type::Int => Some(32),
            Type::Long => Some(64),
            _ => None,
        }
    }

    /// Result type of an arithmetic operation over two numeric operands.
    pub fn promote(&self, other: &Type) -> Type {
        let wide = |ty: &Type| matches!(ty, Type::Long | Type::Number);
        if wide(self) || wide(other) {
            Type::Long
        } else {
            Type::Int
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Byte => f.write_str("byte"),
            Type::Short => f.write_str("short"),
            Type::Int => f.write_str("int"),
            Type::Long => f.write_str("long"),
            Type::Number => f.write_str("number"),
            Type::Text => f.write_str("text"),
            Type::Set => f.write_str("set"),
            Type::List => f.write_str("list"),
            Type::Map => f.write_str("map"),
            Type::Record(name) => f.write_str(name),
            Type::Any => f.write_str("any"),
        }
    }
}
