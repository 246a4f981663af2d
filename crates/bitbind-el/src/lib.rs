//! # bitbind-el
//!
//! The expression language behind `bitbind` codecs. Field widths, list
//! counts, expected values and union conditions are small typed expression
//! trees, bound against a compile-time [`ReferenceContext`] and evaluated
//! against a runtime [`Resolver`].
//!
//! ## Example
//!
//! ```
//! use bitbind_el::{EmptyResolver, Expression, Node, Relation, Scope, Type};
//!
//! let scope = Scope::new("Frame").with_field("prefix", Type::Long);
//! let condition = Expression::<bool>::new(
//!     Node::relational(
//!         Relation::Eq,
//!         Node::reference(&scope, "prefix").unwrap(),
//!         Node::int(0x18),
//!     )
//!     .unwrap(),
//! )
//! .unwrap();
//!
//! assert_eq!(condition.to_string(), "prefix == 24");
//! assert_eq!(condition.expected_value(&EmptyResolver), Ok(0x18));
//! ```

pub mod arithmetic;
pub mod document;
pub mod errors;
pub mod expression;
pub mod logical;
pub mod node;
pub mod reference;
pub mod relational;
pub mod types;
pub mod value;

pub use arithmetic::{ArithmeticNode, Operator};
pub use document::{Describe, article};
pub use errors::{BindingError, EvalError, UnsupportedOperation};
pub use expression::{Expression, ExpressionType};
pub use logical::LogicalNode;
pub use node::Node;
pub use reference::{EmptyResolver, Reference, ReferenceContext, Resolver, Scope};
pub use relational::{Relation, RelationalNode};
pub use types::Type;
pub use value::{Record, Value};
