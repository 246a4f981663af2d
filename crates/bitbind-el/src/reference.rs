//! Name resolution: the runtime [`Resolver`] seam and the compile-time
//! [`ReferenceContext`] used to bind names in expressions.

use std::{fmt, sync::Arc};

use crate::{
    errors::{BindingError, EvalError},
    types::Type,
    value::Value,
};

/// Read-only name lookup available while a composite value is decoded or encoded.
pub trait Resolver {
    fn get(&self, name: &str) -> Option<Value>;

    /// The enclosing scope, if any.
    fn outer(&self) -> Option<&dyn Resolver>;
}

/// Resolver with nothing in scope. Used as the root of a call and for
/// constant folding.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResolver;

impl Resolver for EmptyResolver {
    fn get(&self, _name: &str) -> Option<Value> {
        None
    }

    fn outer(&self) -> Option<&dyn Resolver> {
        None
    }
}

/// Compile-time view of the names an expression may refer to.
pub trait ReferenceContext {
    fn name(&self) -> &str;

    fn select(&self, name: &str) -> Result<Reference, BindingError>;
}

/// A name bound to a field of some scope, `depth` scopes out from where the
/// expression is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reference {
    name: String,
    ty: Type,
    scope: String,
    depth: usize,
}

impl Reference {
    pub fn new(name: &str, ty: Type, scope: &str, depth: usize) -> Self {
        Reference {
            name: name.to_string(),
            ty,
            scope: scope.to_string(),
            depth,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Name of the scope owning the referenced field.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The same reference viewed as the more specific type `ty`.
    pub fn narrow(&self, ty: &Type) -> Option<Reference> {
        if !self.ty.is_assignable_from(ty) {
            return None;
        }

        Some(Reference {
            ty: ty.clone(),
            ..self.clone()
        })
    }

    pub fn resolve(&self, resolver: &dyn Resolver) -> Result<Value, EvalError> {
        let mut current = resolver;
        for _ in 0..self.depth {
            current = current
                .outer()
                .ok_or_else(|| EvalError::Unresolved(self.to_string()))?;
        }

        current
            .get(&self.name)
            .ok_or_else(|| EvalError::Unresolved(self.to_string()))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str("outer.")?;
        }
        f.write_str(&self.name)
    }
}

/// A named set of typed fields, optionally nested in an enclosing scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    name: String,
    fields: Vec<(String, Type)>,
    outer: Option<Arc<Scope>>,
}

impl Scope {
    pub fn new(name: &str) -> Self {
        Scope {
            name: name.to_string(),
            fields: Vec::new(),
            outer: None,
        }
    }

    pub fn with_field(mut self, name: &str, ty: Type) -> Self {
        self.fields.push((name.to_string(), ty));
        self
    }

    pub fn within(mut self, outer: Arc<Scope>) -> Self {
        self.outer = Some(outer);
        self
    }

    pub fn field_type(&self, name: &str) -> Option<&Type> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }

    pub fn outer(&self) -> Option<&Scope> {
        self.outer.as_deref()
    }
}

impl ReferenceContext for Scope {
    fn name(&self) -> &str {
        &self.name
    }

    fn select(&self, name: &str) -> Result<Reference, BindingError> {
        let mut scope = Some(self);
        let mut depth = 0;

        while let Some(current) = scope {
            if let Some(ty) = current.field_type(name) {
                return Ok(Reference::new(name, ty.clone(), &current.name, depth));
            }
            scope = current.outer();
            depth += 1;
        }

        Err(BindingError::UnknownReference {
            name: name.to_string(),
            scope: self.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fields<'a> {
        values: Vec<(&'static str, Value)>,
        outer: Option<&'a dyn Resolver>,
    }

    impl Resolver for Fields<'_> {
        fn get(&self, name: &str) -> Option<Value> {
            self.values
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, value)| value.clone())
        }

        fn outer(&self) -> Option<&dyn Resolver> {
            self.outer
        }
    }

    #[test]
    fn test_select_walks_outer_scopes() {
        let message = Arc::new(Scope::new("Message").with_field("length", Type::Int));
        let body = Scope::new("Body").with_field("kind", Type::Byte).within(message);

        let kind = body.select("kind").unwrap();
        assert_eq!((kind.depth(), kind.scope()), (0, "Body"));

        let length = body.select("length").unwrap();
        assert_eq!((length.depth(), length.scope()), (1, "Message"));
        assert_eq!(length.to_string(), "outer.length");

        assert_eq!(
            body.select("missing").unwrap_err(),
            BindingError::UnknownReference {
                name: "missing".to_string(),
                scope: "Body".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_follows_depth() {
        let outer = Fields {
            values: vec![("length", Value::Int(7))],
            outer: None,
        };
        let inner = Fields {
            values: vec![("length", Value::Int(1))],
            outer: Some(&outer),
        };

        let reference = Reference::new("length", Type::Int, "Message", 1);
        assert_eq!(reference.resolve(&inner), Ok(Value::Int(7)));
        assert_eq!(
            reference.resolve(&outer),
            Err(EvalError::Unresolved("outer.length".to_string()))
        );
    }

    #[test]
    fn test_narrow() {
        let reference = Reference::new("value", Type::Any, "Frame", 0);
        assert_eq!(reference.narrow(&Type::Int).unwrap().ty(), &Type::Int);
        assert!(Reference::new("n", Type::Int, "Frame", 0).narrow(&Type::Long).is_none());
    }
}
