//! Resolvers created while composite values are decoded or encoded.

use bitbind_el::{Record, Resolver, Value};

/// Name reserved for the discriminant inside select-from conditions.
pub const PREFIX: &str = "prefix";

/// Exposes the fields of a record, falling back to the enclosing resolver
/// through `outer`.
pub struct RecordResolver<'a> {
    record: &'a Record,
    outer: &'a dyn Resolver,
}

impl<'a> RecordResolver<'a> {
    pub fn new(record: &'a Record, outer: &'a dyn Resolver) -> Self {
        RecordResolver { record, outer }
    }
}

impl Resolver for RecordResolver<'_> {
    fn get(&self, name: &str) -> Option<Value> {
        self.record.get(name).cloned()
    }

    fn outer(&self) -> Option<&dyn Resolver> {
        Some(self.outer)
    }
}

/// Transient scope holding a freshly read discriminant under [`PREFIX`].
pub struct PrefixResolver<'a> {
    prefix: Option<i64>,
    outer: &'a dyn Resolver,
}

impl<'a> PrefixResolver<'a> {
    /// `prefix` is at most 63 bits wide, so it converts to `Long` unchanged.
    pub fn new(prefix: u64, outer: &'a dyn Resolver) -> Self {
        PrefixResolver {
            prefix: Some(prefix as i64),
            outer,
        }
    }

    /// The same scope before a prefix exists, as seen while encoding.
    pub fn unread(outer: &'a dyn Resolver) -> Self {
        PrefixResolver {
            prefix: None,
            outer,
        }
    }
}

impl Resolver for PrefixResolver<'_> {
    fn get(&self, name: &str) -> Option<Value> {
        self.prefix
            .filter(|_| name == PREFIX)
            .map(Value::Long)
    }

    fn outer(&self) -> Option<&dyn Resolver> {
        Some(self.outer)
    }
}
