//! Counted sequences, and maps read as sequences of key/value entries.

use std::{
    fmt::{self, Write},
    sync::Arc,
};

use bitbind_el::{Describe, Expression, Operator, Record, Resolver, Type, Value};

use crate::{
    bits::{BitReader, BitSink},
    codec::{Builder, Codec, combine},
    errors::{CompileError, DecodeError, DecodeErrorKind, EncodeError},
    record::RecordCodec,
};

/// Field names an entry record must declare.
pub const KEY: &str = "key";
pub const VALUE: &str = "value";

fn eval_count(count: &Expression<i64>, resolver: &dyn Resolver) -> Result<i64, DecodeErrorKind> {
    match count.eval(resolver)? {
        n if n < 0 => Err(DecodeErrorKind::InvalidCount(n)),
        n => Ok(n),
    }
}

fn check_len(
    codec: &dyn Codec,
    count: &Expression<i64>,
    len: usize,
    resolver: &dyn Resolver,
) -> Result<(), EncodeError> {
    let expected = count
        .eval(resolver)
        .map_err(|e| EncodeError::eval(codec.name(), e))?;

    if usize::try_from(expected).ok() != Some(len) {
        return Err(EncodeError::LengthMismatch {
            codec: codec.name(),
            expected,
            found: len,
        });
    }

    Ok(())
}

/// `count(resolver)` elements, all decoded against the caller's resolver.
#[derive(Debug, Clone)]
pub struct ListCodec {
    element: Arc<dyn Codec>,
    count: Expression<i64>,
}

impl ListCodec {
    pub fn new(element: Arc<dyn Codec>, count: Expression<i64>) -> Self {
        ListCodec { element, count }
    }
}

impl Codec for ListCodec {
    fn decode(
        &self,
        reader: &mut BitReader<'_>,
        resolver: &dyn Resolver,
        builder: &dyn Builder,
    ) -> Result<Value, DecodeError> {
        let count = eval_count(&self.count, resolver)
            .map_err(|kind| DecodeError::new(self.name(), reader.position(), kind))?;

        let mut values = Vec::new();
        for _ in 0..count {
            values.push(self.element.decode(reader, resolver, builder)?);
        }

        Ok(Value::List(values))
    }

    fn encode(
        &self,
        value: &Value,
        sink: &mut dyn BitSink,
        resolver: &dyn Resolver,
    ) -> Result<(), EncodeError> {
        let Value::List(values) = value else {
            return Err(EncodeError::InvalidValue {
                codec: self.name(),
                expected: Type::List,
                found: value.ty(),
            });
        };

        check_len(self, &self.count, values.len(), resolver)?;
        for value in values {
            self.element.encode(value, sink, resolver)?;
        }

        Ok(())
    }

    fn size(&self) -> Option<Expression<i64>> {
        let element = self.element.size().filter(|size| !size.is_parameterized())?;
        combine(Operator::Mul, &self.count, &element)
    }

    fn ty(&self) -> Type {
        Type::List
    }

    fn name(&self) -> String {
        format!("list codec of {}", self.element.ty())
    }
}

impl Describe for ListCodec {
    fn describe(&self, out: &mut dyn Write) -> fmt::Result {
        write!(out, "a list of {} elements, as many as ", self.element.ty())?;
        self.count.describe(out)
    }
}

/// A map encoded as `count` entry records, each with a `key` and a `value`.
#[derive(Debug, Clone)]
pub struct MapCodec {
    entry: Arc<RecordCodec>,
    count: Expression<i64>,
}

impl MapCodec {
    pub fn new(entry: Arc<RecordCodec>, count: Expression<i64>) -> Result<Self, CompileError> {
        if !entry.has_field(KEY) || !entry.has_field(VALUE) {
            return Err(CompileError::NotAnEntry(entry.ty()));
        }
        Ok(MapCodec { entry, count })
    }
}

impl Codec for MapCodec {
    fn decode(
        &self,
        reader: &mut BitReader<'_>,
        resolver: &dyn Resolver,
        builder: &dyn Builder,
    ) -> Result<Value, DecodeError> {
        let count = eval_count(&self.count, resolver)
            .map_err(|kind| DecodeError::new(self.name(), reader.position(), kind))?;

        let mut entries = Vec::new();
        for _ in 0..count {
            let position = reader.position();
            let entry = self.entry.decode(reader, resolver, builder)?;
            let field = |name: &str| match &entry {
                Value::Record(record) => record.get(name).cloned(),
                _ => None,
            };

            let missing = |name: &str| {
                DecodeError::new(
                    self.name(),
                    position,
                    DecodeErrorKind::MissingField {
                        record: self.entry.record_name().to_string(),
                        field: name.to_string(),
                    },
                )
            };

            let key = field(KEY).ok_or_else(|| missing(KEY))?;
            let value = field(VALUE).ok_or_else(|| missing(VALUE))?;
            entries.push((key, value));
        }

        Ok(Value::Map(entries))
    }

    fn encode(
        &self,
        value: &Value,
        sink: &mut dyn BitSink,
        resolver: &dyn Resolver,
    ) -> Result<(), EncodeError> {
        let Value::Map(entries) = value else {
            return Err(EncodeError::InvalidValue {
                codec: self.name(),
                expected: Type::Map,
                found: value.ty(),
            });
        };

        check_len(self, &self.count, entries.len(), resolver)?;
        for (key, value) in entries {
            let entry = Record::new(self.entry.record_name())
                .with(KEY, key.clone())
                .with(VALUE, value.clone());
            self.entry.encode(&Value::Record(entry), sink, resolver)?;
        }

        Ok(())
    }

    fn size(&self) -> Option<Expression<i64>> {
        let entry = self.entry.size().filter(|size| !size.is_parameterized())?;
        combine(Operator::Mul, &self.count, &entry)
    }

    fn ty(&self) -> Type {
        Type::Map
    }

    fn name(&self) -> String {
        format!("map codec of {}", self.entry.record_name())
    }
}

impl Describe for MapCodec {
    fn describe(&self, out: &mut dyn Write) -> fmt::Result {
        write!(out, "a map of {} entries, as many as ", self.entry.record_name())?;
        self.count.describe(out)
    }
}
