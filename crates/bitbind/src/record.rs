//! Named composites whose fields are decoded in declaration order.

use std::{
    fmt::{self, Write},
    sync::Arc,
};

use bitbind_el::{Describe, Expression, Operator, Resolver, Type, Value, article};

use crate::{
    bits::{BitReader, BitSink},
    codec::{Builder, Codec, combine},
    errors::{DecodeError, DecodeErrorKind, EncodeError},
    resolver::RecordResolver,
};

/// Decodes each field with the fields before it in scope.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    name: Arc<str>,
    fields: Vec<(String, Arc<dyn Codec>)>,
}

impl RecordCodec {
    pub fn new(name: &str, fields: Vec<(String, Arc<dyn Codec>)>) -> Self {
        RecordCodec {
            name: Arc::from(name),
            fields,
        }
    }

    pub fn with_field(mut self, field: &str, codec: Arc<dyn Codec>) -> Self {
        self.fields.push((field.to_string(), codec));
        self
    }

    pub fn record_name(&self) -> &str {
        &self.name
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == field)
    }
}

impl Codec for RecordCodec {
    fn decode(
        &self,
        reader: &mut BitReader<'_>,
        resolver: &dyn Resolver,
        builder: &dyn Builder,
    ) -> Result<Value, DecodeError> {
        let mut record = builder.create(&self.name);
        if record.name() != &*self.name {
            return Err(DecodeError::new(
                self.name(),
                reader.position(),
                DecodeErrorKind::WrongBuilderResult {
                    expected: self.name.to_string(),
                    found: record.name().to_string(),
                },
            ));
        }

        for (field, codec) in &self.fields {
            let value = {
                let scope = RecordResolver::new(&record, resolver);
                codec.decode(reader, &scope, builder)?
            };
            record.set(field, value);
        }

        Ok(Value::Record(record))
    }

    fn encode(
        &self,
        value: &Value,
        sink: &mut dyn BitSink,
        resolver: &dyn Resolver,
    ) -> Result<(), EncodeError> {
        let record = match value {
            Value::Record(record) if record.name() == &*self.name => record,
            other => {
                return Err(EncodeError::InvalidValue {
                    codec: self.name(),
                    expected: self.ty(),
                    found: other.ty(),
                });
            }
        };

        let scope = RecordResolver::new(record, resolver);
        for (field, codec) in &self.fields {
            let value = record.get(field).ok_or_else(|| EncodeError::MissingField {
                codec: self.name(),
                field: field.clone(),
            })?;
            codec.encode(value, sink, &scope)?;
        }

        Ok(())
    }

    fn size(&self) -> Option<Expression<i64>> {
        let mut total = Expression::<i64>::constant(0);
        for (_, codec) in &self.fields {
            let size = codec.size().filter(|size| !size.is_parameterized())?;
            total = combine(Operator::Add, &total, &size)?;
        }
        Some(total)
    }

    fn ty(&self) -> Type {
        Type::Record(Arc::clone(&self.name))
    }

    fn name(&self) -> String {
        format!("record codec for {}", self.name)
    }
}

impl Describe for RecordCodec {
    fn describe(&self, out: &mut dyn Write) -> fmt::Result {
        write!(out, "{} {} made of ", article(&self.name), self.name)?;
        for (i, (field, _)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            out.write_str(field)?;
        }
        Ok(())
    }
}
