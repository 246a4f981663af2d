//! The [`Codec`] abstraction and whole-buffer entry points.

use std::{fmt, sync::Arc};

use bitbind_el::{EmptyResolver, EvalError, Expression, Node, Operator, Record, Resolver, Type, Value};

use crate::{
    bits::{BitReader, BitSink, BitWriter},
    errors::{CompileError, DecodeError, DecodeErrorKind, EncodeError},
};

/// Wire encoding of one type.
///
/// Codecs are built once and shared; every call brings its own stream and
/// resolver.
pub trait Codec: Send + Sync + fmt::Debug {
    fn decode(
        &self,
        reader: &mut BitReader<'_>,
        resolver: &dyn Resolver,
        builder: &dyn Builder,
    ) -> Result<Value, DecodeError>;

    /// Writes exactly `size(resolver)` bits.
    fn encode(
        &self,
        value: &Value,
        sink: &mut dyn BitSink,
        resolver: &dyn Resolver,
    ) -> Result<(), EncodeError>;

    /// Number of bits, or `None` when it cannot be predicted.
    fn size(&self) -> Option<Expression<i64>>;

    /// Primary type produced by [`Codec::decode`].
    fn ty(&self) -> Type;

    /// Every type [`Codec::decode`] may produce.
    fn types(&self) -> Vec<Type> {
        vec![self.ty()]
    }

    /// Short name used in error messages.
    fn name(&self) -> String;
}

/// Hands out codecs for semantic types on demand.
pub trait CodecSource: Send + Sync + fmt::Debug {
    fn codec_for(&self, ty: &Type) -> Result<Arc<dyn Codec>, CompileError>;

    /// Whether [`CodecSource::codec_for`] can serve `ty`, checked without
    /// building anything.
    fn supports(&self, ty: &Type) -> bool;
}

/// Creates the objects nested values are decoded into.
pub trait Builder {
    fn create(&self, name: &str) -> Record;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBuilder;

impl Builder for DefaultBuilder {
    fn create(&self, name: &str) -> Record {
        Record::new(name)
    }
}

/// Decodes one value from the start of `data`.
pub fn decode(codec: &dyn Codec, data: &[u8]) -> Result<Value, DecodeError> {
    let mut reader = BitReader::new(data);
    codec.decode(&mut reader, &EmptyResolver, &DefaultBuilder)
}

/// Encodes `value` into a fresh buffer, zero-padding the last byte.
pub fn encode(codec: &dyn Codec, value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut writer = BitWriter::new(Vec::new());
    codec.encode(value, &mut writer, &EmptyResolver)?;
    writer
        .finish()
        .map_err(|source| EncodeError::io(codec.name(), source))
}

/// Evaluates a size expression, rejecting widths the stream cannot handle.
pub(crate) fn eval_width(
    size: &Expression<i64>,
    resolver: &dyn Resolver,
) -> Result<u32, WidthError> {
    let bits = size.eval(resolver).map_err(WidthError::Eval)?;
    match u32::try_from(bits) {
        Ok(width) if width <= 64 => Ok(width),
        _ => Err(WidthError::Invalid(bits)),
    }
}

/// `lhs <operator> rhs`, folded when both sides are constant.
pub(crate) fn combine(
    operator: Operator,
    lhs: &Expression<i64>,
    rhs: &Expression<i64>,
) -> Option<Expression<i64>> {
    let node = Node::arithmetic(operator, lhs.node().clone(), rhs.node().clone()).ok()?;
    Expression::new(node).ok().map(|size| size.simplify())
}

pub(crate) enum WidthError {
    Eval(EvalError),
    Invalid(i64),
}

impl WidthError {
    pub(crate) fn decoding(self, codec: String, position: usize) -> DecodeError {
        match self {
            WidthError::Eval(err) => DecodeError::new(codec, position, err),
            WidthError::Invalid(size) => {
                DecodeError::new(codec, position, DecodeErrorKind::InvalidSize(size))
            }
        }
    }

    pub(crate) fn encoding(self, codec: String) -> EncodeError {
        match self {
            WidthError::Eval(err) => EncodeError::eval(codec, err),
            WidthError::Invalid(size) => EncodeError::InvalidSize { codec, size },
        }
    }
}
