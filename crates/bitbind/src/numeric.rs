//! Integral fields of a fixed or expression-determined width.

use std::fmt::{self, Write};

use bitbind_el::{Describe, Expression, Resolver, Type, Value, article};

use crate::{
    bits::{BitReader, BitSink, ByteOrder, low_mask, sign_extend},
    codec::{Builder, Codec, eval_width},
    errors::{DecodeError, DecodeErrorKind, EncodeError},
};

/// The integral type a numeric field decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum NumericKind {
    Byte,
    Short,
    Int,
    Long,
}

impl NumericKind {
    pub fn bits(self) -> u32 {
        match self {
            NumericKind::Byte => 8,
            NumericKind::Short => 16,
            NumericKind::Int => 32,
            NumericKind::Long => 64,
        }
    }

    pub fn ty(self) -> Type {
        match self {
            NumericKind::Byte => Type::Byte,
            NumericKind::Short => Type::Short,
            NumericKind::Int => Type::Int,
            NumericKind::Long => Type::Long,
        }
    }

    pub fn from_type(ty: &Type) -> Option<Self> {
        match ty {
            Type::Byte => Some(NumericKind::Byte),
            Type::Short => Some(NumericKind::Short),
            Type::Int => Some(NumericKind::Int),
            Type::Long => Some(NumericKind::Long),
            _ => None,
        }
    }

    /// Interprets the low bits of `raw` as a two's complement value of this kind.
    pub fn narrow(self, raw: u64) -> Value {
        let bits = self.bits() as usize;
        let value = sign_extend(raw & low_mask(bits), bits);

        match self {
            NumericKind::Byte => Value::Byte(value as i8),
            NumericKind::Short => Value::Short(value as i16),
            NumericKind::Int => Value::Int(value as i32),
            NumericKind::Long => Value::Long(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NumericCodec {
    size: Expression<i64>,
    order: ByteOrder,
    kind: NumericKind,
    /// Value the decoded number must equal.
    matches: Option<Expression<i64>>,
}

impl NumericCodec {
    pub fn new(size: Expression<i64>, order: ByteOrder, kind: NumericKind) -> Self {
        NumericCodec {
            size,
            order,
            kind,
            matches: None,
        }
    }

    /// Big-endian codec using the kind's natural width.
    pub fn of(kind: NumericKind) -> Self {
        Self::new(
            Expression::<i64>::constant(kind.bits().into()),
            ByteOrder::BigEndian,
            kind,
        )
    }

    pub fn with_match(mut self, expected: Expression<i64>) -> Self {
        self.matches = Some(expected);
        self
    }

    pub fn kind(&self) -> NumericKind {
        self.kind
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }
}

impl Codec for NumericCodec {
    fn decode(
        &self,
        reader: &mut BitReader<'_>,
        resolver: &dyn Resolver,
        _builder: &dyn Builder,
    ) -> Result<Value, DecodeError> {
        let position = reader.position();
        let width = eval_width(&self.size, resolver).map_err(|e| e.decoding(self.name(), position))?;
        let raw = reader
            .read(width, self.order)
            .map_err(|e| DecodeError::new(self.name(), position, e))?;
        let value = self.kind.narrow(raw);

        if let Some(matches) = &self.matches {
            let expected = matches
                .eval(resolver)
                .map_err(|e| DecodeError::new(self.name(), position, e))?;
            let actual = value.as_i64().unwrap_or_default();

            if expected != actual {
                return Err(DecodeError::new(
                    self.name(),
                    position,
                    DecodeErrorKind::Mismatch { expected, actual },
                ));
            }
        }

        Ok(value)
    }

    fn encode(
        &self,
        value: &Value,
        sink: &mut dyn BitSink,
        resolver: &dyn Resolver,
    ) -> Result<(), EncodeError> {
        let raw = value.as_i64().ok_or_else(|| EncodeError::InvalidValue {
            codec: self.name(),
            expected: self.kind.ty(),
            found: value.ty(),
        })?;
        let width = eval_width(&self.size, resolver).map_err(|e| e.encoding(self.name()))?;

        sink.write_bits(width, raw as u64, self.order)
            .map_err(|e| EncodeError::io(self.name(), e))
    }

    fn size(&self) -> Option<Expression<i64>> {
        Some(self.size.clone())
    }

    fn ty(&self) -> Type {
        self.kind.ty()
    }

    fn name(&self) -> String {
        format!("{} codec", self.kind.ty())
    }
}

impl Describe for NumericCodec {
    fn describe(&self, out: &mut dyn Write) -> fmt::Result {
        let order = match self.order {
            ByteOrder::BigEndian => "big endian",
            ByteOrder::LittleEndian => "little endian",
        };

        match self.size.constant_value() {
            Some(bits) => {
                let bits = bits.to_string();
                write!(out, "{} {bits}-bit {order} {} value", article(&bits), self.kind.ty())?
            }
            None => {
                let ty = self.kind.ty();
                write!(out, "{} {order} {ty} value whose number of bits is ", article(order))?;
                self.size.describe(out)?;
            }
        }

        if let Some(matches) = &self.matches {
            out.write_str(", which must equal ")?;
            matches.describe(out)?;
        }

        Ok(())
    }
}
