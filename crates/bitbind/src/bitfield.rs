//! Enum sets packed into a bitmask, one or more bits per symbol.

use std::{
    collections::BTreeSet,
    fmt::{self, Write},
};

use bitbind_el::{Describe, Expression, Resolver, Type, Value, article};

use crate::{
    bits::{BitReader, BitSink, ByteOrder},
    codec::{Builder, Codec, eval_width},
    errors::{CompileError, DecodeError, EncodeError},
};

#[derive(Debug, Clone)]
pub struct BitFieldCodec {
    set: String,
    /// Masks in symbol declaration order.
    masks: Vec<(String, u64)>,
    size: Expression<i64>,
    order: ByteOrder,
}

impl BitFieldCodec {
    /// Builds a codec for the enum set `set`. Every symbol needs exactly one
    /// mask, and every mask must name a symbol.
    pub fn new<S: AsRef<str>>(
        set: &str,
        symbols: &[S],
        masks: &[(S, u64)],
        size: Expression<i64>,
        order: ByteOrder,
    ) -> Result<Self, CompileError> {
        if let Some((symbol, _)) = masks
            .iter()
            .find(|(symbol, _)| !symbols.iter().any(|s| s.as_ref() == symbol.as_ref()))
        {
            return Err(CompileError::UnknownSymbol {
                set: set.to_string(),
                symbol: symbol.as_ref().to_string(),
            });
        }

        let masks = symbols
            .iter()
            .map(|symbol| {
                let symbol = symbol.as_ref();
                masks
                    .iter()
                    .find(|(s, _)| s.as_ref() == symbol)
                    .map(|(_, mask)| (symbol.to_string(), *mask))
                    .ok_or_else(|| CompileError::MissingMask {
                        set: set.to_string(),
                        symbol: symbol.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BitFieldCodec {
            set: set.to_string(),
            masks,
            size,
            order,
        })
    }

    pub fn set(&self) -> &str {
        &self.set
    }

    fn mask_of(&self, symbol: &str) -> Option<u64> {
        self.masks
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, mask)| *mask)
    }
}

impl Codec for BitFieldCodec {
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

        let symbols = self
            .masks
            .iter()
            .filter(|(_, mask)| raw & mask != 0)
            .map(|(symbol, _)| symbol.clone())
            .collect::<BTreeSet<_>>();

        Ok(Value::Set(symbols))
    }

    fn encode(
        &self,
        value: &Value,
        sink: &mut dyn BitSink,
        resolver: &dyn Resolver,
    ) -> Result<(), EncodeError> {
        let Value::Set(symbols) = value else {
            return Err(EncodeError::InvalidValue {
                codec: self.name(),
                expected: Type::Set,
                found: value.ty(),
            });
        };

        let mut raw = 0u64;
        for symbol in symbols {
            raw |= self
                .mask_of(symbol)
                .ok_or_else(|| EncodeError::UnknownSymbol {
                    codec: self.name(),
                    symbol: symbol.clone(),
                })?;
        }

        let width = eval_width(&self.size, resolver).map_err(|e| e.encoding(self.name()))?;
        // Masks wider than the field are cut off by the sink.
        sink.write_bits(width, raw, self.order)
            .map_err(|e| EncodeError::io(self.name(), e))
    }

    fn size(&self) -> Option<Expression<i64>> {
        Some(self.size.clone())
    }

    fn ty(&self) -> Type {
        Type::Set
    }

    fn name(&self) -> String {
        format!("bit field codec for {}", self.set)
    }
}

impl Describe for BitFieldCodec {
    fn describe(&self, out: &mut dyn Write) -> fmt::Result {
        match self.size.constant_value() {
            Some(bits) => {
                let bits = bits.to_string();
                write!(out, "{} {bits}-bit set of {}", article(&bits), self.set)?
            }
            None => {
                write!(out, "a set of {} whose number of bits is ", self.set)?;
                self.size.describe(out)?;
            }
        }

        out.write_str(", with masks")?;
        for (i, (symbol, mask)) in self.masks.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(out, "{sep}{mask:#04x}: {symbol}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::codec;

    use super::*;

    const DAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

    fn days() -> BitFieldCodec {
        let masks = DAYS
            .iter()
            .enumerate()
            .map(|(i, day)| (*day, 1u64 << i))
            .collect::<Vec<_>>();

        BitFieldCodec::new(
            "Day",
            &DAYS,
            &masks,
            Expression::<i64>::constant(16),
            ByteOrder::BigEndian,
        )
        .unwrap()
    }

    fn set(symbols: &[&str]) -> Value {
        Value::Set(symbols.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_encode_days() {
        let bytes = codec::encode(&days(), &set(&["TUE", "THU", "SAT", "SUN"])).unwrap();
        assert_eq!(bytes, vec![0x00, 0x6A]);
    }

    #[test]
    fn test_decode_days() {
        let value = codec::decode(&days(), &[0x00, 0x15]).unwrap();
        assert_eq!(value, set(&["MON", "WED", "FRI"]));
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(codec::encode(&days(), &set(&[])).unwrap(), vec![0, 0]);
        assert_eq!(codec::decode(&days(), &[0, 0]).unwrap(), set(&[]));
    }

    #[test]
    fn test_overlapping_masks_co_select() {
        let codec = BitFieldCodec::new(
            "Access",
            &["READ", "WRITE", "ALL"],
            &[("READ", 0x1), ("WRITE", 0x2), ("ALL", 0x3)],
            Expression::<i64>::constant(8),
            ByteOrder::BigEndian,
        )
        .unwrap();

        assert_eq!(codec::decode(&codec, &[0x01]).unwrap(), set(&["READ", "ALL"]));
        assert_eq!(codec::encode(&codec, &set(&["ALL"])).unwrap(), vec![0x03]);
    }

    #[test]
    fn test_overflow_truncates() {
        let codec = BitFieldCodec::new(
            "Flags",
            &["LOW", "HIGH"],
            &[("LOW", 0x1), ("HIGH", 0x100)],
            Expression::<i64>::constant(8),
            ByteOrder::BigEndian,
        )
        .unwrap();

        assert_eq!(codec::encode(&codec, &set(&["LOW", "HIGH"])).unwrap(), vec![0x01]);
    }

    #[test]
    fn test_missing_mask() {
        let err = BitFieldCodec::new(
            "Day",
            &["MON", "TUE"],
            &[("MON", 1)],
            Expression::<i64>::constant(8),
            ByteOrder::BigEndian,
        )
        .unwrap_err();

        assert_eq!(
            err,
            CompileError::MissingMask {
                set: "Day".into(),
                symbol: "TUE".into()
            }
        );
    }

    #[test]
    fn test_mask_for_unknown_symbol() {
        let err = BitFieldCodec::new(
            "Day",
            &["MON"],
            &[("MON", 1), ("FUNDAY", 2)],
            Expression::<i64>::constant(8),
            ByteOrder::BigEndian,
        )
        .unwrap_err();

        assert!(matches!(err, CompileError::UnknownSymbol { .. }));
    }

    #[test]
    fn test_encode_unknown_symbol() {
        let err = codec::encode(&days(), &set(&["FUNDAY"])).unwrap_err();
        assert_eq!(err.to_string(), "bit field codec for Day: `FUNDAY` is not a symbol of the set");
    }

    #[test]
    fn test_describe_lists_masks() {
        let codec = BitFieldCodec::new(
            "Day",
            &["MON", "TUE"],
            &[("MON", 1), ("TUE", 2)],
            Expression::<i64>::constant(8),
            ByteOrder::BigEndian,
        )
        .unwrap();

        assert_eq!(
            codec.description(),
            "an 8-bit set of Day, with masks 0x01: MON, 0x02: TUE"
        );
    }
}
