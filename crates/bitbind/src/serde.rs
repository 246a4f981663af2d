//! JSON‑deserializable schema definitions.
//!
//! These types describe record layouts that need no expressions: numbers of a
//! constant width, bit fields, fixed-count lists and nested records. They are
//! intended to be loaded from a schema file and converted into [`Codecs`]
//! with `TryFrom`.

use std::collections::BTreeMap;

use bitbind_el::{Expression, Type};
use serde::{Deserialize, Serialize};

use crate::{
    bits::ByteOrder,
    errors::CompileError,
    numeric::NumericKind,
    schema::{Codecs, Description, RecordDef},
};

/// Top‑level schema definition: every record type the schema declares.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchemaDef {
    pub records: Vec<RecordDefinition>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordDefinition {
    pub name: String,
    /// Fields in wire order.
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: FieldKindDef,
}

/// Layout of a single field.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type")]
pub enum FieldKindDef {
    Numeric {
        kind: NumericKind,
        /// Width in bits; defaults to the natural width of `kind`.
        #[serde(default)]
        bits: Option<u32>,
        #[serde(default)]
        order: ByteOrder,
        /// Constant the decoded value must equal.
        #[serde(default)]
        matches: Option<i64>,
    },
    BitField {
        set: String,
        symbols: Vec<String>,
        masks: BTreeMap<String, u64>,
        bits: u32,
        #[serde(default)]
        order: ByteOrder,
    },
    List {
        /// `byte`, `short`, `int`, `long` or a record name.
        element: String,
        count: u32,
    },
    Object {
        record: String,
    },
}

fn parse_type(name: &str) -> Type {
    match name {
        "byte" => Type::Byte,
        "short" => Type::Short,
        "int" => Type::Int,
        "long" => Type::Long,
        record => Type::record(record),
    }
}

fn width(bits: u32) -> Result<Expression<i64>, CompileError> {
    if !(1..=64).contains(&bits) {
        return Err(CompileError::InvalidWidth(bits));
    }
    Ok(Expression::<i64>::constant(bits.into()))
}

impl TryFrom<&FieldKindDef> for Description {
    type Error = CompileError;

    fn try_from(value: &FieldKindDef) -> Result<Self, Self::Error> {
        let description = match value {
            FieldKindDef::Numeric {
                kind,
                bits,
                order,
                matches,
            } => Description::Numeric {
                kind: *kind,
                size: width(bits.unwrap_or(kind.bits()))?,
                order: *order,
                matches: matches.map(Expression::<i64>::constant),
            },
            FieldKindDef::BitField {
                set,
                symbols,
                masks,
                bits,
                order,
            } => Description::BitField {
                set: set.clone(),
                symbols: symbols.clone(),
                masks: masks
                    .iter()
                    .map(|(symbol, mask)| (symbol.clone(), *mask))
                    .collect(),
                size: width(*bits)?,
                order: *order,
            },
            FieldKindDef::List { element, count } => Description::List {
                element: parse_type(element),
                count: Expression::<i64>::constant((*count).into()),
            },
            FieldKindDef::Object { record } => Description::Object(Type::record(record)),
        };

        Ok(description)
    }
}

impl TryFrom<&RecordDefinition> for RecordDef {
    type Error = CompileError;

    fn try_from(value: &RecordDefinition) -> Result<Self, Self::Error> {
        value
            .fields
            .iter()
            .try_fold(RecordDef::new(&value.name), |record, field| {
                Ok(record.field(&field.name, (&field.kind).try_into()?))
            })
    }
}

impl TryFrom<SchemaDef> for Codecs {
    type Error = CompileError;

    fn try_from(value: SchemaDef) -> Result<Self, Self::Error> {
        value
            .records
            .iter()
            .try_fold(Codecs::new(), |codecs, record| {
                codecs.with_record(record.try_into()?)
            })
    }
}

#[cfg(test)]
mod tests {
    use bitbind_el::{Record, Value};

    use crate::codec::{self, CodecSource};

    use super::*;

    const SCHEMA: &str = r#"{
        "records": [
            {
                "name": "Run",
                "fields": [
                    { "name": "speed", "kind": { "type": "Numeric", "kind": "Short" } },
                    { "name": "direction", "kind": { "type": "Numeric", "kind": "Byte" } }
                ]
            },
            {
                "name": "Week",
                "fields": [
                    {
                        "name": "days",
                        "kind": {
                            "type": "BitField",
                            "set": "Day",
                            "symbols": ["MON", "TUE", "WED"],
                            "masks": { "MON": 1, "TUE": 2, "WED": 4 },
                            "bits": 8
                        }
                    },
                    { "name": "runs", "kind": { "type": "List", "element": "Run", "count": 2 } },
                    {
                        "name": "crc",
                        "kind": { "type": "Numeric", "kind": "Int", "bits": 12, "order": "LittleEndian" }
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_schema_from_json() {
        let def: SchemaDef = serde_json::from_str(SCHEMA).unwrap();
        let codecs = Codecs::try_from(def).unwrap();
        let week = codecs.codec_for(&Type::record("Week")).unwrap();

        let data = [0b101, 0, 30, 5, 0, 31, 6, 0xCD, 0xA0];
        let value = codec::decode(&*week, &data).unwrap();

        let run = |speed: i16, direction: i8| {
            Value::Record(Record::new("Run").with("speed", speed).with("direction", direction))
        };
        let expected = Record::new("Week")
            .with("days", Value::Set(["MON", "WED"].map(String::from).into()))
            .with("runs", Value::List(vec![run(30, 5), run(31, 6)]))
            .with("crc", 0xACD);

        assert_eq!(value, Value::Record(expected));
        assert_eq!(codec::encode(&*week, &value).unwrap(), data);
    }

    #[test]
    fn test_invalid_width() {
        let kind = FieldKindDef::Numeric {
            kind: NumericKind::Int,
            bits: Some(65),
            order: ByteOrder::BigEndian,
            matches: None,
        };
        assert_eq!(Description::try_from(&kind).unwrap_err(), CompileError::InvalidWidth(65));
    }

    #[test]
    fn test_missing_mask_surfaces_when_compiled() {
        let def: SchemaDef = serde_json::from_str(
            r#"{ "records": [{ "name": "Week", "fields": [{ "name": "days", "kind": {
                "type": "BitField", "set": "Day", "symbols": ["MON", "TUE"],
                "masks": { "MON": 1 }, "bits": 8 } }] }] }"#,
        )
        .unwrap();
        let codecs = Codecs::try_from(def).unwrap();

        assert_eq!(
            codecs.codec_for(&Type::record("Week")).unwrap_err(),
            CompileError::MissingMask {
                set: "Day".into(),
                symbol: "TUE".into()
            }
        );
    }
}
