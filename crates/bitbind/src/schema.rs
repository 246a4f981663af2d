//! Schema descriptions and the registry that compiles them into codec trees.
//!
//! A [`RecordDef`] lists the fields of one record type, each carrying a
//! [`Description`] whose expressions are already bound. [`Codecs`] owns the
//! record definitions together with an ordered chain of [`CodecFactory`]s and
//! turns descriptions and types into shared [`Codec`]s.

use std::{collections::BTreeMap, fmt, sync::Arc};

use bitbind_el::{Expression, Scope, Type};
use tracing::debug;

use crate::{
    bitfield::BitFieldCodec,
    bits::ByteOrder,
    codec::{Codec, CodecSource},
    errors::CompileError,
    list::{ListCodec, MapCodec},
    numeric::{NumericCodec, NumericKind},
    record::RecordCodec,
    select::{Alternative, SelectFromCodec},
};

/// How one field is laid out on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    Numeric {
        kind: NumericKind,
        size: Expression<i64>,
        order: ByteOrder,
        matches: Option<Expression<i64>>,
    },
    BitField {
        set: String,
        symbols: Vec<String>,
        masks: Vec<(String, u64)>,
        size: Expression<i64>,
        order: ByteOrder,
    },
    List {
        element: Type,
        count: Expression<i64>,
    },
    Map {
        entry: Type,
        count: Expression<i64>,
    },
    /// A nested record, integral or otherwise registered type.
    Object(Type),
    SelectFrom {
        prefix_size: u32,
        order: ByteOrder,
        alternatives: Vec<Alternative>,
        default: Option<Type>,
    },
}

impl Description {
    /// Big-endian numeric field of the kind's natural width.
    pub fn numeric(kind: NumericKind) -> Self {
        Description::Numeric {
            kind,
            size: Expression::<i64>::constant(kind.bits().into()),
            order: ByteOrder::BigEndian,
            matches: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Description::Numeric { .. } => "numeric",
            Description::BitField { .. } => "bit field",
            Description::List { .. } => "list",
            Description::Map { .. } => "map",
            Description::Object(_) => "object",
            Description::SelectFrom { .. } => "select-from",
        }
    }

    /// Type the described field decodes into.
    pub fn ty(&self) -> Type {
        match self {
            Description::Numeric { kind, .. } => kind.ty(),
            Description::BitField { .. } => Type::Set,
            Description::List { .. } => Type::List,
            Description::Map { .. } => Type::Map,
            Description::Object(ty) => ty.clone(),
            Description::SelectFrom {
                alternatives,
                default,
                ..
            } => alternatives
                .iter()
                .map(Alternative::ty)
                .chain(default.iter())
                .cloned()
                .reduce(|lhs, rhs| lhs.common_supertype(&rhs))
                .unwrap_or(Type::Any),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub description: Description,
}

/// A record type: its name and its fields in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl RecordDef {
    pub fn new(name: &str) -> Self {
        RecordDef {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, description: Description) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            description,
        });
        self
    }

    /// Scope declaring every field of this record, for binding expressions
    /// that refer to them.
    pub fn scope(&self) -> Scope {
        self.fields
            .iter()
            .fold(Scope::new(&self.name), |scope, field| {
                scope.with_field(&field.name, field.description.ty())
            })
    }
}

/// Turns a [`Description`] into a codec, or passes with `Ok(None)` so the
/// next factory in the chain gets a chance.
pub trait CodecFactory: Send + Sync + fmt::Debug {
    fn create(
        &self,
        description: &Description,
        codecs: &Codecs,
    ) -> Result<Option<Arc<dyn Codec>>, CompileError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumericFactory;

impl CodecFactory for NumericFactory {
    fn create(
        &self,
        description: &Description,
        _codecs: &Codecs,
    ) -> Result<Option<Arc<dyn Codec>>, CompileError> {
        let Description::Numeric {
            kind,
            size,
            order,
            matches,
        } = description
        else {
            return Ok(None);
        };

        let codec = NumericCodec::new(size.clone(), *order, *kind);
        let codec = match matches {
            Some(expected) => codec.with_match(expected.clone()),
            None => codec,
        };
        Ok(Some(Arc::new(codec)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BitFieldFactory;

impl CodecFactory for BitFieldFactory {
    fn create(
        &self,
        description: &Description,
        _codecs: &Codecs,
    ) -> Result<Option<Arc<dyn Codec>>, CompileError> {
        let Description::BitField {
            set,
            symbols,
            masks,
            size,
            order,
        } = description
        else {
            return Ok(None);
        };

        let codec = BitFieldCodec::new(
            set,
            symbols.as_slice(),
            masks.as_slice(),
            size.clone(),
            *order,
        )?;
        Ok(Some(Arc::new(codec)))
    }
}

/// Lists and maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionFactory;

impl CodecFactory for CollectionFactory {
    fn create(
        &self,
        description: &Description,
        codecs: &Codecs,
    ) -> Result<Option<Arc<dyn Codec>>, CompileError> {
        match description {
            Description::List { element, count } => {
                let element = codecs.codec_for(element)?;
                Ok(Some(Arc::new(ListCodec::new(element, count.clone()))))
            }
            Description::Map { entry, count } => {
                let Type::Record(name) = entry else {
                    return Err(CompileError::NotAnEntry(entry.clone()));
                };
                let entry = Arc::new(codecs.record_codec(name)?);
                Ok(Some(Arc::new(MapCodec::new(entry, count.clone())?)))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectFactory;

impl CodecFactory for ObjectFactory {
    fn create(
        &self,
        description: &Description,
        codecs: &Codecs,
    ) -> Result<Option<Arc<dyn Codec>>, CompileError> {
        match description {
            Description::Object(ty) => codecs.codec_for(ty).map(Some),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectFromFactory;

impl CodecFactory for SelectFromFactory {
    fn create(
        &self,
        description: &Description,
        codecs: &Codecs,
    ) -> Result<Option<Arc<dyn Codec>>, CompileError> {
        let Description::SelectFrom {
            prefix_size,
            order,
            alternatives,
            default,
        } = description
        else {
            return Ok(None);
        };

        let codec = SelectFromCodec::new(
            *prefix_size,
            *order,
            alternatives.clone(),
            default.clone(),
            Arc::new(codecs.clone()),
        )?;
        Ok(Some(Arc::new(codec)))
    }
}

#[derive(Debug, Clone, Default)]
struct Registry {
    records: BTreeMap<String, RecordDef>,
    factories: Vec<Arc<dyn CodecFactory>>,
}

/// Record definitions plus the factory chain used to compile them.
///
/// Cloning is cheap; select-from codecs keep a clone to build their payload
/// codecs lazily.
#[derive(Debug, Clone)]
pub struct Codecs {
    registry: Arc<Registry>,
}

impl Default for Codecs {
    fn default() -> Self {
        Self::new()
    }
}

impl Codecs {
    /// A registry with the built-in factories and no records.
    pub fn new() -> Self {
        Codecs::empty()
            .prepend_factory(Arc::new(SelectFromFactory))
            .prepend_factory(Arc::new(ObjectFactory))
            .prepend_factory(Arc::new(CollectionFactory))
            .prepend_factory(Arc::new(BitFieldFactory))
            .prepend_factory(Arc::new(NumericFactory))
    }

    /// A registry without any factory.
    pub fn empty() -> Self {
        Codecs {
            registry: Arc::new(Registry::default()),
        }
    }

    /// Puts `factory` in front of every factory registered so far.
    pub fn prepend_factory(mut self, factory: Arc<dyn CodecFactory>) -> Self {
        Arc::make_mut(&mut self.registry).factories.insert(0, factory);
        self
    }

    pub fn with_record(mut self, record: RecordDef) -> Result<Self, CompileError> {
        let registry = Arc::make_mut(&mut self.registry);
        if registry.records.contains_key(&record.name) {
            return Err(CompileError::DuplicateRecord(record.name));
        }

        registry.records.insert(record.name.clone(), record);
        Ok(self)
    }

    pub fn record(&self, name: &str) -> Option<&RecordDef> {
        self.registry.records.get(name)
    }

    /// Asks each factory in turn; the first one that answers wins.
    pub fn create(&self, description: &Description) -> Result<Arc<dyn Codec>, CompileError> {
        for factory in &self.registry.factories {
            if let Some(codec) = factory.create(description, self)? {
                return Ok(codec);
            }
        }

        Err(CompileError::NoFactory(description.kind()))
    }

    pub fn record_codec(&self, name: &str) -> Result<RecordCodec, CompileError> {
        let record = self
            .record(name)
            .ok_or_else(|| CompileError::UnknownRecord(name.to_string()))?;
        debug!("Building record codec for {}", name);

        let fields = record
            .fields
            .iter()
            .map(|field| -> Result<_, CompileError> {
                Ok((field.name.clone(), self.create(&field.description)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordCodec::new(name, fields))
    }
}

impl CodecSource for Codecs {
    fn codec_for(&self, ty: &Type) -> Result<Arc<dyn Codec>, CompileError> {
        if let Some(kind) = NumericKind::from_type(ty) {
            return Ok(Arc::new(NumericCodec::of(kind)));
        }

        match ty {
            Type::Record(name) => Ok(Arc::new(self.record_codec(name)?)),
            other => Err(CompileError::UnresolvableType(other.clone())),
        }
    }

    fn supports(&self, ty: &Type) -> bool {
        match ty {
            Type::Record(name) => self.registry.records.contains_key(&**name),
            other => NumericKind::from_type(other).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use bitbind_el::{Node, Record, Relation, Value};

    use crate::{codec, resolver::PREFIX, select::prefix_scope};

    use super::*;

    fn when_prefix_is(value: i32) -> Expression<bool> {
        let scope = prefix_scope(None);
        Expression::new(
            Node::relational(
                Relation::Eq,
                Node::reference(&scope, PREFIX).unwrap(),
                Node::int(value),
            )
            .unwrap(),
        )
        .unwrap()
    }

    fn messages() -> Codecs {
        Codecs::new()
            .with_record(
                RecordDef::new("Run")
                    .field("speed", Description::numeric(NumericKind::Short))
                    .field("direction", Description::numeric(NumericKind::Byte)),
            )
            .unwrap()
            .with_record(
                RecordDef::new("Hide").field("safehouse", Description::numeric(NumericKind::Int)),
            )
            .unwrap()
    }

    fn message() -> Description {
        Description::SelectFrom {
            prefix_size: 16,
            order: ByteOrder::BigEndian,
            alternatives: vec![
                Alternative::new(when_prefix_is(0x08), Type::record("Run")),
                Alternative::new(when_prefix_is(0x18), Type::record("Hide")),
            ],
            default: None,
        }
    }

    #[test]
    fn test_select_from_through_codecs() {
        let codec = messages().create(&message()).unwrap();

        let hide = Record::new("Hide").with("safehouse", 101);
        let encoded = codec::encode(&*codec, &Value::Record(hide.clone())).unwrap();
        assert_eq!(encoded, vec![0, 0x18, 0, 0, 0, 101]);
        assert_eq!(codec::decode(&*codec, &encoded), Ok(Value::Record(hide)));
    }

    #[test]
    fn test_integral_types_get_natural_width() {
        let codecs = Codecs::new();
        let codec = codecs.codec_for(&Type::Short).unwrap();

        assert_eq!(codec.size(), Some(Expression::<i64>::constant(16)));
        assert_eq!(codec::decode(&*codec, &[0xFF, 0xFE]), Ok(Value::Short(-2)));
        assert!(codecs.supports(&Type::Long));
        assert!(!codecs.supports(&Type::Text));
    }

    #[test]
    fn test_nested_record_sees_outer_fields() {
        let outer = Arc::new(
            RecordDef::new("Packet")
                .field("width", Description::numeric(NumericKind::Byte))
                .scope(),
        );
        let body_scope = Scope::new("Body").within(outer);
        let width =
            Expression::<i64>::new(Node::reference(&body_scope, "width").unwrap()).unwrap();

        let codecs = Codecs::new()
            .with_record(RecordDef::new("Body").field(
                "value",
                Description::Numeric {
                    kind: NumericKind::Int,
                    size: width,
                    order: ByteOrder::BigEndian,
                    matches: None,
                },
            ))
            .unwrap()
            .with_record(
                RecordDef::new("Packet")
                    .field("width", Description::numeric(NumericKind::Byte))
                    .field("body", Description::Object(Type::record("Body"))),
            )
            .unwrap();

        let packet = codecs.codec_for(&Type::record("Packet")).unwrap();
        let value = codec::decode(&*packet, &[12, 0xAB, 0xC0]).unwrap();
        assert_eq!(value.to_string(), "Packet { width: 12, body: Body { value: 2748 } }");
        assert_eq!(codec::encode(&*packet, &value).unwrap(), vec![12, 0xAB, 0xC0]);
    }

    #[test]
    fn test_map_through_codecs() {
        let codecs = Codecs::new()
            .with_record(
                RecordDef::new("Entry")
                    .field("key", Description::numeric(NumericKind::Byte))
                    .field("value", Description::numeric(NumericKind::Byte)),
            )
            .unwrap();
        let map = codecs
            .create(&Description::Map {
                entry: Type::record("Entry"),
                count: Expression::<i64>::constant(1),
            })
            .unwrap();

        assert_eq!(
            codec::decode(&*map, &[1, 2]),
            Ok(Value::Map(vec![(Value::Byte(1), Value::Byte(2))]))
        );

        let err = codecs
            .create(&Description::Map {
                entry: Type::Int,
                count: Expression::<i64>::constant(1),
            })
            .unwrap_err();
        assert_eq!(err, CompileError::NotAnEntry(Type::Int));
    }

    #[test]
    fn test_prepended_factory_takes_priority() {
        #[derive(Debug)]
        struct LittleEndianNumbers;

        impl CodecFactory for LittleEndianNumbers {
            fn create(
                &self,
                description: &Description,
                _codecs: &Codecs,
            ) -> Result<Option<Arc<dyn Codec>>, CompileError> {
                match description {
                    Description::Numeric { kind, size, .. } => Ok(Some(Arc::new(
                        NumericCodec::new(size.clone(), ByteOrder::LittleEndian, *kind),
                    ))),
                    _ => Ok(None),
                }
            }
        }

        let codecs = Codecs::new().prepend_factory(Arc::new(LittleEndianNumbers));
        let codec = codecs.create(&Description::numeric(NumericKind::Short)).unwrap();

        assert_eq!(codec::decode(&*codec, &[0x34, 0x12]), Ok(Value::Short(0x1234)));
    }

    #[test]
    fn test_no_factory() {
        let err = Codecs::empty()
            .create(&Description::numeric(NumericKind::Int))
            .unwrap_err();
        assert_eq!(err, CompileError::NoFactory("numeric"));
        assert_eq!(err.to_string(), "no factory accepts a numeric description");
    }

    #[test]
    fn test_unknown_and_duplicate_records() {
        let codecs = messages();

        assert_eq!(
            codecs.codec_for(&Type::record("Ghost")).unwrap_err(),
            CompileError::UnknownRecord("Ghost".into())
        );
        assert_eq!(
            codecs.with_record(RecordDef::new("Run")).unwrap_err(),
            CompileError::DuplicateRecord("Run".into())
        );
    }

    #[test]
    fn test_select_from_checks_types_up_front() {
        let err = Codecs::new().create(&message()).unwrap_err();
        assert_eq!(err, CompileError::UnresolvableType(Type::record("Run")));
    }

    #[test]
    fn test_record_scope_declares_field_types() {
        let scope = RecordDef::new("Run")
            .field("speed", Description::numeric(NumericKind::Short))
            .field("direction", Description::numeric(NumericKind::Byte))
            .scope();

        assert_eq!(scope.field_type("speed"), Some(&Type::Short));
        assert_eq!(scope.field_type("direction"), Some(&Type::Byte));
        assert_eq!(message().ty(), Type::record("Run").common_supertype(&Type::record("Hide")));
    }
}
