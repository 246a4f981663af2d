//! Discriminated unions: a prefix read from the stream picks the payload type.

use std::{
    cell::RefCell,
    fmt::{self, Write},
    sync::Arc,
};

use bitbind_el::{
    Describe, EvalError, Expression, Operator, Resolver, Scope, Type, UnsupportedOperation, Value,
    article,
};
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::{
    bits::{BitReader, BitSink, ByteOrder, low_mask},
    codec::{Builder, Codec, CodecSource, combine},
    errors::{CompileError, DecodeError, DecodeErrorKind, EncodeError},
    resolver::{PREFIX, PrefixResolver},
};

/// Widest prefix that still fits the `Long` it is exposed as.
pub const MAX_PREFIX_SIZE: u32 = 63;

thread_local! {
    /// Payload types whose size is being computed further up this thread's
    /// stack.
    static SIZING: RefCell<Vec<Type>> = const { RefCell::new(Vec::new()) };
}

/// Marks a payload type as being sized until dropped.
struct SizingGuard(Type);

impl SizingGuard {
    /// `None` when `ty` is already being sized, i.e. the schema is recursive.
    fn enter(ty: &Type) -> Option<Self> {
        SIZING.with(|sizing| {
            let mut sizing = sizing.borrow_mut();
            if sizing.contains(ty) {
                return None;
            }
            sizing.push(ty.clone());
            Some(SizingGuard(ty.clone()))
        })
    }
}

impl Drop for SizingGuard {
    fn drop(&mut self) {
        SIZING.with(|sizing| {
            let mut sizing = sizing.borrow_mut();
            if let Some(i) = sizing.iter().rposition(|ty| *ty == self.0) {
                sizing.remove(i);
            }
        });
    }
}

/// Whether two payload sizes describe the same number of bits.
fn same_size(lhs: &Expression<i64>, rhs: &Expression<i64>) -> bool {
    match (lhs.constant_value(), rhs.constant_value()) {
        (Some(lhs), Some(rhs)) => lhs == rhs,
        _ => lhs == rhs,
    }
}

/// Scope select-from conditions are bound in: `prefix` plus whatever the
/// enclosing scope declares.
pub fn prefix_scope(outer: Option<Arc<Scope>>) -> Scope {
    let scope = Scope::new(PREFIX).with_field(PREFIX, Type::Long);
    match outer {
        Some(outer) => scope.within(outer),
        None => scope,
    }
}

/// One branch of a select-from: the payload type chosen when `condition`
/// holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    condition: Expression<bool>,
    ty: Type,
}

impl Alternative {
    pub fn new(condition: Expression<bool>, ty: Type) -> Self {
        Alternative { condition, ty }
    }

    pub fn condition(&self) -> &Expression<bool> {
        &self.condition
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} if {}", self.ty, self.condition)
    }
}

/// Reads `prefix_size` bits, then decodes the payload of the first
/// alternative whose condition holds.
///
/// Payload codecs are obtained from the [`CodecSource`] the first time an
/// alternative is taken and kept for the lifetime of this codec.
#[derive(Debug)]
pub struct SelectFromCodec {
    prefix_size: u32,
    order: ByteOrder,
    alternatives: Vec<Alternative>,
    default: Option<Type>,
    source: Arc<dyn CodecSource>,
    codecs: DashMap<Type, Arc<dyn Codec>>,
}

impl SelectFromCodec {
    pub fn new(
        prefix_size: u32,
        order: ByteOrder,
        alternatives: Vec<Alternative>,
        default: Option<Type>,
        source: Arc<dyn CodecSource>,
    ) -> Result<Self, CompileError> {
        if !(1..=MAX_PREFIX_SIZE).contains(&prefix_size) {
            return Err(CompileError::InvalidWidth(prefix_size));
        }

        let types = alternatives.iter().map(Alternative::ty).chain(default.iter());
        for ty in types {
            if !source.supports(ty) {
                return Err(CompileError::UnresolvableType(ty.clone()));
            }
        }

        Ok(SelectFromCodec {
            prefix_size,
            order,
            alternatives,
            default,
            source,
            codecs: DashMap::new(),
        })
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    pub fn default_type(&self) -> Option<&Type> {
        self.default.as_ref()
    }

    /// Cached payload codec for `ty`. Built outside the map's locks; when two
    /// callers race, the first codec inserted is the one both get.
    fn payload_codec(&self, ty: &Type) -> Result<Arc<dyn Codec>, CompileError> {
        if let Some(codec) = self.codecs.get(ty) {
            return Ok(Arc::clone(codec.value()));
        }

        let codec = self.source.codec_for(ty)?;
        debug!("Built select-from payload codec for {}", ty);

        let entry = self.codecs.entry(ty.clone()).or_insert(codec);
        Ok(Arc::clone(entry.value()))
    }

    fn select(&self, resolver: &dyn Resolver) -> Result<Option<&Type>, EvalError> {
        for alternative in &self.alternatives {
            if alternative.condition.eval(resolver)? {
                return Ok(Some(&alternative.ty));
            }
        }
        Ok(self.default.as_ref())
    }

    fn rendered_alternatives(&self) -> String {
        let mut rendered = self
            .alternatives
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        if let Some(default) = &self.default {
            rendered.push(format!("{default} otherwise"));
        }
        rendered.join(", ")
    }

    fn discriminant(&self, value: &Value, resolver: &dyn Resolver) -> Result<u64, EncodeError> {
        let ty = value.ty();
        let Some(alternative) = self.alternatives.iter().find(|a| a.ty == ty) else {
            if self.default.as_ref() == Some(&ty) {
                return Err(EncodeError::NoDiscriminant {
                    codec: self.name(),
                    source: UnsupportedOperation(format!(
                        "`{ty}` is only selected as the default"
                    )),
                });
            }
            return Err(EncodeError::InvalidValue {
                codec: self.name(),
                expected: self.ty(),
                found: ty,
            });
        };

        let scope = PrefixResolver::unread(resolver);
        let expected = alternative
            .condition
            .expected_value(&scope)
            .map_err(|source| EncodeError::NoDiscriminant {
                codec: self.name(),
                source,
            })?;

        match u64::try_from(expected) {
            Ok(prefix) if prefix <= low_mask(self.prefix_size as usize) => Ok(prefix),
            _ => Err(EncodeError::PrefixOverflow {
                codec: self.name(),
                value: expected,
            }),
        }
    }
}

impl Codec for SelectFromCodec {
    fn decode(
        &self,
        reader: &mut BitReader<'_>,
        resolver: &dyn Resolver,
        builder: &dyn Builder,
    ) -> Result<Value, DecodeError> {
        let position = reader.position();
        let prefix = reader
            .read(self.prefix_size, self.order)
            .map_err(|e| DecodeError::new(self.name(), position, e))?;

        let scope = PrefixResolver::new(prefix, resolver);
        let selected = self
            .select(&scope)
            .map_err(|e| DecodeError::new(self.name(), position, e))?;

        let Some(ty) = selected else {
            return Err(DecodeError::new(
                self.name(),
                position,
                DecodeErrorKind::NoAlternative {
                    prefix,
                    alternatives: self.rendered_alternatives(),
                },
            ));
        };
        trace!("Prefix {} selects {}", prefix, ty);

        let codec = self
            .payload_codec(ty)
            .map_err(|e| DecodeError::new(self.name(), position, e))?;
        codec.decode(reader, resolver, builder)
    }

    fn encode(
        &self,
        value: &Value,
        sink: &mut dyn BitSink,
        resolver: &dyn Resolver,
    ) -> Result<(), EncodeError> {
        let prefix = self.discriminant(value, resolver)?;
        let codec = self.payload_codec(&value.ty())?;

        sink.write_bits(self.prefix_size, prefix, self.order)
            .map_err(|e| EncodeError::io(self.name(), e))?;
        codec.encode(value, sink, resolver)
    }

    /// Known only when every alternative, and the default, has the same
    /// payload size. Unknown for a payload that contains this union again.
    fn size(&self) -> Option<Expression<i64>> {
        let mut payload: Option<Expression<i64>> = None;
        for ty in self.alternatives.iter().map(Alternative::ty).chain(self.default.iter()) {
            let _guard = SizingGuard::enter(ty)?;
            let size = self.payload_codec(ty).ok()?.size()?;
            match &payload {
                Some(known) if !same_size(known, &size) => return None,
                Some(_) => {}
                None => payload = Some(size),
            }
        }

        combine(
            Operator::Add,
            &Expression::<i64>::constant(self.prefix_size.into()),
            &payload?,
        )
    }

    fn ty(&self) -> Type {
        self.types()
            .into_iter()
            .reduce(|lhs, rhs| lhs.common_supertype(&rhs))
            .unwrap_or(Type::Any)
    }

    fn types(&self) -> Vec<Type> {
        let mut types = Vec::new();
        for ty in self.alternatives.iter().map(Alternative::ty).chain(self.default.iter()) {
            if !types.contains(ty) {
                types.push(ty.clone());
            }
        }
        types
    }

    fn name(&self) -> String {
        "select-from codec".to_string()
    }
}

impl Describe for SelectFromCodec {
    fn describe(&self, out: &mut dyn Write) -> fmt::Result {
        let prefix = self.prefix_size.to_string();
        write!(out, "{} {prefix}-bit prefix, followed by ", article(&prefix))?;
        for (i, alternative) in self.alternatives.iter().enumerate() {
            if i > 0 {
                out.write_str("; ")?;
            }
            let ty = alternative.ty.to_string();
            write!(out, "{} {ty} if ", article(&ty))?;
            alternative.condition.describe(out)?;
        }
        let Some(default) = &self.default else {
            return Ok(());
        };
        let default = default.to_string();
        if self.alternatives.is_empty() {
            write!(out, "{} {default}", article(&default))
        } else {
            write!(out, "; {} {default} otherwise", article(&default))
        }
    }
}
