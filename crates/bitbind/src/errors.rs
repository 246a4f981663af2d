//! Error types for codec construction, decoding and encoding.

use std::io;

use bitbind_el::{BindingError, EvalError, Type, UnsupportedOperation};
use thiserror::Error;

/// Schema-compile failures. Raised while a codec tree is built, never while
/// it runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    /// A symbol of an enum set has no bit mask.
    #[error("symbol `{symbol}` of `{set}` has no declared mask")]
    MissingMask { set: String, symbol: String },
    /// A mask was declared for a symbol the set does not have.
    #[error("mask declared for unknown symbol `{symbol}` of `{set}`")]
    UnknownSymbol { set: String, symbol: String },
    #[error("no codec can be built for type `{0}`")]
    UnresolvableType(Type),
    #[error("record type `{0}` is not defined")]
    UnknownRecord(String),
    #[error("record type `{0}` is defined twice")]
    DuplicateRecord(String),
    /// Map entries must be records with `key` and `value` fields.
    #[error("`{0}` is not a map entry type")]
    NotAnEntry(Type),
    #[error("no factory accepts a {0} description")]
    NoFactory(&'static str),
    #[error("{0} bits is not a valid width, expected 1..=64")]
    InvalidWidth(u32),
}

/// Errors produced by the bit stream itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("needed {needed} bits but only {available} remain")]
    OutOfBounds { needed: usize, available: usize },
    #[error("cannot read {0} bits at once, at most 64")]
    TooManyBitsRead(usize),
}

/// A failed decode: which codec failed, at which bit, and why.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{codec} failed at bit {position}: {kind}")]
pub struct DecodeError {
    pub codec: String,
    pub position: usize,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new(codec: impl Into<String>, position: usize, kind: impl Into<DecodeErrorKind>) -> Self {
        DecodeError {
            codec: codec.into(),
            position,
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("value does not match expected constant: expected {expected}, found {actual}")]
    Mismatch { expected: i64, actual: i64 },
    #[error("no alternative matches prefix {prefix}, expected one of: {alternatives}")]
    NoAlternative { prefix: u64, alternatives: String },
    #[error("invalid size {0}")]
    InvalidSize(i64),
    #[error("invalid element count {0}")]
    InvalidCount(i64),
    #[error("decoded `{record}` lacks field `{field}`")]
    MissingField { record: String, field: String },
    /// The [`Builder`](crate::codec::Builder) returned a record of another type.
    #[error("builder created `{found}` where `{expected}` was requested")]
    WrongBuilderResult { expected: String, found: String },
    /// A lazily built sub-codec could not be constructed.
    #[error(transparent)]
    Construction(#[from] CompileError),
}

/// A failed encode. Stream failures are passed through with the name of the
/// codec that was writing.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{codec}: {source}")]
    Io {
        codec: String,
        #[source]
        source: io::Error,
    },
    #[error("{codec} cannot encode {found}, expected {expected}")]
    InvalidValue {
        codec: String,
        expected: Type,
        found: Type,
    },
    #[error("{codec}: `{symbol}` is not a symbol of the set")]
    UnknownSymbol { codec: String, symbol: String },
    #[error("{codec}: field `{field}` is missing")]
    MissingField { codec: String, field: String },
    #[error("{codec}: {source}")]
    Eval {
        codec: String,
        #[source]
        source: EvalError,
    },
    #[error("{codec}: cannot derive a prefix: {source}")]
    NoDiscriminant {
        codec: String,
        #[source]
        source: UnsupportedOperation,
    },
    #[error("{codec}: expected {expected} elements, found {found}")]
    LengthMismatch {
        codec: String,
        expected: i64,
        found: usize,
    },
    #[error("{codec}: invalid size {size}")]
    InvalidSize { codec: String, size: i64 },
    #[error("{codec}: value {value} does not fit the prefix")]
    PrefixOverflow { codec: String, value: i64 },
    #[error(transparent)]
    Construction(#[from] CompileError),
}

impl EncodeError {
    pub fn io(codec: impl Into<String>, source: io::Error) -> Self {
        EncodeError::Io {
            codec: codec.into(),
            source,
        }
    }

    pub fn eval(codec: impl Into<String>, source: EvalError) -> Self {
        EncodeError::Eval {
            codec: codec.into(),
            source,
        }
    }
}
