//! # bitbind
//!
//! Declarative bit-level codecs. A schema describes where each field lives in
//! a bit stream; field widths, element counts and union branches may depend on
//! fields decoded earlier, through expressions from [`bitbind_el`].
//!
//! Codec trees are built once by [`Codecs`](schema::Codecs) and shared freely;
//! every decode or encode call owns its own stream position.
//!
//! ## Example
//!
//! ```
//! use bitbind::{
//!     codec::{self, CodecSource},
//!     numeric::NumericKind,
//!     schema::{Codecs, Description, RecordDef},
//! };
//! use bitbind_el::{Record, Type, Value};
//!
//! let codecs = Codecs::new()
//!     .with_record(
//!         RecordDef::new("Run")
//!             .field("speed", Description::numeric(NumericKind::Short))
//!             .field("direction", Description::numeric(NumericKind::Byte)),
//!     )
//!     .unwrap();
//! let run = codecs.codec_for(&Type::record("Run")).unwrap();
//!
//! let value = codec::decode(&*run, &[0x00, 0x1E, 0x05]).unwrap();
//! let expected = Record::new("Run").with("speed", 30i16).with("direction", 5i8);
//! assert_eq!(value, Value::Record(expected));
//! ```

pub mod bitfield;
pub mod bits;
pub mod codec;
pub mod errors;
pub mod list;
pub mod numeric;
pub mod record;
pub mod resolver;
pub mod schema;
pub mod select;

#[cfg(feature = "serde")]
pub mod serde;

pub use codec::{Builder, Codec, CodecSource, DefaultBuilder, decode, encode};
pub use errors::{CompileError, DecodeError, DecodeErrorKind, EncodeError, ReadError};
