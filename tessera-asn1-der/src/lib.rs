//! BER decoding and DER encoding driven by [`Schema`](tessera_asn1::Schema)s.
//!
//! Decoding happens in two steps. [`decode_ber`] turns bytes into a tree of
//! [`Node`]s without any knowledge of the expected shape, accepting indefinite
//! lengths, high tag numbers and fragmented strings. The [`Mapper`] then walks that
//! tree together with a schema and produces a typed [`Value`](tessera_asn1::Value).
//!
//! [`to_der`] is the mapper's inverse and always emits canonical DER.
//!
//! ```
//! use tessera_asn1::{Field, Schema, Value};
//! use tessera_asn1_der::{from_der, to_der};
//!
//! let schema = Schema::sequence([
//!     Field::new("id", Schema::object_identifier()),
//!     Field::new("critical", Schema::boolean().default_value(Value::Boolean(false))),
//! ]);
//!
//! let value = Value::sequence([("id", Value::oid("2.5.29.19")), ("critical", Value::Boolean(false))]);
//! let der = to_der(&value, &schema).unwrap();
//! assert_eq!(der, [0x30, 0x05, 0x06, 0x03, 0x55, 0x1D, 0x13]);
//! assert_eq!(from_der(&der, &schema).unwrap(), value);
//! ```

#[macro_use]
mod debug_log;

pub mod de;
pub mod hooks;
mod misc;
pub mod ser;
mod string;

pub use de::map::{from_der, from_der_with_hooks, map, Mapper};
pub use de::node::{Content, Node};
pub use de::{decode_all, decode_ber, decode_tlv, MAX_DEPTH};
pub use hooks::{Hook, Hooks};
pub use misc::{der_set_order, Length};
pub use ser::{to_der, to_der_with_hooks, EncodeOptions, Encoder};

use tessera_asn1::{OidError, Tag, TimeError};
use thiserror::Error;

/// The three failure families of the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// the input bytes are not a valid BER encoding
    Malformed,
    /// the input is well-formed but does not have the shape the schema expects
    NoMatch,
    /// the value can't be expressed with the given schema or isn't supported
    Unsupported,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Asn1DerError {
    #[error("truncated data: needed more bytes at offset {offset}")]
    TruncatedData { offset: usize },

    #[error("non-canonical high tag number at offset {offset}")]
    NonCanonicalTag { offset: usize },

    #[error("tag number overflows 32 bits at offset {offset}")]
    TagOverflow { offset: usize },

    #[error("length field at offset {offset} uses {octets} octets, at most 4 are supported")]
    UnsupportedLength { offset: usize, octets: usize },

    #[error("length {length} at offset {offset} exceeds the {remaining} remaining bytes")]
    LengthOverflow {
        offset: usize,
        length: usize,
        remaining: usize,
    },

    #[error("indefinite length on a primitive encoding at offset {offset}")]
    IndefinitePrimitive { offset: usize },

    #[error("no end-of-contents marker for the element at offset {offset}")]
    MissingEndOfContents { offset: usize },

    #[error("nesting deeper than {MAX_DEPTH} levels at offset {offset}")]
    TooDeep { offset: usize },

    #[error("constructed {outer} at offset {offset} contains an invalid fragment")]
    InvalidFragment { outer: Tag, offset: usize },

    #[error("{len} trailing bytes after the top-level element")]
    TrailingData { len: usize },

    #[error("invalid {tag} content at offset {offset}: {reason}")]
    InvalidContent {
        tag: String,
        offset: usize,
        reason: &'static str,
    },

    #[error("invalid object identifier: {source}")]
    Oid {
        #[from]
        source: OidError,
    },

    #[error("invalid time: {source}")]
    Time {
        #[from]
        source: TimeError,
    },

    #[error("element doesn't match the expected {expected}")]
    NoMatch { expected: String },

    #[error("ENUMERATED value {value} has no label")]
    UnknownEnumerated { value: String },

    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("CHOICE has no alternative named `{name}`")]
    UnknownAlternative { name: String },

    #[error("bit `{name}` is not part of the named-bit table")]
    UnknownBit { name: String },

    #[error("label `{label}` is not part of the label table")]
    UnknownLabel { label: String },

    #[error("a {found} can't be encoded as {expected}")]
    UnsupportedValue { expected: String, found: &'static str },

    #[error("`{value}` is not a valid {kind}")]
    InvalidString { kind: String, value: String },

    #[error("hook for `{field}` failed: {reason}")]
    Hook { field: String, reason: String },
}

impl Asn1DerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Asn1DerError::TruncatedData { .. }
            | Asn1DerError::NonCanonicalTag { .. }
            | Asn1DerError::TagOverflow { .. }
            | Asn1DerError::LengthOverflow { .. }
            | Asn1DerError::IndefinitePrimitive { .. }
            | Asn1DerError::MissingEndOfContents { .. }
            | Asn1DerError::TooDeep { .. }
            | Asn1DerError::InvalidFragment { .. }
            | Asn1DerError::TrailingData { .. }
            | Asn1DerError::InvalidContent { .. }
            | Asn1DerError::Oid { .. }
            | Asn1DerError::Time { .. } => ErrorKind::Malformed,
            Asn1DerError::NoMatch { .. } | Asn1DerError::UnknownEnumerated { .. } => ErrorKind::NoMatch,
            Asn1DerError::UnsupportedLength { .. }
            | Asn1DerError::MissingField { .. }
            | Asn1DerError::UnknownAlternative { .. }
            | Asn1DerError::UnknownBit { .. }
            | Asn1DerError::UnknownLabel { .. }
            | Asn1DerError::UnsupportedValue { .. }
            | Asn1DerError::InvalidString { .. }
            | Asn1DerError::Hook { .. } => ErrorKind::Unsupported,
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.kind() == ErrorKind::Malformed
    }

    pub fn is_no_match(&self) -> bool {
        self.kind() == ErrorKind::NoMatch
    }
}

pub type Result<T> = std::result::Result<T, Asn1DerError>;
