//! ASN.1 building blocks shared by the tessera crates.
//!
//! This crate holds the data model only: tags, the object identifier and time codecs,
//! the typed [`Value`] tree produced by the mapper and the declarative [`Schema`]
//! describing the expected shape of an encoding. Decoding and encoding live in
//! `tessera-asn1-der`.

pub mod date;
pub mod oid;
pub mod schema;
pub mod tag;
pub mod value;

pub use date::{Asn1Time, TimeError, TimeKind};
pub use oid::{decode_oid, encode_oid, OidError};
pub use schema::{Field, Kind, Retag, Schema, Tagging};
pub use tag::{Tag, TagClass};
pub use value::{Any, BitString, Element, Fields, Value};

pub use num_bigint_dig::BigInt;
