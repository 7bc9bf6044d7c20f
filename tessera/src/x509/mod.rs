pub mod certificate;
pub mod chain;
pub mod crl;
pub mod csr;
pub mod extension;
pub mod fetch;
pub mod key_id_gen_method;
pub mod name;
pub mod spkac;

pub(crate) mod utils;

pub use certificate::Cert;
pub use chain::{ChainError, ChainValidator, Signed};
pub use crl::Crl;
pub use csr::{Csr, Disposition};
pub use fetch::{FetchError, IssuerFetcher};
pub use key_id_gen_method::{KeyIdGenError, KeyIdGenMethod};
pub use name::{DistinguishedName, DnFormat, DnMatch, FormattedDn};
pub use spkac::Spkac;

#[cfg(feature = "http_fetch")]
pub use fetch::HttpFetcher;

use crate::key::KeyError;
use crate::pem::PemError;
use tessera_asn1_der::Asn1DerError;
use thiserror::Error;

/// Errors raised while loading, editing or saving X.509 documents.
#[derive(Debug, Error)]
pub enum X509Error {
    /// ASN1 serialization error
    #[error("(ASN1) couldn't serialize {element}: {source}")]
    Asn1Serialization {
        element: &'static str,
        source: Asn1DerError,
    },

    /// ASN1 deserialization error
    #[error("(ASN1) couldn't deserialize {element}: {source}")]
    Asn1Deserialization {
        element: &'static str,
        source: Asn1DerError,
    },

    /// invalid PEM label error
    #[error("invalid PEM label: {label}")]
    InvalidPemLabel { label: String },

    /// invalid PEM provided
    #[error("invalid PEM provided: {source}")]
    Pem { source: PemError },

    /// the value of this id can only be saved once a schema is registered for it
    #[error("no schema registered for {id}, its value can't be encoded")]
    Unsupported { id: String },

    /// neither a known name nor a dotted object identifier
    #[error("unknown object identifier or name `{name}`")]
    UnknownId { name: String },

    /// DN attribute name that doesn't translate to an attribute type
    #[error("unknown distinguished name attribute `{name}`")]
    UnknownAttribute { name: String },

    #[error("invalid distinguished name `{input}`: {reason}")]
    InvalidName { input: String, reason: &'static str },

    /// the value tree lacks something the operation needs
    #[error("{element} is missing or malformed")]
    Malformed { element: &'static str },

    /// invalid key
    #[error("invalid key: {source}")]
    InvalidKey { source: KeyError },
}

impl From<PemError> for X509Error {
    fn from(e: PemError) -> Self {
        Self::Pem { source: e }
    }
}

impl From<KeyError> for X509Error {
    fn from(e: KeyError) -> Self {
        Self::InvalidKey { source: e }
    }
}
